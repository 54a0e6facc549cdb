use serde::{Deserialize, Serialize};

/// GPU job (training run, script) lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum JobStatus {
    Pending,
    Provisioning,
    Starting,
    Running,
    Completing,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl JobStatus {
    pub const ALL: [JobStatus; 9] = [
        JobStatus::Pending,
        JobStatus::Provisioning,
        JobStatus::Starting,
        JobStatus::Running,
        JobStatus::Completing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
        JobStatus::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Provisioning => "provisioning",
            JobStatus::Starting => "starting",
            JobStatus::Running => "running",
            JobStatus::Completing => "completing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Timeout => "timeout",
        }
    }

    /// Known status names and the API's aliases; `None` for anything else.
    pub fn from_name(s: &str) -> Option<Self> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => JobStatus::Pending,
            "provisioning" => JobStatus::Provisioning,
            "starting" => JobStatus::Starting,
            "running" => JobStatus::Running,
            "completing" => JobStatus::Completing,
            "completed" | "succeeded" => JobStatus::Completed,
            "failed" | "error" => JobStatus::Failed,
            "cancelled" | "canceled" => JobStatus::Cancelled,
            "timeout" | "timed_out" => JobStatus::Timeout,
            _ => return None,
        };
        Some(status)
    }

    /// Unknown strings are treated as `Pending` so the poller keeps watching them.
    pub fn parse(s: &str) -> Self {
        Self::from_name(s).unwrap_or(JobStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::Timeout
        )
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal() && *self != JobStatus::Completing
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        JobStatus::parse(&s)
    }
}

impl From<JobStatus> for &'static str {
    fn from(s: JobStatus) -> Self {
        s.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobSourceKind {
    #[default]
    Huggingface,
    Git,
    Command,
}

impl JobSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSourceKind::Huggingface => "huggingface",
            JobSourceKind::Git => "git",
            JobSourceKind::Command => "command",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Some(JobSourceKind::Huggingface),
            "git" => Some(JobSourceKind::Git),
            "command" | "cmd" => Some(JobSourceKind::Command),
            _ => None,
        }
    }
}

/// Where the job's code comes from. Serialized flat next to the job fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobSource {
    #[serde(rename = "source", default)]
    pub kind: JobSourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hf_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl JobSource {
    /// Short human label: repo, URL or command.
    pub fn describe(&self) -> String {
        let v = match self.kind {
            JobSourceKind::Huggingface => self.hf_repo.as_deref(),
            JobSourceKind::Git => self.git_url.as_deref(),
            JobSourceKind::Command => self.command.as_deref(),
        };
        format!("{}:{}", self.kind.as_str(), v.unwrap_or("-"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: JobStatus,
    #[serde(flatten)]
    pub source: JobSource,
    #[serde(default)]
    pub gpu_type: Option<String>,
    #[serde(default)]
    pub disk_size: Option<u32>,
    #[serde(default)]
    pub timeout_minutes: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub instance_id: Option<i64>,
}

/// Payload for `POST /api/v1/jobs`. Built by the job form after clamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub name: String,
    #[serde(flatten)]
    pub source: JobSource,
    pub gpu_type: String,
    pub disk_size: u32,
    pub timeout_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobLogs {
    #[serde(default)]
    pub logs: String,
}

impl JobLogs {
    /// Accepts `{logs: "..."}`, `{logs: ["..", ".."]}` or a bare string.
    pub fn from_value(value: serde_json::Value) -> Self {
        let logs = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Object(mut map) => match map.remove("logs") {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Array(lines)) => lines
                    .into_iter()
                    .map(|l| match l {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => String::new(),
            },
            _ => String::new(),
        };
        Self { logs }
    }

    pub fn tail(&self, n: usize) -> Vec<&str> {
        let lines: Vec<&str> = self.logs.lines().collect();
        let skip = lines.len().saturating_sub(n);
        lines[skip..].to_vec()
    }
}

// --- Fine-tuning ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum FinetuneStatus {
    Pending,
    Uploading,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl FinetuneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinetuneStatus::Pending => "pending",
            FinetuneStatus::Uploading => "uploading",
            FinetuneStatus::Queued => "queued",
            FinetuneStatus::Running => "running",
            FinetuneStatus::Completed => "completed",
            FinetuneStatus::Failed => "failed",
            FinetuneStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "uploading" => FinetuneStatus::Uploading,
            "queued" => FinetuneStatus::Queued,
            "running" | "training" => FinetuneStatus::Running,
            "completed" | "succeeded" => FinetuneStatus::Completed,
            "failed" | "error" => FinetuneStatus::Failed,
            "cancelled" | "canceled" => FinetuneStatus::Cancelled,
            _ => FinetuneStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FinetuneStatus::Completed | FinetuneStatus::Failed | FinetuneStatus::Cancelled
        )
    }
}

impl From<String> for FinetuneStatus {
    fn from(s: String) -> Self {
        FinetuneStatus::parse(&s)
    }
}

impl From<FinetuneStatus> for &'static str {
    fn from(s: FinetuneStatus) -> Self {
        s.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinetuneJob {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_model: String,
    #[serde(default)]
    pub dataset: Option<String>,
    pub status: FinetuneStatus,
    /// 0.0 ..= 100.0
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub gpu_type: Option<String>,
    #[serde(default)]
    pub epochs: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub deployed_endpoint: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl FinetuneJob {
    pub fn can_deploy(&self) -> bool {
        self.status == FinetuneStatus::Completed && self.deployed_endpoint.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFinetuneRequest {
    pub name: String,
    pub base_model: String,
    pub dataset: String,
    pub gpu_type: String,
    pub epochs: u32,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub url: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}
