use serde::{Deserialize, Serialize};

pub mod error;
pub mod gpu_filter;
pub mod jobs;
pub mod nps;
pub mod price_monitor;
pub mod reservations;
pub mod teams;

pub use error::ApiError;
pub use jobs::{FinetuneJob, FinetuneStatus, Job, JobSource, JobSourceKind, JobStatus};
pub use nps::{nps_score, NpsCategory, NpsResponse, NpsSummary};
pub use price_monitor::{GpuPriceSummary, PriceAlert, PriceMonitorStatus, PricePoint};
pub use reservations::{Reservation, ReservationStats, ReservationStatus};
pub use teams::{group_permissions, Permission, Role, Team, TeamDetail};

// --- Enums ---

/// Lifecycle label reported by the backend for a machine.
///
/// Strings the console does not know about map to `Unknown` instead of failing
/// the whole list decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum InstanceStatus {
    Loading,
    Creating,
    Starting,
    Pending,
    Provisioning,
    Configuring,
    Running,
    Stopped,
    Failover,
    Unknown,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Loading => "loading",
            InstanceStatus::Creating => "creating",
            InstanceStatus::Starting => "starting",
            InstanceStatus::Pending => "pending",
            InstanceStatus::Provisioning => "provisioning",
            InstanceStatus::Configuring => "configuring",
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Failover => "failover",
            InstanceStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "loading" => InstanceStatus::Loading,
            "creating" => InstanceStatus::Creating,
            "starting" => InstanceStatus::Starting,
            "pending" => InstanceStatus::Pending,
            "provisioning" => InstanceStatus::Provisioning,
            "configuring" => InstanceStatus::Configuring,
            "running" => InstanceStatus::Running,
            "stopped" | "exited" | "offline" => InstanceStatus::Stopped,
            "failover" => InstanceStatus::Failover,
            _ => InstanceStatus::Unknown,
        }
    }

    /// Machines that are booting, serving, or being failed over.
    pub fn is_active(&self) -> bool {
        !self.is_offline()
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, InstanceStatus::Stopped | InstanceStatus::Unknown)
    }

    /// Still moving towards `Running`; pollers keep watching these.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            InstanceStatus::Loading
                | InstanceStatus::Creating
                | InstanceStatus::Starting
                | InstanceStatus::Pending
                | InstanceStatus::Provisioning
                | InstanceStatus::Configuring
                | InstanceStatus::Failover
        )
    }
}

impl From<String> for InstanceStatus {
    fn from(s: String) -> Self {
        InstanceStatus::parse(&s)
    }
}

impl From<InstanceStatus> for &'static str {
    fn from(s: InstanceStatus) -> Self {
        s.as_str()
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Entities ---

/// Backup CPU machine kept in sync with a GPU machine.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CpuStandby {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Instance {
    pub id: i64,
    #[serde(default)]
    pub gpu_name: String,
    #[serde(default = "default_gpu_count")]
    pub num_gpus: u32,
    #[serde(default = "default_status")]
    pub status: InstanceStatus,
    #[serde(default)]
    pub actual_status: Option<InstanceStatus>,
    #[serde(default)]
    pub label: Option<String>,
    /// Dollars per hour, all-in.
    #[serde(default)]
    pub dph_total: f64,
    /// Epoch seconds.
    #[serde(default)]
    pub start_date: Option<f64>,
    #[serde(default)]
    pub public_ipaddr: Option<String>,
    #[serde(default)]
    pub ssh_host: Option<String>,
    #[serde(default)]
    pub ssh_port: Option<u16>,
    #[serde(default)]
    pub cpu_standby: Option<CpuStandby>,
}

fn default_gpu_count() -> u32 {
    1
}

fn default_status() -> InstanceStatus {
    InstanceStatus::Unknown
}

impl Instance {
    /// `actual_status` wins when the backend reports both.
    pub fn effective_status(&self) -> InstanceStatus {
        self.actual_status.unwrap_or(self.status)
    }

    pub fn set_status(&mut self, status: InstanceStatus) {
        self.status = status;
        self.actual_status = Some(status);
    }

    pub fn ssh_command(&self) -> Option<String> {
        let host = self.ssh_host.as_deref().filter(|h| !h.is_empty())?;
        Some(match self.ssh_port {
            Some(port) => format!("ssh -p {} root@{}", port, host),
            None => format!("ssh root@{}", host),
        })
    }

    /// Hours since `start_date`, 0 when unknown.
    pub fn uptime_hours(&self, now_epoch_secs: f64) -> f64 {
        match self.start_date {
            Some(start) if now_epoch_secs > start => (now_epoch_secs - start) / 3600.0,
            _ => 0.0,
        }
    }
}

/// Split machines into (active, offline). Every machine lands in exactly one side.
pub fn partition_instances(instances: &[Instance]) -> (Vec<&Instance>, Vec<&Instance>) {
    instances
        .iter()
        .partition(|i| i.effective_status().is_active())
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Balance {
    #[serde(default, alias = "balance")]
    pub credit: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

/// A rentable machine offer picked on the create screen.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Offer {
    pub id: i64,
    pub gpu_name: String,
    #[serde(default = "default_gpu_count")]
    pub num_gpus: u32,
    #[serde(default)]
    pub dph_total: f64,
    #[serde(default)]
    pub geolocation: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateInstanceRequest {
    pub offer_id: i64,
    pub gpu_name: String,
    #[serde(default = "default_gpu_count")]
    pub num_gpus: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub enable_cpu_standby: bool,
}

impl From<&Offer> for CreateInstanceRequest {
    fn from(offer: &Offer) -> Self {
        Self {
            offer_id: offer.id,
            gpu_name: offer.gpu_name.clone(),
            num_gpus: offer.num_gpus,
            image: None,
            disk_size: None,
            label: None,
            enable_cpu_standby: false,
        }
    }
}

/// Result of an incremental sync to the CPU standby.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SyncReport {
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub files_changed: u64,
    #[serde(default)]
    pub bytes_transferred: u64,
    #[serde(default)]
    pub forced: bool,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Marketplace template (image + defaults) offered on the create screen.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gpu_recommendation: Option<String>,
}

/// Documentation navigation entry; sections nest.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DocMenuItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocMenuItem>,
}

impl DocMenuItem {
    pub fn leaf(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            children: vec![],
        }
    }

    /// Depth-first search by id.
    pub fn find<'a>(items: &'a [DocMenuItem], id: &str) -> Option<&'a DocMenuItem> {
        for item in items {
            if item.id == id {
                return Some(item);
            }
            if let Some(found) = DocMenuItem::find(&item.children, id) {
                return Some(found);
            }
        }
        None
    }
}
