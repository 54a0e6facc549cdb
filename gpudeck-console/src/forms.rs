//! Creation forms: field-level validation, clamping, submit gating.

use chrono::{DateTime, Utc};
use gpudeck_backend::ApiResult;
use gpudeck_common::jobs::{CreateFinetuneRequest, CreateJobRequest};
use gpudeck_common::reservations::CreateReservationRequest;
use gpudeck_common::teams::{slugify, CreateRoleRequest, CreateTeamRequest};
use gpudeck_common::{JobSource, JobSourceKind};
use regex::Regex;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::OnceLock;

pub const REQUIRED: &str = "This field is required";

/// Field -> message, in the order the errors were raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|(f, _)| *f).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// Replace or clear the error of one field.
    pub fn put(&mut self, field: &'static str, message: Option<String>) {
        match (self.0.iter().position(|(f, _)| *f == field), message) {
            (Some(idx), Some(m)) => self.0[idx].1 = m,
            (Some(idx), None) => {
                self.0.remove(idx);
            }
            (None, Some(m)) => self.0.push((field, m)),
            (None, None) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// Client-side validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// The server refused the payload.
    Server(String),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Invalid(errors) => {
                let parts: Vec<String> = errors
                    .iter()
                    .map(|(field, msg)| format!("{}: {}", field, msg))
                    .collect();
                write!(f, "{}", parts.join(", "))
            }
            SubmitError::Server(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SubmitError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

/// A creation form with string inputs.
pub trait Form {
    type Payload;

    /// Validated fields, in display order.
    fn fields(&self) -> &'static [&'static str];

    fn set_value(&mut self, field: &str, value: &str) -> Result<&'static str, UnknownField>;

    fn validate_field(&self, field: &str) -> Option<String>;

    /// Fields whose rule also reads `field`.
    fn dependents(&self, _field: &str) -> &'static [&'static str] {
        &[]
    }

    /// Payload with numeric inputs clamped. Only called after `validate()` passes.
    fn payload(&self) -> Self::Payload;

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        for &field in self.fields() {
            errors.put(field, self.validate_field(field));
        }
        errors
    }
}

/// Form plus its current inline errors and server banner.
#[derive(Debug, Clone, Default)]
pub struct FormState<F> {
    form: F,
    errors: FieldErrors,
    server_error: Option<String>,
}

impl<F: Form> FormState<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            errors: FieldErrors::default(),
            server_error: None,
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn server_error(&self) -> Option<&str> {
        self.server_error.as_deref()
    }

    /// Set one input and re-check only that field.
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), UnknownField> {
        let field = self.form.set_value(field, value)?;
        self.recheck(field);
        Ok(())
    }

    /// Edit the form directly, then re-check `field`.
    pub fn edit(&mut self, field: &'static str, f: impl FnOnce(&mut F)) {
        f(&mut self.form);
        self.recheck(field);
    }

    /// Re-check `field` and the fields that depend on it. A dependent's
    /// error is updated when one is shown; an untouched dependent only
    /// gains an error that is not "required".
    fn recheck(&mut self, field: &'static str) {
        self.errors.put(field, self.form.validate_field(field));
        for &dep in self.form.dependents(field) {
            let error = self.form.validate_field(dep);
            let shown = self.errors.get(dep).is_some();
            if shown || error.as_deref().is_some_and(|e| e != REQUIRED) {
                self.errors.put(dep, error);
            }
        }
    }

    pub fn can_submit(&self) -> bool {
        self.form.validate().is_empty()
    }

    /// Validate everything, then hand the payload to `send`.
    ///
    /// Nothing is sent while any field is invalid.
    pub async fn submit<T, S, Fut>(&mut self, send: S) -> Result<T, SubmitError>
    where
        S: FnOnce(F::Payload) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let errors = self.form.validate();
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(SubmitError::Invalid(errors));
        }
        self.errors = FieldErrors::default();
        self.server_error = None;
        match send(self.form.payload()).await {
            Ok(v) => Ok(v),
            Err(e) => {
                let msg = e.user_message();
                tracing::warn!("form submission rejected: {}", e);
                self.server_error = Some(msg.clone());
                Err(SubmitError::Server(msg))
            }
        }
    }
}

fn required(value: &str) -> Option<String> {
    value.trim().is_empty().then(|| REQUIRED.to_string())
}

fn is_hf_repo(value: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").ok())
        .as_ref()
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Option<Result<T, String>> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    Some(v.parse::<T>().map_err(|_| "Must be a number".to_string()))
}

// --- Job ---

pub const DISK_MIN_GB: u32 = 10;
pub const DISK_MAX_GB: u32 = 500;
pub const TIMEOUT_MIN_MINUTES: u32 = 10;
pub const TIMEOUT_MAX_MINUTES: u32 = 1440;

#[derive(Debug, Clone, PartialEq)]
pub struct JobForm {
    pub name: String,
    pub source: String,
    pub hf_repo: String,
    pub git_url: String,
    pub git_branch: String,
    pub command: String,
    pub gpu_type: String,
    pub disk_size: String,
    pub timeout_minutes: String,
}

impl Default for JobForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            source: "huggingface".to_string(),
            hf_repo: String::new(),
            git_url: String::new(),
            git_branch: String::new(),
            command: String::new(),
            gpu_type: String::new(),
            disk_size: "50".to_string(),
            timeout_minutes: "60".to_string(),
        }
    }
}

impl JobForm {
    fn kind(&self) -> Option<JobSourceKind> {
        JobSourceKind::parse(&self.source)
    }
}

impl Form for JobForm {
    type Payload = CreateJobRequest;

    fn fields(&self) -> &'static [&'static str] {
        &[
            "name",
            "source",
            "hf_repo",
            "git_url",
            "command",
            "gpu_type",
            "disk_size",
            "timeout_minutes",
        ]
    }

    fn set_value(&mut self, field: &str, value: &str) -> Result<&'static str, UnknownField> {
        let (slot, name) = match field {
            "name" => (&mut self.name, "name"),
            "source" => (&mut self.source, "source"),
            "hf_repo" => (&mut self.hf_repo, "hf_repo"),
            "git_url" => (&mut self.git_url, "git_url"),
            "git_branch" => (&mut self.git_branch, "git_branch"),
            "command" => (&mut self.command, "command"),
            "gpu_type" => (&mut self.gpu_type, "gpu_type"),
            "disk_size" => (&mut self.disk_size, "disk_size"),
            "timeout_minutes" => (&mut self.timeout_minutes, "timeout_minutes"),
            other => return Err(UnknownField(other.to_string())),
        };
        *slot = value.to_string();
        Ok(name)
    }

    fn validate_field(&self, field: &str) -> Option<String> {
        let kind = self.kind();
        match field {
            "name" => required(&self.name),
            "source" => kind
                .is_none()
                .then(|| "Choose huggingface, git or command".to_string()),
            "hf_repo" if kind == Some(JobSourceKind::Huggingface) => {
                required(&self.hf_repo).or_else(|| {
                    (!is_hf_repo(self.hf_repo.trim()))
                        .then(|| "Use the owner/repo format".to_string())
                })
            }
            "git_url" if kind == Some(JobSourceKind::Git) => {
                required(&self.git_url).or_else(|| {
                    let url = self.git_url.trim();
                    let ok = ["https://", "http://", "git@"]
                        .iter()
                        .any(|p| url.starts_with(p));
                    (!ok).then(|| "Must start with https://, http:// or git@".to_string())
                })
            }
            "command" if kind == Some(JobSourceKind::Command) => required(&self.command),
            "gpu_type" => required(&self.gpu_type),
            "disk_size" => parse_number::<i64>(&self.disk_size).and_then(|r| r.err()),
            "timeout_minutes" => parse_number::<i64>(&self.timeout_minutes).and_then(|r| r.err()),
            _ => None,
        }
    }

    fn dependents(&self, field: &str) -> &'static [&'static str] {
        match field {
            "source" => &["hf_repo", "git_url", "command"],
            _ => &[],
        }
    }

    fn payload(&self) -> CreateJobRequest {
        let kind = self.kind().unwrap_or_default();
        let opt = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        };
        let source = match kind {
            JobSourceKind::Huggingface => JobSource {
                kind,
                hf_repo: opt(&self.hf_repo),
                ..Default::default()
            },
            JobSourceKind::Git => JobSource {
                kind,
                git_url: opt(&self.git_url),
                git_branch: opt(&self.git_branch),
                ..Default::default()
            },
            JobSourceKind::Command => JobSource {
                kind,
                command: opt(&self.command),
                ..Default::default()
            },
        };
        CreateJobRequest {
            name: self.name.trim().to_string(),
            source,
            gpu_type: self.gpu_type.trim().to_string(),
            disk_size: clamp_input(&self.disk_size, 50, DISK_MIN_GB, DISK_MAX_GB),
            timeout_minutes: clamp_input(
                &self.timeout_minutes,
                60,
                TIMEOUT_MIN_MINUTES,
                TIMEOUT_MAX_MINUTES,
            ),
        }
    }
}

fn clamp_input(value: &str, default: u32, min: u32, max: u32) -> u32 {
    let n = match parse_number::<i64>(value) {
        Some(Ok(n)) => n,
        _ => default as i64,
    };
    n.clamp(min as i64, max as i64) as u32
}

// --- Fine-tune ---

#[derive(Debug, Clone, PartialEq)]
pub struct FinetuneForm {
    pub name: String,
    pub base_model: String,
    pub dataset: String,
    pub gpu_type: String,
    pub epochs: String,
    pub learning_rate: String,
}

impl Default for FinetuneForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_model: String::new(),
            dataset: String::new(),
            gpu_type: "A100 SXM4".to_string(),
            epochs: "3".to_string(),
            learning_rate: "0.0002".to_string(),
        }
    }
}

impl Form for FinetuneForm {
    type Payload = CreateFinetuneRequest;

    fn fields(&self) -> &'static [&'static str] {
        &["name", "base_model", "dataset", "epochs", "learning_rate"]
    }

    fn set_value(&mut self, field: &str, value: &str) -> Result<&'static str, UnknownField> {
        let (slot, name) = match field {
            "name" => (&mut self.name, "name"),
            "base_model" => (&mut self.base_model, "base_model"),
            "dataset" => (&mut self.dataset, "dataset"),
            "gpu_type" => (&mut self.gpu_type, "gpu_type"),
            "epochs" => (&mut self.epochs, "epochs"),
            "learning_rate" => (&mut self.learning_rate, "learning_rate"),
            other => return Err(UnknownField(other.to_string())),
        };
        *slot = value.to_string();
        Ok(name)
    }

    fn validate_field(&self, field: &str) -> Option<String> {
        match field {
            "name" => required(&self.name),
            "base_model" => required(&self.base_model),
            "dataset" => required(&self.dataset),
            "epochs" => parse_number::<i64>(&self.epochs).and_then(|r| r.err()),
            "learning_rate" => match parse_number::<f64>(&self.learning_rate) {
                None => Some(REQUIRED.to_string()),
                Some(Err(e)) => Some(e),
                Some(Ok(v)) if !(v > 0.0) || !v.is_finite() => {
                    Some("Must be a positive number".to_string())
                }
                Some(Ok(_)) => None,
            },
            _ => None,
        }
    }

    fn payload(&self) -> CreateFinetuneRequest {
        CreateFinetuneRequest {
            name: self.name.trim().to_string(),
            base_model: self.base_model.trim().to_string(),
            dataset: self.dataset.trim().to_string(),
            gpu_type: self.gpu_type.trim().to_string(),
            epochs: clamp_input(&self.epochs, 3, 1, 20),
            learning_rate: self.learning_rate.trim().parse().unwrap_or(0.0002),
        }
    }
}

// --- Reservation ---

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationForm {
    pub gpu_type: String,
    pub gpu_count: String,
    pub start_time: String,
    pub end_time: String,
}

impl Default for ReservationForm {
    fn default() -> Self {
        Self {
            gpu_type: String::new(),
            gpu_count: "1".to_string(),
            start_time: String::new(),
            end_time: String::new(),
        }
    }
}

fn parse_time(value: &str) -> Option<Result<DateTime<Utc>, String>> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    Some(
        DateTime::parse_from_rfc3339(v)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| "Use a date like 2026-05-10T09:00:00Z".to_string()),
    )
}

impl Form for ReservationForm {
    type Payload = CreateReservationRequest;

    fn fields(&self) -> &'static [&'static str] {
        &["gpu_type", "gpu_count", "start_time", "end_time"]
    }

    fn set_value(&mut self, field: &str, value: &str) -> Result<&'static str, UnknownField> {
        let (slot, name) = match field {
            "gpu_type" => (&mut self.gpu_type, "gpu_type"),
            "gpu_count" => (&mut self.gpu_count, "gpu_count"),
            "start_time" => (&mut self.start_time, "start_time"),
            "end_time" => (&mut self.end_time, "end_time"),
            other => return Err(UnknownField(other.to_string())),
        };
        *slot = value.to_string();
        Ok(name)
    }

    fn validate_field(&self, field: &str) -> Option<String> {
        match field {
            "gpu_type" => required(&self.gpu_type),
            "gpu_count" => match parse_number::<i64>(&self.gpu_count) {
                None => Some(REQUIRED.to_string()),
                Some(Err(e)) => Some(e),
                Some(Ok(n)) if !(1..=8).contains(&n) => Some("Between 1 and 8 GPUs".to_string()),
                Some(Ok(_)) => None,
            },
            "start_time" => match parse_time(&self.start_time) {
                None => Some(REQUIRED.to_string()),
                Some(r) => r.err(),
            },
            "end_time" => match parse_time(&self.end_time) {
                None => Some(REQUIRED.to_string()),
                Some(Err(e)) => Some(e),
                Some(Ok(end)) => match parse_time(&self.start_time) {
                    Some(Ok(start)) if end <= start => {
                        Some("End must be after start".to_string())
                    }
                    Some(Ok(start)) if end - start < chrono::Duration::hours(1) => {
                        Some("Reserve at least one hour".to_string())
                    }
                    _ => None,
                },
            },
            _ => None,
        }
    }

    fn dependents(&self, field: &str) -> &'static [&'static str] {
        match field {
            "start_time" => &["end_time"],
            _ => &[],
        }
    }

    fn payload(&self) -> CreateReservationRequest {
        let now = Utc::now();
        let start = parse_time(&self.start_time)
            .and_then(|r| r.ok())
            .unwrap_or(now);
        let end = parse_time(&self.end_time)
            .and_then(|r| r.ok())
            .unwrap_or(start + chrono::Duration::hours(1));
        CreateReservationRequest {
            gpu_type: self.gpu_type.trim().to_string(),
            gpu_count: clamp_input(&self.gpu_count, 1, 1, 8),
            start_time: start,
            end_time: end,
        }
    }
}

// --- Team / role ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamForm {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl Form for TeamForm {
    type Payload = CreateTeamRequest;

    fn fields(&self) -> &'static [&'static str] {
        &["name", "slug"]
    }

    fn set_value(&mut self, field: &str, value: &str) -> Result<&'static str, UnknownField> {
        let (slot, name) = match field {
            "name" => (&mut self.name, "name"),
            "slug" => (&mut self.slug, "slug"),
            "description" => (&mut self.description, "description"),
            other => return Err(UnknownField(other.to_string())),
        };
        *slot = value.to_string();
        Ok(name)
    }

    fn validate_field(&self, field: &str) -> Option<String> {
        match field {
            "name" => required(&self.name).or_else(|| {
                (self.name.trim().chars().count() < 2)
                    .then(|| "At least 2 characters".to_string())
            }),
            "slug" if !self.slug.trim().is_empty() && slugify(&self.slug).is_empty() => {
                Some("Use letters, digits and dashes".to_string())
            }
            "slug" if !self.name.trim().is_empty() && slugify(&self.name).is_empty() => {
                Some("Enter a slug, none can be made from this name".to_string())
            }
            _ => None,
        }
    }

    fn dependents(&self, field: &str) -> &'static [&'static str] {
        match field {
            "name" => &["slug"],
            _ => &[],
        }
    }

    fn payload(&self) -> CreateTeamRequest {
        let slug = if self.slug.trim().is_empty() {
            slugify(&self.name)
        } else {
            slugify(&self.slug)
        };
        let description = self.description.trim();
        CreateTeamRequest {
            name: self.name.trim().to_string(),
            slug,
            description: (!description.is_empty()).then(|| description.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleForm {
    pub name: String,
    pub description: String,
    pub permissions: BTreeSet<String>,
}

impl RoleForm {
    pub fn toggle(&mut self, permission: &str) {
        if !self.permissions.remove(permission) {
            self.permissions.insert(permission.to_string());
        }
    }
}

impl Form for RoleForm {
    type Payload = CreateRoleRequest;

    fn fields(&self) -> &'static [&'static str] {
        &["name", "permissions"]
    }

    /// `permissions` takes a comma separated list.
    fn set_value(&mut self, field: &str, value: &str) -> Result<&'static str, UnknownField> {
        match field {
            "name" => {
                self.name = value.to_string();
                Ok("name")
            }
            "description" => {
                self.description = value.to_string();
                Ok("description")
            }
            "permissions" => {
                self.permissions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect();
                Ok("permissions")
            }
            other => Err(UnknownField(other.to_string())),
        }
    }

    fn validate_field(&self, field: &str) -> Option<String> {
        match field {
            "name" => required(&self.name),
            "permissions" => self
                .permissions
                .is_empty()
                .then(|| "Pick at least one permission".to_string()),
            _ => None,
        }
    }

    fn payload(&self) -> CreateRoleRequest {
        let description = self.description.trim();
        CreateRoleRequest {
            name: self.name.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            permissions: self.permissions.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpudeck_backend::ApiError;
    use std::cell::Cell;

    #[tokio::test]
    async fn empty_hf_job_is_blocked_without_a_call() {
        let mut state = FormState::new(JobForm::default());
        state.set("gpu_type", "RTX 4090").unwrap();
        let called = Cell::new(false);
        let res: Result<(), _> = state
            .submit(|_| {
                called.set(true);
                async { Ok(()) }
            })
            .await;
        match res {
            Err(SubmitError::Invalid(errors)) => {
                assert_eq!(errors.fields(), vec!["name", "hf_repo"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!called.get());
        assert_eq!(state.errors().get("name"), Some(REQUIRED));
    }

    #[test]
    fn fixing_a_field_clears_only_that_error() {
        let mut state = FormState::new(JobForm::default());
        state.set("name", "").unwrap();
        state.set("hf_repo", "not a repo").unwrap();
        assert_eq!(state.errors().len(), 2);
        state.set("hf_repo", "org/model").unwrap();
        assert_eq!(state.errors().fields(), vec!["name"]);
        assert!(!state.can_submit());
    }

    #[test]
    fn source_switch_changes_required_fields() {
        let mut f = JobForm {
            name: "x".into(),
            gpu_type: "A100".into(),
            source: "git".into(),
            ..Default::default()
        };
        assert_eq!(f.validate().fields(), vec!["git_url"]);
        f.git_url = "ftp://nope".into();
        assert!(f.validate_field("git_url").is_some());
        f.git_url = "git@github.com:acme/x.git".into();
        assert!(f.validate().is_empty());
        f.source = "command".into();
        assert_eq!(f.validate().fields(), vec!["command"]);
        f.source = "svn".into();
        assert_eq!(f.validate().fields(), vec!["source"]);
    }

    #[test]
    fn switching_source_drops_errors_that_no_longer_apply() {
        let mut state = FormState::new(JobForm::default());
        state.set("name", "train").unwrap();
        state.set("gpu_type", "RTX 4090").unwrap();
        state.set("hf_repo", "bad repo").unwrap();
        assert_eq!(state.errors().fields(), vec!["hf_repo"]);

        state.set("source", "git").unwrap();
        assert!(state.errors().is_empty());
        assert!(!state.can_submit());
        state.set("git_url", "https://github.com/acme/train.git").unwrap();
        assert!(state.errors().is_empty());
        assert!(state.can_submit());

        state.set("git_url", "ftp://nope").unwrap();
        state.set("source", "command").unwrap();
        assert!(state.errors().get("git_url").is_none());
    }

    #[test]
    fn moving_start_rechecks_end() {
        let mut state = FormState::new(ReservationForm {
            gpu_type: "H100".into(),
            ..Default::default()
        });
        state.set("start_time", "2026-05-10T09:00:00Z").unwrap();
        state.set("end_time", "2026-05-10T09:30:00Z").unwrap();
        assert_eq!(
            state.errors().get("end_time"),
            Some("Reserve at least one hour")
        );

        state.set("start_time", "2026-05-10T07:00:00Z").unwrap();
        assert!(state.errors().is_empty());
        assert!(state.can_submit());

        state.set("start_time", "2026-05-10T10:00:00Z").unwrap();
        assert_eq!(state.errors().get("end_time"), Some("End must be after start"));
        assert!(!state.can_submit());
    }

    #[test]
    fn disk_and_timeout_are_clamped_in_payload() {
        let f = JobForm {
            name: "  train  ".into(),
            hf_repo: "org/model".into(),
            gpu_type: "RTX 4090".into(),
            disk_size: "600".into(),
            timeout_minutes: "5".into(),
            ..Default::default()
        };
        assert!(f.validate().is_empty());
        let p = f.payload();
        assert_eq!(p.disk_size, 500);
        assert_eq!(p.timeout_minutes, 10);
        assert_eq!(p.name, "train");
        assert_eq!(p.source.hf_repo.as_deref(), Some("org/model"));
    }

    #[test]
    fn non_numeric_disk_is_a_field_error() {
        let f = JobForm {
            disk_size: "lots".into(),
            ..Default::default()
        };
        assert_eq!(f.validate_field("disk_size").as_deref(), Some("Must be a number"));
    }

    #[test]
    fn finetune_epochs_clamp_and_rate_must_be_positive() {
        let mut f = FinetuneForm {
            name: "ft".into(),
            base_model: "m".into(),
            dataset: "d.jsonl".into(),
            epochs: "50".into(),
            ..Default::default()
        };
        assert!(f.validate().is_empty());
        assert_eq!(f.payload().epochs, 20);
        f.learning_rate = "-1".into();
        assert!(f.validate_field("learning_rate").is_some());
        f.learning_rate = "abc".into();
        assert!(f.validate_field("learning_rate").is_some());
    }

    #[test]
    fn reservation_window_rules() {
        let mut f = ReservationForm {
            gpu_type: "H100".into(),
            gpu_count: "9".into(),
            start_time: "2026-05-10T09:00:00Z".into(),
            end_time: "2026-05-10T09:30:00Z".into(),
        };
        assert_eq!(f.validate().fields(), vec!["gpu_count", "end_time"]);
        f.gpu_count = "2".into();
        f.end_time = "2026-05-10T08:00:00Z".into();
        assert_eq!(
            f.validate_field("end_time").as_deref(),
            Some("End must be after start")
        );
        f.end_time = "2026-05-11T09:00:00+02:00".into();
        assert!(f.validate().is_empty());
        assert_eq!(f.payload().gpu_count, 2);
        f.start_time = "tomorrow".into();
        assert!(f.validate_field("start_time").is_some());
    }

    #[test]
    fn team_slug_is_derived_and_strings_trimmed() {
        let f = TeamForm {
            name: "  Vision Lab ".into(),
            slug: String::new(),
            description: "  ".into(),
        };
        assert!(f.validate().is_empty());
        let p = f.payload();
        assert_eq!(p.name, "Vision Lab");
        assert_eq!(p.slug, "vision-lab");
        assert!(p.description.is_none());

        let short = TeamForm {
            name: " a ".into(),
            ..Default::default()
        };
        assert!(short.validate_field("name").is_some());
    }

    #[test]
    fn name_without_slug_characters_needs_explicit_slug() {
        let mut state = FormState::new(TeamForm::default());
        state.set("name", "日本").unwrap();
        assert!(state.errors().get("name").is_none());
        assert!(state.errors().get("slug").is_some());
        assert!(!state.can_submit());

        state.set("slug", "japan").unwrap();
        assert!(state.errors().is_empty());
        assert_eq!(state.form().payload().slug, "japan");

        let bangs = TeamForm {
            name: "!!".into(),
            ..Default::default()
        };
        assert_eq!(bangs.validate().fields(), vec!["slug"]);
    }

    #[test]
    fn role_permissions_are_a_set() {
        let mut state = FormState::new(RoleForm::default());
        state.set("name", " ops ").unwrap();
        state
            .set("permissions", "jobs.view, jobs.view ,machines.view")
            .unwrap();
        assert!(state.errors().is_empty());
        assert_eq!(state.form().permissions.len(), 2);
        state.edit("permissions", |f| {
            f.toggle("jobs.view");
            f.toggle("machines.view");
        });
        assert_eq!(
            state.errors().get("permissions"),
            Some("Pick at least one permission")
        );
    }

    #[tokio::test]
    async fn server_rejection_becomes_form_banner() {
        let mut state = FormState::new(TeamForm {
            name: "Research".into(),
            ..Default::default()
        });
        let res: Result<(), _> = state
            .submit(|_| async {
                Err(ApiError::Http {
                    status: 409,
                    message: Some("Slug already taken".into()),
                })
            })
            .await;
        assert_eq!(res, Err(SubmitError::Server("Slug already taken".into())));
        assert_eq!(state.server_error(), Some("Slug already taken"));
        assert!(state.errors().is_empty());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut state = FormState::new(TeamForm::default());
        assert_eq!(
            state.set("colour", "red"),
            Err(UnknownField("colour".into()))
        );
    }
}
