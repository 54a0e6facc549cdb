//! Scripted, in-memory backend used by the `/demo-app` route.
//!
//! Every mutation waits a synthetic latency and then edits local state.
//! Follow-up transitions (boot, job progress, training) are scheduled on
//! tokio tasks that die with the backend.

mod fixtures;

use crate::{ApiResult, ConsoleBackend};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use gpudeck_common::gpu_filter::{gpu_name_matches, parse_gpu_patterns};
use gpudeck_common::jobs::{CreateFinetuneRequest, CreateJobRequest, DownloadLink, JobLogs};
use gpudeck_common::price_monitor::window_start;
use gpudeck_common::reservations::CreateReservationRequest;
use gpudeck_common::teams::{CreateRoleRequest, CreateTeamRequest};
use gpudeck_common::{
    ApiError, Balance, CpuStandby, CreateInstanceRequest, DocMenuItem, FinetuneJob,
    FinetuneStatus, GpuPriceSummary, Instance, InstanceStatus, Job, JobStatus, NpsResponse,
    Permission, PriceAlert, PriceMonitorStatus, PricePoint, Reservation, ReservationStats,
    ReservationStatus, Role, SyncReport, Team, TeamDetail, Template,
};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Delays of the scripted transitions.
#[derive(Debug, Clone, Copy)]
pub struct DemoTimings {
    pub latency: Duration,
    pub machine_boot: Duration,
    pub machine_resume: Duration,
    pub sync: Duration,
    pub job_start: Duration,
    pub job_run: Duration,
    pub finetune_queue: Duration,
    pub finetune_start: Duration,
    pub finetune_run: Duration,
}

impl Default for DemoTimings {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(300),
            machine_boot: Duration::from_secs(3),
            machine_resume: Duration::from_secs(2),
            sync: Duration::from_millis(1500),
            job_start: Duration::from_secs(5),
            job_run: Duration::from_secs(30),
            finetune_queue: Duration::from_secs(2),
            finetune_start: Duration::from_secs(5),
            finetune_run: Duration::from_secs(60),
        }
    }
}

pub(crate) struct DemoState {
    instances: Vec<Instance>,
    balance: Balance,
    jobs: Vec<Job>,
    finetunes: Vec<FinetuneJob>,
    teams: Vec<TeamDetail>,
    permissions: Vec<Permission>,
    reservations: Vec<Reservation>,
    nps: Vec<NpsResponse>,
    price_status: PriceMonitorStatus,
    price_summary: Vec<GpuPriceSummary>,
    price_history: Vec<PricePoint>,
    price_alerts: Vec<PriceAlert>,
    docs_menu: Vec<DocMenuItem>,
    docs: HashMap<String, String>,
    templates: Vec<Template>,
    next_id: i64,
}

impl DemoState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn instance_mut(&mut self, id: i64) -> ApiResult<&mut Instance> {
        self.instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("instance", id))
    }

    fn job_mut(&mut self, id: &str) -> ApiResult<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| not_found("job", id))
    }

    fn finetune_mut(&mut self, id: &str) -> ApiResult<&mut FinetuneJob> {
        self.finetunes
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| not_found("finetune job", id))
    }
}

fn not_found(resource: &'static str, id: impl ToString) -> ApiError {
    ApiError::NotFound {
        resource,
        id: id.to_string(),
    }
}

fn conflict(message: &str) -> ApiError {
    ApiError::Http {
        status: 409,
        message: Some(message.to_string()),
    }
}

fn bad_request(message: &str) -> ApiError {
    ApiError::Http {
        status: 400,
        message: Some(message.to_string()),
    }
}

fn random_ip() -> String {
    let mut rng = rand::thread_rng();
    format!("203.0.113.{}", rng.gen_range(10..=250))
}

pub struct DemoBackend {
    state: Arc<Mutex<DemoState>>,
    cancel: CancellationToken,
    timings: DemoTimings,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::with_timings(DemoTimings::default())
    }

    pub fn with_timings(timings: DemoTimings) -> Self {
        Self {
            state: Arc::new(Mutex::new(fixtures::seed(Utc::now()))),
            cancel: CancellationToken::new(),
            timings,
        }
    }

    pub fn timings(&self) -> &DemoTimings {
        &self.timings
    }

    /// Stop every pending scripted transition.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn latency(&self) {
        tokio::time::sleep(self.timings.latency).await;
    }

    /// Run `apply` against the state after `delay`, unless the backend is gone.
    fn schedule<F>(&self, delay: Duration, what: &'static str, apply: F)
    where
        F: FnOnce(&mut DemoState) + Send + 'static,
    {
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("demo transition '{}' dropped", what);
                }
                _ = tokio::time::sleep(delay) => {
                    let mut s = state.lock().await;
                    apply(&mut s);
                    tracing::debug!("demo transition '{}' applied", what);
                }
            }
        });
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DemoBackend {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl ConsoleBackend for DemoBackend {
    fn is_demo(&self) -> bool {
        true
    }

    async fn list_instances(&self) -> ApiResult<Vec<Instance>> {
        Ok(self.state.lock().await.instances.clone())
    }

    async fn balance(&self) -> ApiResult<Balance> {
        Ok(self.state.lock().await.balance.clone())
    }

    async fn create_instance(&self, req: &CreateInstanceRequest) -> ApiResult<Instance> {
        self.latency().await;
        if req.gpu_name.trim().is_empty() {
            return Err(bad_request("gpu_name is required"));
        }
        let created = {
            let mut s = self.state.lock().await;
            let id = s.next_id();
            let inst = Instance {
                id,
                gpu_name: req.gpu_name.clone(),
                num_gpus: req.num_gpus.max(1),
                status: InstanceStatus::Loading,
                actual_status: Some(InstanceStatus::Loading),
                label: req.label.clone(),
                dph_total: 0.35 * req.num_gpus.max(1) as f64,
                start_date: None,
                public_ipaddr: None,
                ssh_host: None,
                ssh_port: None,
                cpu_standby: req.enable_cpu_standby.then(|| CpuStandby {
                    enabled: true,
                    state: Some("provisioning".into()),
                    ip: None,
                }),
            };
            s.instances.push(inst.clone());
            inst
        };

        let id = created.id;
        self.schedule(self.timings.machine_boot, "machine boot", move |s| {
            if let Ok(inst) = s.instance_mut(id) {
                if inst.effective_status() != InstanceStatus::Loading {
                    return;
                }
                let ip = random_ip();
                inst.set_status(InstanceStatus::Running);
                inst.start_date = Some(Utc::now().timestamp() as f64);
                inst.ssh_host = Some(ip.clone());
                inst.ssh_port = Some(22);
                inst.public_ipaddr = Some(ip);
                if let Some(standby) = inst.cpu_standby.as_mut() {
                    standby.state = Some("synced".into());
                    standby.ip = Some(random_ip());
                }
            }
        });
        Ok(created)
    }

    async fn delete_instance(&self, id: i64) -> ApiResult<()> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let before = s.instances.len();
        s.instances.retain(|i| i.id != id);
        if s.instances.len() == before {
            return Err(not_found("instance", id));
        }
        Ok(())
    }

    async fn pause_instance(&self, id: i64) -> ApiResult<()> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let inst = s.instance_mut(id)?;
        if inst.effective_status().is_offline() {
            return Err(conflict("Machine is already stopped"));
        }
        inst.set_status(InstanceStatus::Stopped);
        Ok(())
    }

    async fn resume_instance(&self, id: i64) -> ApiResult<()> {
        self.latency().await;
        {
            let mut s = self.state.lock().await;
            let inst = s.instance_mut(id)?;
            if inst.effective_status() != InstanceStatus::Stopped {
                return Err(conflict("Only stopped machines can be resumed"));
            }
            inst.set_status(InstanceStatus::Starting);
        }
        self.schedule(self.timings.machine_resume, "machine resume", move |s| {
            if let Ok(inst) = s.instance_mut(id) {
                if inst.effective_status() == InstanceStatus::Starting {
                    inst.set_status(InstanceStatus::Running);
                    inst.start_date = Some(Utc::now().timestamp() as f64);
                }
            }
        });
        Ok(())
    }

    async fn sync_instance(&self, id: i64, force: bool) -> ApiResult<SyncReport> {
        {
            let mut s = self.state.lock().await;
            s.instance_mut(id)?;
        }
        tokio::time::sleep(self.timings.sync).await;
        let (files_changed, bytes_transferred) = {
            let mut rng = rand::thread_rng();
            if force {
                (rng.gen_range(800..2400u64), rng.gen_range(2_000_000_000..6_000_000_000u64))
            } else {
                (rng.gen_range(3..120u64), rng.gen_range(40_000..90_000_000u64))
            }
        };
        Ok(SyncReport {
            snapshot_id: Some(format!("snap-{}-{}", id, Uuid::new_v4().simple())),
            files_changed,
            bytes_transferred,
            forced: force,
            duration_ms: self.timings.sync.as_millis() as u64,
        })
    }

    async fn list_jobs(&self) -> ApiResult<Vec<Job>> {
        Ok(self.state.lock().await.jobs.clone())
    }

    async fn create_job(&self, req: &CreateJobRequest) -> ApiResult<Job> {
        self.latency().await;
        let job = {
            let mut s = self.state.lock().await;
            let n = s.next_id();
            let job = Job {
                id: format!("job-{:x}", n),
                name: req.name.clone(),
                status: JobStatus::Pending,
                source: req.source.clone(),
                gpu_type: Some(req.gpu_type.clone()),
                disk_size: Some(req.disk_size),
                timeout_minutes: Some(req.timeout_minutes),
                created_at: Some(Utc::now().to_rfc3339()),
                error_message: None,
                instance_id: None,
            };
            s.jobs.insert(0, job.clone());
            job
        };

        let id = job.id.clone();
        self.schedule(self.timings.job_start, "job start", move |s| {
            if let Ok(j) = s.job_mut(&id) {
                if j.status == JobStatus::Pending {
                    j.status = JobStatus::Running;
                }
            }
        });
        let id = job.id.clone();
        self.schedule(
            self.timings.job_start + self.timings.job_run,
            "job finish",
            move |s| {
                if let Ok(j) = s.job_mut(&id) {
                    if j.status == JobStatus::Running {
                        j.status = JobStatus::Completed;
                    }
                }
            },
        );
        Ok(job)
    }

    async fn cancel_job(&self, id: &str) -> ApiResult<()> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let job = s.job_mut(id)?;
        if !job.status.can_cancel() {
            return Err(conflict("Job can no longer be cancelled"));
        }
        job.status = JobStatus::Cancelled;
        Ok(())
    }

    async fn job_logs(&self, id: &str) -> ApiResult<JobLogs> {
        let mut s = self.state.lock().await;
        let job = s.job_mut(id)?;
        let mut lines = vec![
            format!("[gpudeck] job {} ({}) accepted", job.id, job.name),
            format!("[gpudeck] source {}", job.source.describe()),
        ];
        if !matches!(job.status, JobStatus::Pending) {
            lines.push(format!(
                "[gpudeck] attached {}",
                job.gpu_type.as_deref().unwrap_or("gpu")
            ));
            lines.push("step 1/3 loading weights".into());
        }
        match job.status {
            JobStatus::Completed => {
                lines.push("step 3/3 done".into());
                lines.push("[gpudeck] exit code 0".into());
            }
            JobStatus::Failed => {
                lines.push(format!(
                    "error: {}",
                    job.error_message.as_deref().unwrap_or("unknown failure")
                ));
            }
            JobStatus::Cancelled => lines.push("[gpudeck] cancelled by user".into()),
            _ => {}
        }
        Ok(JobLogs {
            logs: lines.join("\n"),
        })
    }

    async fn list_finetune_jobs(&self) -> ApiResult<Vec<FinetuneJob>> {
        Ok(self.state.lock().await.finetunes.clone())
    }

    async fn create_finetune_job(&self, req: &CreateFinetuneRequest) -> ApiResult<FinetuneJob> {
        self.latency().await;
        let job = {
            let mut s = self.state.lock().await;
            let n = s.next_id();
            let job = FinetuneJob {
                id: format!("ft-{}", n),
                name: req.name.clone(),
                base_model: req.base_model.clone(),
                dataset: Some(req.dataset.clone()),
                status: FinetuneStatus::Uploading,
                progress: Some(0.0),
                gpu_type: Some(req.gpu_type.clone()),
                epochs: Some(req.epochs),
                created_at: Some(Utc::now().to_rfc3339()),
                deployed_endpoint: None,
                error_message: None,
            };
            s.finetunes.insert(0, job.clone());
            job
        };

        let t = self.timings;
        let steps = [
            (t.finetune_queue, FinetuneStatus::Uploading, FinetuneStatus::Queued, 0.0),
            (
                t.finetune_queue + t.finetune_start,
                FinetuneStatus::Queued,
                FinetuneStatus::Running,
                5.0,
            ),
            (
                t.finetune_queue + t.finetune_start + t.finetune_run,
                FinetuneStatus::Running,
                FinetuneStatus::Completed,
                100.0,
            ),
        ];
        for (delay, from, to, progress) in steps {
            let id = job.id.clone();
            self.schedule(delay, "finetune step", move |s| {
                if let Ok(j) = s.finetune_mut(&id) {
                    if j.status == from {
                        j.status = to;
                        j.progress = Some(progress);
                    }
                }
            });
        }
        Ok(job)
    }

    async fn cancel_finetune_job(&self, id: &str) -> ApiResult<()> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let job = s.finetune_mut(id)?;
        if job.status.is_terminal() {
            return Err(conflict("Fine-tune job already finished"));
        }
        job.status = FinetuneStatus::Cancelled;
        Ok(())
    }

    async fn deploy_finetune_job(&self, id: &str) -> ApiResult<FinetuneJob> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let job = s.finetune_mut(id)?;
        if job.status != FinetuneStatus::Completed {
            return Err(conflict("Only completed fine-tunes can be deployed"));
        }
        if job.deployed_endpoint.is_none() {
            job.deployed_endpoint = Some(format!("https://inference.gpudeck.dev/v1/{}", job.id));
        }
        Ok(job.clone())
    }

    async fn delete_finetune_job(&self, id: &str) -> ApiResult<()> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let before = s.finetunes.len();
        s.finetunes.retain(|j| j.id != id);
        if s.finetunes.len() == before {
            return Err(not_found("finetune job", id));
        }
        Ok(())
    }

    async fn finetune_logs(&self, id: &str) -> ApiResult<JobLogs> {
        let mut s = self.state.lock().await;
        let job = s.finetune_mut(id)?;
        let epochs = job.epochs.unwrap_or(1).max(1);
        let progress = job.progress.unwrap_or(0.0);
        let mut lines = vec![format!(
            "[gpudeck] fine-tuning {} on {}",
            job.base_model,
            job.dataset.as_deref().unwrap_or("-")
        )];
        let done_epochs = ((progress / 100.0) * epochs as f64).floor() as u32;
        for e in 1..=done_epochs {
            lines.push(format!("epoch {}/{} loss={:.3}", e, epochs, 1.8 / e as f64));
        }
        lines.push(format!("status {} ({:.0}%)", job.status.as_str(), progress));
        Ok(JobLogs {
            logs: lines.join("\n"),
        })
    }

    async fn finetune_download(&self, id: &str) -> ApiResult<DownloadLink> {
        let mut s = self.state.lock().await;
        let job = s.finetune_mut(id)?;
        if job.status != FinetuneStatus::Completed {
            return Err(conflict("Weights are available once training completes"));
        }
        Ok(DownloadLink {
            url: format!("https://artifacts.gpudeck.dev/{}/adapter.safetensors", job.id),
            expires_at: Some((Utc::now() + ChronoDuration::hours(1)).to_rfc3339()),
        })
    }

    async fn list_teams(&self) -> ApiResult<Vec<Team>> {
        let s = self.state.lock().await;
        Ok(s.teams.iter().map(|t| t.team.clone()).collect())
    }

    async fn create_team(&self, req: &CreateTeamRequest) -> ApiResult<Team> {
        self.latency().await;
        let mut s = self.state.lock().await;
        if s.teams.iter().any(|t| t.team.slug == req.slug) {
            return Err(conflict("A team with this slug already exists"));
        }
        let team = Team {
            id: s.next_id(),
            name: req.name.clone(),
            slug: req.slug.clone(),
            description: req.description.clone(),
            member_count: 1,
            user_role: Some("owner".into()),
        };
        s.teams.push(TeamDetail {
            team: team.clone(),
            roles: vec![],
        });
        Ok(team)
    }

    async fn get_team(&self, id: i64) -> ApiResult<TeamDetail> {
        let s = self.state.lock().await;
        s.teams
            .iter()
            .find(|t| t.team.id == id)
            .cloned()
            .ok_or_else(|| not_found("team", id))
    }

    async fn list_permissions(&self) -> ApiResult<Vec<Permission>> {
        Ok(self.state.lock().await.permissions.clone())
    }

    async fn create_role(&self, team_id: i64, req: &CreateRoleRequest) -> ApiResult<Role> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let known: Vec<String> = s.permissions.iter().map(|p| p.name.clone()).collect();
        if let Some(unknown) = req.permissions.iter().find(|p| !known.contains(p)) {
            return Err(bad_request(&format!("Unknown permission '{}'", unknown)));
        }
        let team = s
            .teams
            .iter_mut()
            .find(|t| t.team.id == team_id)
            .ok_or_else(|| not_found("team", team_id))?;
        if team.roles.iter().any(|r| r.name == req.name) {
            return Err(conflict("Role already exists in this team"));
        }
        let role = Role {
            name: req.name.clone(),
            description: req.description.clone(),
            permissions: req.permissions.clone(),
        };
        team.roles.push(role.clone());
        Ok(role)
    }

    async fn docs_menu(&self) -> ApiResult<Vec<DocMenuItem>> {
        Ok(self.state.lock().await.docs_menu.clone())
    }

    async fn docs_content(&self, id: &str) -> ApiResult<String> {
        let s = self.state.lock().await;
        s.docs.get(id).cloned().ok_or_else(|| not_found("doc", id))
    }

    async fn price_status(&self) -> ApiResult<PriceMonitorStatus> {
        Ok(self.state.lock().await.price_status.clone())
    }

    async fn price_summary(&self) -> ApiResult<Vec<GpuPriceSummary>> {
        Ok(self.state.lock().await.price_summary.clone())
    }

    async fn price_history(&self, gpu_name: Option<&str>, hours: u32) -> ApiResult<Vec<PricePoint>> {
        let patterns = parse_gpu_patterns(gpu_name);
        let since = window_start(Utc::now(), i64::from(hours));
        let s = self.state.lock().await;
        Ok(s.price_history
            .iter()
            .filter(|p| p.timestamp >= since && gpu_name_matches(&p.gpu_name, &patterns))
            .cloned()
            .collect())
    }

    async fn price_alerts(&self) -> ApiResult<Vec<PriceAlert>> {
        Ok(self.state.lock().await.price_alerts.clone())
    }

    async fn list_reservations(&self) -> ApiResult<Vec<Reservation>> {
        Ok(self.state.lock().await.reservations.clone())
    }

    async fn reservation_stats(&self) -> ApiResult<ReservationStats> {
        let s = self.state.lock().await;
        Ok(ReservationStats::from_reservations(&s.reservations))
    }

    async fn create_reservation(&self, req: &CreateReservationRequest) -> ApiResult<Reservation> {
        self.latency().await;
        if req.end_time <= req.start_time {
            return Err(bad_request("end_time must be after start_time"));
        }
        let hours = (req.end_time - req.start_time).num_hours();
        let discount_rate = match hours {
            h if h >= 168 => 0.20,
            h if h >= 24 => 0.10,
            _ => 0.05,
        };
        let mut s = self.state.lock().await;
        let r = Reservation {
            id: s.next_id(),
            gpu_type: req.gpu_type.clone(),
            gpu_count: req.gpu_count,
            start_time: req.start_time,
            end_time: req.end_time,
            status: ReservationStatus::Pending,
            credits_used: 0.0,
            discount_rate,
        };
        s.reservations.push(r.clone());
        Ok(r)
    }

    async fn cancel_reservation(&self, id: i64) -> ApiResult<()> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let r = s
            .reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("reservation", id))?;
        if !r.status.can_cancel() {
            return Err(conflict("Reservation can no longer be cancelled"));
        }
        r.status = ReservationStatus::Cancelled;
        Ok(())
    }

    async fn list_nps_responses(&self) -> ApiResult<Vec<NpsResponse>> {
        Ok(self.state.lock().await.nps.clone())
    }

    async fn mark_nps_followed_up(&self, id: i64, notes: Option<&str>) -> ApiResult<()> {
        self.latency().await;
        let mut s = self.state.lock().await;
        let r = s
            .nps
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("nps response", id))?;
        r.followed_up = true;
        r.followup_notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(())
    }

    async fn list_templates(&self) -> ApiResult<Vec<Template>> {
        Ok(self.state.lock().await.templates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_state_covers_every_page() {
        let demo = DemoBackend::new();
        assert!(demo.is_demo());
        assert!(!demo.list_instances().await.unwrap().is_empty());
        assert!(!demo.list_jobs().await.unwrap().is_empty());
        assert!(!demo.list_finetune_jobs().await.unwrap().is_empty());
        assert!(!demo.list_teams().await.unwrap().is_empty());
        assert!(!demo.list_reservations().await.unwrap().is_empty());
        assert!(!demo.list_nps_responses().await.unwrap().is_empty());
        assert!(!demo.price_summary().await.unwrap().is_empty());
        assert!(!demo.list_templates().await.unwrap().is_empty());
        let menu = demo.docs_menu().await.unwrap();
        for item in &menu {
            assert!(demo.docs_content(&item.id).await.is_ok());
            for child in &item.children {
                assert!(demo.docs_content(&child.id).await.is_ok());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pause_then_resume_walks_through_starting() {
        let demo = DemoBackend::new();
        demo.pause_instance(501).await.unwrap();
        let status = |list: Vec<Instance>| {
            list.into_iter()
                .find(|i| i.id == 501)
                .map(|i| i.effective_status())
        };
        assert_eq!(
            status(demo.list_instances().await.unwrap()),
            Some(InstanceStatus::Stopped)
        );
        demo.resume_instance(501).await.unwrap();
        assert_eq!(
            status(demo.list_instances().await.unwrap()),
            Some(InstanceStatus::Starting)
        );
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(
            status(demo.list_instances().await.unwrap()),
            Some(InstanceStatus::Running)
        );
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let demo = DemoBackend::with_timings(DemoTimings {
            latency: Duration::ZERO,
            ..Default::default()
        });
        assert!(matches!(
            demo.delete_instance(-1).await,
            Err(ApiError::NotFound { .. })
        ));
        assert!(matches!(
            demo.cancel_job("nope").await,
            Err(ApiError::NotFound { .. })
        ));
        assert!(matches!(
            demo.docs_content("nope").await,
            Err(ApiError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn finished_jobs_cannot_be_cancelled() {
        let demo = DemoBackend::with_timings(DemoTimings {
            latency: Duration::ZERO,
            ..Default::default()
        });
        let err = demo.cancel_job("job-44d0").await.unwrap_err();
        assert!(err.is_client_error());
    }
}
