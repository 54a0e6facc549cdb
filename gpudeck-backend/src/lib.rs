use async_trait::async_trait;
use gpudeck_common::jobs::{CreateFinetuneRequest, CreateJobRequest, DownloadLink, JobLogs};
use gpudeck_common::reservations::CreateReservationRequest;
use gpudeck_common::teams::{CreateRoleRequest, CreateTeamRequest};
pub use gpudeck_common::ApiError;
use gpudeck_common::{
    Balance, CreateInstanceRequest, DocMenuItem, FinetuneJob, GpuPriceSummary, Instance,
    Job, NpsResponse, Permission, PriceAlert, PriceMonitorStatus, PricePoint, Reservation,
    ReservationStats, Role, SyncReport, Team, TeamDetail, Template,
};

pub mod envelope;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything the console asks of the GPU cloud backend.
///
/// One method per REST operation. Implementations: `HttpBackend` talks to the
/// real API, `DemoBackend` mutates an in-memory copy with scripted delays.
#[async_trait]
pub trait ConsoleBackend: Send + Sync {
    /// True for the scripted demo implementation.
    fn is_demo(&self) -> bool {
        false
    }

    // --- Machines ---
    async fn list_instances(&self) -> ApiResult<Vec<Instance>>;
    async fn balance(&self) -> ApiResult<Balance>;
    async fn create_instance(&self, req: &CreateInstanceRequest) -> ApiResult<Instance>;
    async fn delete_instance(&self, id: i64) -> ApiResult<()>;
    async fn pause_instance(&self, id: i64) -> ApiResult<()>;
    async fn resume_instance(&self, id: i64) -> ApiResult<()>;
    /// Incremental sync to the CPU standby; `force` re-sends everything.
    async fn sync_instance(&self, id: i64, force: bool) -> ApiResult<SyncReport>;

    // --- Jobs ---
    async fn list_jobs(&self) -> ApiResult<Vec<Job>>;
    async fn create_job(&self, req: &CreateJobRequest) -> ApiResult<Job>;
    async fn cancel_job(&self, id: &str) -> ApiResult<()>;
    async fn job_logs(&self, id: &str) -> ApiResult<JobLogs>;

    // --- Fine-tuning ---
    async fn list_finetune_jobs(&self) -> ApiResult<Vec<FinetuneJob>>;
    async fn create_finetune_job(&self, req: &CreateFinetuneRequest) -> ApiResult<FinetuneJob>;
    async fn cancel_finetune_job(&self, id: &str) -> ApiResult<()>;
    async fn deploy_finetune_job(&self, id: &str) -> ApiResult<FinetuneJob>;
    async fn delete_finetune_job(&self, id: &str) -> ApiResult<()>;
    async fn finetune_logs(&self, id: &str) -> ApiResult<JobLogs>;
    async fn finetune_download(&self, id: &str) -> ApiResult<DownloadLink>;

    // --- Teams & roles ---
    async fn list_teams(&self) -> ApiResult<Vec<Team>>;
    async fn create_team(&self, req: &CreateTeamRequest) -> ApiResult<Team>;
    async fn get_team(&self, id: i64) -> ApiResult<TeamDetail>;
    async fn list_permissions(&self) -> ApiResult<Vec<Permission>>;
    async fn create_role(&self, team_id: i64, req: &CreateRoleRequest) -> ApiResult<Role>;

    // --- Docs ---
    async fn docs_menu(&self) -> ApiResult<Vec<DocMenuItem>>;
    /// Raw Markdown of one document.
    async fn docs_content(&self, id: &str) -> ApiResult<String>;

    // --- Price monitor ---
    async fn price_status(&self) -> ApiResult<PriceMonitorStatus>;
    async fn price_summary(&self) -> ApiResult<Vec<GpuPriceSummary>>;
    async fn price_history(&self, gpu_name: Option<&str>, hours: u32) -> ApiResult<Vec<PricePoint>>;
    async fn price_alerts(&self) -> ApiResult<Vec<PriceAlert>>;

    // --- Reservations ---
    async fn list_reservations(&self) -> ApiResult<Vec<Reservation>>;
    async fn reservation_stats(&self) -> ApiResult<ReservationStats>;
    async fn create_reservation(&self, req: &CreateReservationRequest) -> ApiResult<Reservation>;
    async fn cancel_reservation(&self, id: i64) -> ApiResult<()>;

    // --- NPS ---
    async fn list_nps_responses(&self) -> ApiResult<Vec<NpsResponse>>;
    async fn mark_nps_followed_up(&self, id: i64, notes: Option<&str>) -> ApiResult<()>;

    // --- Marketplace ---
    async fn list_templates(&self) -> ApiResult<Vec<Template>>;
}

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "demo")]
pub mod demo;

#[cfg(feature = "http")]
pub use http::{HttpBackend, HttpTimeouts};

#[cfg(feature = "demo")]
pub use demo::{DemoBackend, DemoTimings};
