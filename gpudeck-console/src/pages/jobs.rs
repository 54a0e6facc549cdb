use crate::banner::ErrorBanner;
use crate::forms::{FormState, JobForm, SubmitError};
use crate::poller::{FetchSequencer, PollHandle, Poller};
use crate::session::Session;
use gpudeck_backend::{ApiResult, ConsoleBackend};
use gpudeck_common::jobs::JobLogs;
use gpudeck_common::{Job, JobStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct JobsState {
    jobs: Vec<Job>,
    banner: ErrorBanner,
}

#[derive(Clone)]
pub struct JobsPage {
    session: Arc<Session>,
    backend: Arc<dyn ConsoleBackend>,
    state: Arc<RwLock<JobsState>>,
    seq: Arc<FetchSequencer>,
    // true until the first list says otherwise
    has_active: Arc<AtomicBool>,
}

impl JobsPage {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            backend: session.backend(),
            session,
            state: Arc::new(RwLock::new(JobsState::default())),
            seq: Arc::new(FetchSequencer::new()),
            has_active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn refresh(&self) {
        let ticket = self.seq.ticket();
        let result = self.backend.list_jobs().await;
        let mut st = self.state.write().await;
        if !self.seq.try_apply(ticket) {
            return;
        }
        st.jobs = st.banner.settle("loading jobs", result);
        let active = st.jobs.iter().any(|j| !j.status.is_terminal());
        self.has_active.store(active, Ordering::SeqCst);
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.state.read().await.jobs.clone()
    }

    /// Jobs with the given status; `None` keeps everything.
    pub async fn filtered(&self, status: Option<JobStatus>) -> Vec<Job> {
        let st = self.state.read().await;
        st.jobs
            .iter()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect()
    }

    /// Count per status, in display order, zeros included.
    pub async fn counts(&self) -> Vec<(JobStatus, usize)> {
        let st = self.state.read().await;
        JobStatus::ALL
            .iter()
            .map(|&s| (s, st.jobs.iter().filter(|j| j.status == s).count()))
            .collect()
    }

    pub fn has_active(&self) -> bool {
        self.has_active.load(Ordering::SeqCst)
    }

    pub async fn banner(&self) -> ErrorBanner {
        self.state.read().await.banner.clone()
    }

    pub async fn dismiss_banner(&self) {
        self.state.write().await.banner.dismiss();
    }

    pub async fn submit(&self, form: &mut FormState<JobForm>) -> Result<Job, SubmitError> {
        let backend = self.backend.clone();
        let job = form
            .submit(|req| async move { backend.create_job(&req).await })
            .await?;
        tracing::info!("🧪 job {} submitted ({})", job.id, job.source.describe());
        self.has_active.store(true, Ordering::SeqCst);
        self.refresh().await;
        Ok(job)
    }

    pub async fn cancel(&self, id: &str) -> ApiResult<()> {
        if let Err(e) = self.backend.cancel_job(id).await {
            self.state.write().await.banner.report("cancelling job", &e);
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }

    pub async fn logs(&self, id: &str) -> ApiResult<JobLogs> {
        self.backend.job_logs(id).await
    }

    /// Every 10 s while some job is not terminal.
    pub fn start_polling(&self) -> PollHandle {
        let page = self.clone();
        let flag = self.has_active.clone();
        Poller::spawn_while(
            "jobs",
            self.session.poll().jobs,
            move || flag.load(Ordering::SeqCst),
            move || {
                let page = page.clone();
                async move { page.refresh().await }
            },
        )
    }
}
