use crate::banner::ErrorBanner;
use crate::forms::{FinetuneForm, FormState, SubmitError};
use crate::poller::{FetchSequencer, PollHandle, Poller};
use crate::session::Session;
use gpudeck_backend::{ApiResult, ConsoleBackend};
use gpudeck_common::jobs::{DownloadLink, JobLogs};
use gpudeck_common::FinetuneJob;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct FinetuneState {
    jobs: Vec<FinetuneJob>,
    banner: ErrorBanner,
}

#[derive(Clone)]
pub struct FinetunePage {
    session: Arc<Session>,
    backend: Arc<dyn ConsoleBackend>,
    state: Arc<RwLock<FinetuneState>>,
    seq: Arc<FetchSequencer>,
    has_active: Arc<AtomicBool>,
}

impl FinetunePage {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            backend: session.backend(),
            session,
            state: Arc::new(RwLock::new(FinetuneState::default())),
            seq: Arc::new(FetchSequencer::new()),
            has_active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn refresh(&self) {
        let ticket = self.seq.ticket();
        let result = self.backend.list_finetune_jobs().await;
        let mut st = self.state.write().await;
        if !self.seq.try_apply(ticket) {
            return;
        }
        st.jobs = st.banner.settle("loading fine-tuning jobs", result);
        let active = st.jobs.iter().any(|j| !j.status.is_terminal());
        self.has_active.store(active, Ordering::SeqCst);
    }

    pub async fn jobs(&self) -> Vec<FinetuneJob> {
        self.state.read().await.jobs.clone()
    }

    pub async fn banner(&self) -> ErrorBanner {
        self.state.read().await.banner.clone()
    }

    pub async fn dismiss_banner(&self) {
        self.state.write().await.banner.dismiss();
    }

    pub fn has_active(&self) -> bool {
        self.has_active.load(Ordering::SeqCst)
    }

    pub async fn submit(&self, form: &mut FormState<FinetuneForm>) -> Result<FinetuneJob, SubmitError> {
        let backend = self.backend.clone();
        let job = form
            .submit(|req| async move { backend.create_finetune_job(&req).await })
            .await?;
        tracing::info!("🎛️ fine-tune {} started on {}", job.id, job.base_model);
        self.has_active.store(true, Ordering::SeqCst);
        self.refresh().await;
        Ok(job)
    }

    async fn report<T>(&self, what: &str, result: ApiResult<T>) -> ApiResult<T> {
        match result {
            Ok(v) => {
                self.refresh().await;
                Ok(v)
            }
            Err(e) => {
                self.state.write().await.banner.report(what, &e);
                Err(e)
            }
        }
    }

    pub async fn cancel(&self, id: &str) -> ApiResult<()> {
        let result = self.backend.cancel_finetune_job(id).await;
        self.report("cancelling fine-tune", result).await
    }

    /// Deploy a completed model; returns the updated job with its endpoint.
    pub async fn deploy(&self, id: &str) -> ApiResult<FinetuneJob> {
        let result = self.backend.deploy_finetune_job(id).await;
        let job = self.report("deploying model", result).await?;
        if let Some(endpoint) = &job.deployed_endpoint {
            tracing::info!("📦 model {} served at {}", id, endpoint);
        }
        Ok(job)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let result = self.backend.delete_finetune_job(id).await;
        self.report("deleting fine-tune", result).await
    }

    pub async fn logs(&self, id: &str) -> ApiResult<JobLogs> {
        self.backend.finetune_logs(id).await
    }

    pub async fn download(&self, id: &str) -> ApiResult<DownloadLink> {
        self.backend.finetune_download(id).await
    }

    /// Same cadence as jobs, only while some run is in flight.
    pub fn start_polling(&self) -> PollHandle {
        let page = self.clone();
        let flag = self.has_active.clone();
        Poller::spawn_while(
            "finetune",
            self.session.poll().jobs,
            move || flag.load(Ordering::SeqCst),
            move || {
                let page = page.clone();
                async move { page.refresh().await }
            },
        )
    }
}
