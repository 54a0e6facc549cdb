use super::TaskScope;
use crate::banner::ErrorBanner;
use crate::poller::{FetchSequencer, PollHandle, Poller};
use crate::session::Session;
use crate::simulation::{FailoverDelays, FailoverProgress, FailoverSimulation};
use crate::store::SliceWriter;
use crate::sync_state::{SyncState, SyncTracker};
use gpudeck_backend::{ApiError, ApiResult, ConsoleBackend};
use gpudeck_common::{partition_instances, Balance, CreateInstanceRequest, Instance, InstanceStatus, Offer, SyncReport};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const HIGHLIGHT_FOR: Duration = Duration::from_secs(8);

#[derive(Default)]
struct MachinesState {
    instances: Vec<Instance>,
    balance: Option<Balance>,
    banner: ErrorBanner,
    loaded: bool,
    highlighted: Option<i64>,
    sync: SyncTracker,
    failovers: HashMap<i64, FailoverSimulation>,
}

/// Options picked on the "new machine" dialog besides the offer.
#[derive(Debug, Clone, Default)]
pub struct NewMachine {
    pub label: Option<String>,
    pub image: Option<String>,
    pub disk_size: Option<u32>,
    pub cpu_standby: bool,
}

#[derive(Clone)]
pub struct MachinesPage {
    session: Arc<Session>,
    backend: Arc<dyn ConsoleBackend>,
    state: Arc<RwLock<MachinesState>>,
    machines_seq: Arc<FetchSequencer>,
    balance_seq: Arc<FetchSequencer>,
    racing: Arc<SliceWriter<BTreeSet<i64>>>,
    scope: Arc<TaskScope>,
    failover_delays: FailoverDelays,
}

impl MachinesPage {
    pub fn new(session: Arc<Session>, racing: SliceWriter<BTreeSet<i64>>) -> Self {
        Self {
            backend: session.backend(),
            session,
            state: Arc::new(RwLock::new(MachinesState::default())),
            machines_seq: Arc::new(FetchSequencer::new()),
            balance_seq: Arc::new(FetchSequencer::new()),
            racing: Arc::new(racing),
            scope: Arc::new(TaskScope::default()),
            failover_delays: FailoverDelays::default(),
        }
    }

    pub fn with_failover_delays(mut self, delays: FailoverDelays) -> Self {
        self.failover_delays = delays;
        self
    }

    pub async fn refresh(&self) {
        let ticket = self.machines_seq.ticket();
        let result = self.backend.list_instances().await;
        let mut st = self.state.write().await;
        if !self.machines_seq.try_apply(ticket) {
            return;
        }
        st.instances = st.banner.settle("loading machines", result);
        st.loaded = true;

        let ids: Vec<i64> = st.instances.iter().map(|i| i.id).collect();
        st.sync.retain_ids(&ids);
        // a finished walkthrough stops overriding what the backend reports
        st.failovers
            .retain(|id, sim| ids.contains(id) && !sim.is_finished());
        let still_booting: BTreeSet<i64> = st
            .instances
            .iter()
            .filter(|i| i.effective_status().is_transitional())
            .map(|i| i.id)
            .collect();
        self.racing
            .update(|racing| racing.retain(|id| still_booting.contains(id)));
    }

    pub async fn refresh_balance(&self) {
        let ticket = self.balance_seq.ticket();
        let result = self.backend.balance().await;
        let mut st = self.state.write().await;
        if !self.balance_seq.try_apply(ticket) {
            return;
        }
        match result {
            Ok(b) => st.balance = Some(b),
            Err(e) => {
                st.balance = None;
                st.banner.report("loading balance", &e);
            }
        }
    }

    pub async fn refresh_all(&self) {
        tokio::join!(self.refresh(), self.refresh_balance());
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    /// Machines as shown, with running failover walkthroughs applied.
    pub async fn machines(&self) -> Vec<Instance> {
        let st = self.state.read().await;
        let mut list = st.instances.clone();
        for inst in list.iter_mut() {
            if let Some(sim) = st.failovers.get(&inst.id) {
                sim.progress().apply_to(inst);
            }
        }
        list
    }

    /// (active, offline) split of `machines()`.
    pub async fn partitioned(&self) -> (Vec<Instance>, Vec<Instance>) {
        let list = self.machines().await;
        let (active, offline) = partition_instances(&list);
        (
            active.into_iter().cloned().collect(),
            offline.into_iter().cloned().collect(),
        )
    }

    pub async fn balance(&self) -> Option<Balance> {
        self.state.read().await.balance.clone()
    }

    pub async fn banner(&self) -> ErrorBanner {
        self.state.read().await.banner.clone()
    }

    pub async fn dismiss_banner(&self) {
        self.state.write().await.banner.dismiss();
    }

    pub async fn highlighted(&self) -> Option<i64> {
        self.state.read().await.highlighted
    }

    pub async fn create_machine(&self, offer: &Offer, opts: NewMachine) -> ApiResult<Instance> {
        let mut req = CreateInstanceRequest::from(offer);
        req.label = opts.label.filter(|l| !l.trim().is_empty());
        req.image = opts.image;
        req.disk_size = opts.disk_size;
        req.enable_cpu_standby = opts.cpu_standby;

        let created = match self.backend.create_instance(&req).await {
            Ok(inst) => inst,
            Err(e) => {
                self.state.write().await.banner.report("creating machine", &e);
                return Err(e);
            }
        };
        tracing::info!("🚀 machine {} requested ({})", created.id, created.gpu_name);
        self.racing.update(|ids| {
            ids.insert(created.id);
        });
        self.highlight(created.id).await;
        self.refresh().await;
        Ok(created)
    }

    async fn highlight(&self, id: i64) {
        self.state.write().await.highlighted = Some(id);
        let state = self.state.clone();
        let token = self.scope.token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(HIGHLIGHT_FOR) => {
                    let mut st = state.write().await;
                    if st.highlighted == Some(id) {
                        st.highlighted = None;
                    }
                }
            }
        });
    }

    async fn mutate<F>(&self, what: &str, call: F) -> ApiResult<()>
    where
        F: std::future::Future<Output = ApiResult<()>>,
    {
        match call.await {
            Ok(()) => {
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                self.state.write().await.banner.report(what, &e);
                Err(e)
            }
        }
    }

    pub async fn delete_machine(&self, id: i64) -> ApiResult<()> {
        self.mutate("deleting machine", self.backend.delete_instance(id))
            .await?;
        self.racing.update(|ids| {
            ids.remove(&id);
        });
        Ok(())
    }

    pub async fn pause_machine(&self, id: i64) -> ApiResult<()> {
        self.mutate("pausing machine", self.backend.pause_instance(id))
            .await
    }

    pub async fn resume_machine(&self, id: i64) -> ApiResult<()> {
        self.mutate("resuming machine", self.backend.resume_instance(id))
            .await
    }

    pub async fn sync_state(&self, id: i64) -> SyncState {
        self.state.read().await.sync.get(id)
    }

    /// Sync the machine's CPU standby. A second request while one runs is refused.
    pub async fn sync_machine(&self, id: i64, force: bool) -> ApiResult<SyncReport> {
        if !self.state.write().await.sync.begin(id, force) {
            return Err(ApiError::Http {
                status: 409,
                message: Some("A sync is already running for this machine".to_string()),
            });
        }
        // runs to completion even if the caller stops waiting, so the
        // tracker never stays busy
        let page = self.clone();
        let task = tokio::spawn(async move { page.finish_sync(id, force).await });
        match task.await {
            Ok(result) => result,
            Err(e) => {
                let err = ApiError::Network(format!("sync task ended early: {}", e));
                self.state
                    .write()
                    .await
                    .sync
                    .finish(id, Err(err.user_message()));
                Err(err)
            }
        }
    }

    async fn finish_sync(&self, id: i64, force: bool) -> ApiResult<SyncReport> {
        let result = self.backend.sync_instance(id, force).await;
        let mut st = self.state.write().await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    "💾 machine {} synced: {} file(s), forced={}",
                    id,
                    report.files_changed,
                    report.forced
                );
                st.sync.finish(id, Ok(report.clone()));
            }
            Err(e) => {
                st.sync.finish(id, Err(e.user_message()));
                st.banner.report("syncing machine", e);
            }
        }
        result
    }

    /// Start the demo failover walkthrough for a machine.
    pub async fn simulate_failover(&self, id: i64) -> ApiResult<()> {
        if !self.session.is_demo() {
            return Err(ApiError::Http {
                status: 400,
                message: Some("Failover simulation is only available in demo mode".to_string()),
            });
        }
        let mut st = self.state.write().await;
        let running = st
            .instances
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.effective_status() == InstanceStatus::Running)
            .ok_or_else(|| ApiError::NotFound {
                resource: "instance",
                id: id.to_string(),
            })?;
        let in_flight = st.failovers.get(&id).is_some_and(|s| !s.is_finished());
        if !running || in_flight {
            return Err(ApiError::Http {
                status: 409,
                message: Some("Only running machines can fail over".to_string()),
            });
        }
        st.failovers
            .insert(id, FailoverSimulation::start(id, self.failover_delays));
        Ok(())
    }

    pub async fn failover_progress(&self, id: i64) -> Option<FailoverProgress> {
        self.state
            .read()
            .await
            .failovers
            .get(&id)
            .map(|sim| sim.progress())
    }

    pub async fn subscribe_failover(&self, id: i64) -> Option<tokio::sync::watch::Receiver<FailoverProgress>> {
        self.state.read().await.failovers.get(&id).map(|s| s.subscribe())
    }

    pub async fn cancel_failover(&self, id: i64) {
        if let Some(sim) = self.state.write().await.failovers.remove(&id) {
            sim.cancel();
        }
    }

    /// Machines every 5 s, balance every 30 s (configurable).
    pub fn start_polling(&self) -> Vec<PollHandle> {
        let every = self.session.poll();
        let machines = {
            let page = self.clone();
            Poller::spawn("machines", every.machines, move || {
                let page = page.clone();
                async move { page.refresh().await }
            })
        };
        let balance = {
            let page = self.clone();
            Poller::spawn("balance", every.balance, move || {
                let page = page.clone();
                async move { page.refresh_balance().await }
            })
        };
        vec![machines, balance]
    }
}
