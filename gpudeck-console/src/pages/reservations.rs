use crate::banner::ErrorBanner;
use crate::forms::{FormState, ReservationForm, SubmitError};
use crate::poller::FetchSequencer;
use crate::session::Session;
use gpudeck_backend::{ApiResult, ConsoleBackend};
use gpudeck_common::{Reservation, ReservationStats, ReservationStatus};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct ReservationsState {
    reservations: Vec<Reservation>,
    server_stats: Option<ReservationStats>,
    banner: ErrorBanner,
}

#[derive(Clone)]
pub struct ReservationsPage {
    backend: Arc<dyn ConsoleBackend>,
    state: Arc<RwLock<ReservationsState>>,
    seq: Arc<FetchSequencer>,
}

impl ReservationsPage {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            backend: session.backend(),
            state: Arc::new(RwLock::new(ReservationsState::default())),
            seq: Arc::new(FetchSequencer::new()),
        }
    }

    pub async fn refresh(&self) {
        let ticket = self.seq.ticket();
        let (list, stats) = tokio::join!(
            self.backend.list_reservations(),
            self.backend.reservation_stats()
        );
        let mut st = self.state.write().await;
        if !self.seq.try_apply(ticket) {
            return;
        }
        st.reservations = st.banner.settle("loading reservations", list);
        st.server_stats = match stats {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::debug!("reservation stats unavailable: {}", e);
                None
            }
        };
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.read().await.reservations.clone()
    }

    pub async fn filtered(&self, status: Option<ReservationStatus>) -> Vec<Reservation> {
        let st = self.state.read().await;
        st.reservations
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect()
    }

    /// Computed from the loaded list; the server's numbers are used only
    /// when the list is empty.
    pub async fn stats(&self) -> ReservationStats {
        let st = self.state.read().await;
        if st.reservations.is_empty() {
            if let Some(server) = &st.server_stats {
                return server.clone();
            }
        }
        ReservationStats::from_reservations(&st.reservations)
    }

    pub async fn banner(&self) -> ErrorBanner {
        self.state.read().await.banner.clone()
    }

    pub async fn create(&self, form: &mut FormState<ReservationForm>) -> Result<Reservation, SubmitError> {
        let backend = self.backend.clone();
        let created = form
            .submit(|req| async move { backend.create_reservation(&req).await })
            .await?;
        tracing::info!(
            "📅 reserved {}x {} ({:.0} h, {:.0}% off)",
            created.gpu_count,
            created.gpu_type,
            created.hours(),
            created.discount_rate * 100.0
        );
        self.refresh().await;
        Ok(created)
    }

    pub async fn cancel(&self, id: i64) -> ApiResult<()> {
        if let Err(e) = self.backend.cancel_reservation(id).await {
            self.state.write().await.banner.report("cancelling reservation", &e);
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }
}
