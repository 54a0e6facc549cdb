use crate::banner::ErrorBanner;
use crate::poller::{FetchSequencer, PollHandle, Poller};
use crate::session::Session;
use chrono::Utc;
use gpudeck_backend::{ApiError, ApiResult, ConsoleBackend};
use gpudeck_common::gpu_filter::parse_gpu_patterns;
use gpudeck_common::price_monitor::{
    filter_summaries, history_window, trend_percent, trends_by_gpu, PriceBand, PriceSort,
};
use gpudeck_common::{GpuPriceSummary, PriceAlert, PriceMonitorStatus, PricePoint};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_HISTORY_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceFilter {
    /// Upper-cased GPU globs; empty matches everything.
    pub patterns: Vec<String>,
    pub band: PriceBand,
    pub sort: PriceSort,
    pub hours: u32,
}

impl Default for PriceFilter {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            band: PriceBand::default(),
            sort: PriceSort::default(),
            hours: DEFAULT_HISTORY_HOURS,
        }
    }
}

impl PriceFilter {
    /// Filter from the comma separated GPU box.
    pub fn with_gpus(mut self, raw: Option<&str>) -> Self {
        self.patterns = parse_gpu_patterns(raw);
        self
    }
}

/// What the page renders after filtering.
#[derive(Debug, Clone, Default)]
pub struct PriceView {
    pub status: PriceMonitorStatus,
    pub summaries: Vec<GpuPriceSummary>,
    pub history: Vec<PricePoint>,
    /// Set when the window holds a single GPU model.
    pub trend_percent: Option<f64>,
    pub trends: BTreeMap<String, f64>,
    pub alerts: Vec<PriceAlert>,
}

#[derive(Default)]
struct PriceState {
    status: PriceMonitorStatus,
    summaries: Vec<GpuPriceSummary>,
    history: Vec<PricePoint>,
    alerts: Vec<PriceAlert>,
    filter: PriceFilter,
    banner: ErrorBanner,
}

#[derive(Clone)]
pub struct PriceMonitorPage {
    session: Arc<Session>,
    backend: Arc<dyn ConsoleBackend>,
    state: Arc<RwLock<PriceState>>,
    seq: Arc<FetchSequencer>,
}

fn keep<T: Default>(result: ApiResult<T>, first_error: &mut Option<ApiError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            if first_error.is_none() {
                *first_error = Some(e);
            }
            T::default()
        }
    }
}

impl PriceMonitorPage {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            backend: session.backend(),
            session,
            state: Arc::new(RwLock::new(PriceState::default())),
            seq: Arc::new(FetchSequencer::new()),
        }
    }

    /// Status, summary, history and alerts, fetched together.
    pub async fn refresh(&self) {
        let hours = self.state.read().await.filter.hours;
        let ticket = self.seq.ticket();
        let (status, summaries, history, alerts) = tokio::join!(
            self.backend.price_status(),
            self.backend.price_summary(),
            self.backend.price_history(None, hours),
            self.backend.price_alerts()
        );

        let mut st = self.state.write().await;
        if !self.seq.try_apply(ticket) {
            return;
        }
        let mut failure = None;
        st.status = keep(status, &mut failure);
        st.summaries = keep(summaries, &mut failure);
        st.history = keep(history, &mut failure);
        st.alerts = keep(alerts, &mut failure);
        match failure {
            Some(e) => st.banner.report("loading price metrics", &e),
            None => st.banner.dismiss(),
        }
    }

    pub async fn filter(&self) -> PriceFilter {
        self.state.read().await.filter.clone()
    }

    /// Replace the filter. A wider history window needs a new fetch.
    pub async fn set_filter(&self, filter: PriceFilter) {
        let refetch = {
            let mut st = self.state.write().await;
            let wider = filter.hours > st.filter.hours;
            st.filter = filter;
            wider
        };
        if refetch {
            self.refresh().await;
        }
    }

    pub async fn view(&self) -> PriceView {
        let st = self.state.read().await;
        let f = &st.filter;
        let history = history_window(&st.history, &f.patterns, Utc::now(), i64::from(f.hours));
        PriceView {
            status: st.status.clone(),
            summaries: filter_summaries(&st.summaries, &f.patterns, f.band, f.sort),
            trend_percent: trend_percent(&history),
            trends: trends_by_gpu(&history),
            history,
            alerts: st.alerts.clone(),
        }
    }

    pub async fn banner(&self) -> ErrorBanner {
        self.state.read().await.banner.clone()
    }

    pub fn start_polling(&self) -> PollHandle {
        let page = self.clone();
        Poller::spawn("prices", self.session.poll().prices, move || {
            let page = page.clone();
            async move { page.refresh().await }
        })
    }
}
