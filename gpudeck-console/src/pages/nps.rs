use crate::banner::ErrorBanner;
use crate::poller::FetchSequencer;
use crate::session::Session;
use crate::store::SliceWriter;
use chrono::{DateTime, Utc};
use gpudeck_backend::{ApiResult, ConsoleBackend};
use gpudeck_common::{NpsCategory, NpsResponse, NpsSummary};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Category plus optional inclusive date range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NpsFilter {
    pub category: Option<NpsCategory>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl NpsFilter {
    pub fn matches(&self, r: &NpsResponse) -> bool {
        if self.category.is_some_and(|c| r.category() != c) {
            return false;
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        // undated responses only show when no range is set
        let Some(at) = r.created_at else {
            return false;
        };
        self.from.map_or(true, |f| at >= f) && self.to.map_or(true, |t| at <= t)
    }
}

#[derive(Default)]
struct NpsState {
    banner: ErrorBanner,
}

/// Customer feedback. The responses live in the shared NPS slice, which
/// this page is the only writer of.
#[derive(Clone)]
pub struct NpsPage {
    backend: Arc<dyn ConsoleBackend>,
    responses: Arc<SliceWriter<Vec<NpsResponse>>>,
    state: Arc<RwLock<NpsState>>,
    seq: Arc<FetchSequencer>,
}

impl NpsPage {
    pub fn new(session: Arc<Session>, responses: SliceWriter<Vec<NpsResponse>>) -> Self {
        Self {
            backend: session.backend(),
            responses: Arc::new(responses),
            state: Arc::new(RwLock::new(NpsState::default())),
            seq: Arc::new(FetchSequencer::new()),
        }
    }

    pub async fn refresh(&self) {
        let ticket = self.seq.ticket();
        let result = self.backend.list_nps_responses().await;
        let mut st = self.state.write().await;
        if !self.seq.try_apply(ticket) {
            return;
        }
        let list = st.banner.settle("loading feedback", result);
        self.responses.publish(list);
    }

    pub fn responses(&self, filter: &NpsFilter) -> Vec<NpsResponse> {
        self.responses
            .reader()
            .with(|all| all.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    pub fn summary(&self, filter: &NpsFilter) -> NpsSummary {
        let list = self.responses(filter);
        NpsSummary::from_responses(&list)
    }

    pub async fn banner(&self) -> ErrorBanner {
        self.state.read().await.banner.clone()
    }

    /// Flag a response as handled right away; restored if the server refuses.
    pub async fn mark_followed_up(&self, id: i64, notes: Option<&str>) -> ApiResult<()> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        let mut previous = None;
        self.responses.update(|list| {
            if let Some(r) = list.iter_mut().find(|r| r.id == id) {
                previous = Some(r.clone());
                r.followed_up = true;
                if let Some(n) = notes {
                    r.followup_notes = Some(n.to_string());
                }
            }
        });

        match self.backend.mark_nps_followed_up(id, notes).await {
            Ok(()) => {
                tracing::info!("✅ feedback {} followed up", id);
                Ok(())
            }
            Err(e) => {
                if let Some(before) = previous {
                    self.responses.update(|list| {
                        if let Some(r) = list.iter_mut().find(|r| r.id == id) {
                            *r = before;
                        }
                    });
                }
                self.state.write().await.banner.report("marking feedback followed up", &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response(id: i64, score: u8, day: Option<u32>) -> NpsResponse {
        NpsResponse {
            id,
            score,
            category: None,
            comment: None,
            followed_up: false,
            followup_notes: None,
            created_at: day.map(|d| Utc.with_ymd_and_hms(2026, 4, d, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn filter_by_category_and_range() {
        let list = [
            response(1, 10, Some(1)),
            response(2, 3, Some(5)),
            response(3, 2, Some(20)),
            response(4, 1, None),
        ];
        let f = NpsFilter {
            category: Some(NpsCategory::Detractor),
            from: Some(Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap()),
        };
        let ids: Vec<i64> = list.iter().filter(|r| f.matches(r)).map(|r| r.id).collect();
        assert_eq!(ids, vec![2]);

        let detractors = NpsFilter {
            category: Some(NpsCategory::Detractor),
            ..Default::default()
        };
        assert_eq!(list.iter().filter(|r| detractors.matches(r)).count(), 3);
        assert!(list.iter().all(|r| NpsFilter::default().matches(r)));
    }
}
