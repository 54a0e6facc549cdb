use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpsCategory {
    Promoter,
    Passive,
    Detractor,
}

impl NpsCategory {
    /// 9-10 promoter, 7-8 passive, 0-6 detractor.
    pub fn from_score(score: u8) -> Self {
        match score {
            9..=u8::MAX => NpsCategory::Promoter,
            7 | 8 => NpsCategory::Passive,
            _ => NpsCategory::Detractor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NpsCategory::Promoter => "promoter",
            NpsCategory::Passive => "passive",
            NpsCategory::Detractor => "detractor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpsResponse {
    pub id: i64,
    pub score: u8,
    #[serde(default)]
    pub category: Option<NpsCategory>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub followed_up: bool,
    #[serde(default)]
    pub followup_notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NpsResponse {
    /// Backend category when present, otherwise derived from the score.
    pub fn category(&self) -> NpsCategory {
        self.category
            .unwrap_or_else(|| NpsCategory::from_score(self.score))
    }

    pub fn needs_follow_up(&self) -> bool {
        !self.followed_up && self.category() == NpsCategory::Detractor
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Net Promoter Score in [-100, 100].
///
/// `total == 0` yields 0. Rounding is half-up (`-12.5` becomes `-12`).
pub fn nps_score(promoters: u64, passives: u64, detractors: u64) -> i32 {
    let total = promoters + passives + detractors;
    if total == 0 {
        return 0;
    }
    let raw = 100.0 * (promoters as f64 - detractors as f64) / total as f64;
    ((raw + 0.5).floor() as i32).clamp(-100, 100)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NpsSummary {
    pub total: u64,
    pub promoters: u64,
    pub passives: u64,
    pub detractors: u64,
    pub score: i32,
    pub pending_follow_ups: u64,
}

impl NpsSummary {
    pub fn from_responses<'a>(responses: impl IntoIterator<Item = &'a NpsResponse>) -> Self {
        let mut s = NpsSummary::default();
        for r in responses {
            s.total += 1;
            match r.category() {
                NpsCategory::Promoter => s.promoters += 1,
                NpsCategory::Passive => s.passives += 1,
                NpsCategory::Detractor => s.detractors += 1,
            }
            if r.needs_follow_up() {
                s.pending_follow_ups += 1;
            }
        }
        s.score = nps_score(s.promoters, s.passives, s.detractors);
        s
    }
}
