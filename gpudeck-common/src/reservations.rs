use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Active,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Active => "active",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub gpu_type: String,
    #[serde(default = "one")]
    pub gpu_count: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    #[serde(default)]
    pub credits_used: f64,
    /// Fraction, 0.15 = 15 % off.
    #[serde(default)]
    pub discount_rate: f64,
}

fn one() -> u32 {
    1
}

impl Reservation {
    /// Reserved wall-clock hours; inverted spans count as zero.
    pub fn hours(&self) -> f64 {
        let secs = (self.end_time - self.start_time).num_seconds();
        if secs <= 0 {
            0.0
        } else {
            secs as f64 / 3600.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub gpu_type: String,
    pub gpu_count: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Aggregates shown above the reservation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReservationStats {
    #[serde(default)]
    pub active_count: usize,
    #[serde(default)]
    pub pending_count: usize,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub average_discount: f64,
    #[serde(default)]
    pub total_credits: f64,
}

impl ReservationStats {
    /// Pure reduction over the fetched list.
    pub fn from_reservations(reservations: &[Reservation]) -> Self {
        let mut stats = ReservationStats::default();
        let mut discount_sum = 0.0;
        for r in reservations {
            match r.status {
                ReservationStatus::Active => stats.active_count += 1,
                ReservationStatus::Pending => stats.pending_count += 1,
                _ => {}
            }
            stats.total_hours += r.hours();
            stats.total_credits += r.credits_used;
            discount_sum += r.discount_rate;
        }
        if !reservations.is_empty() {
            stats.average_discount = discount_sum / reservations.len() as f64;
        }
        stats
    }
}
