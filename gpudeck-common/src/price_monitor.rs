use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gpu_filter::gpu_name_matches;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PriceMonitorStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gpus_monitored: Vec<String>,
    #[serde(default)]
    pub interval_minutes: Option<u32>,
}

/// Current market snapshot for one GPU model ($/h).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuPriceSummary {
    pub gpu_name: String,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub max_price: f64,
    #[serde(default)]
    pub total_offers: u32,
    #[serde(default)]
    pub available_gpus: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub gpu_name: String,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub max_price: f64,
    #[serde(default)]
    pub total_offers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: i64,
    pub gpu_name: String,
    #[serde(default)]
    pub alert_type: String,
    #[serde(default)]
    pub old_value: f64,
    #[serde(default)]
    pub new_value: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Inclusive $/h band; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceBand {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceBand {
    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |m| price >= m) && self.max.map_or(true, |m| price <= m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceSort {
    #[default]
    AvgPriceAsc,
    AvgPriceDesc,
    OffersDesc,
    Name,
}

impl PriceSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" | "price_asc" => Some(PriceSort::AvgPriceAsc),
            "price_desc" => Some(PriceSort::AvgPriceDesc),
            "offers" => Some(PriceSort::OffersDesc),
            "name" => Some(PriceSort::Name),
            _ => None,
        }
    }
}

/// In-memory filter + sort over the fetched summary.
pub fn filter_summaries(
    summaries: &[GpuPriceSummary],
    patterns: &[String],
    band: PriceBand,
    sort: PriceSort,
) -> Vec<GpuPriceSummary> {
    let mut out: Vec<GpuPriceSummary> = summaries
        .iter()
        .filter(|s| gpu_name_matches(&s.gpu_name, patterns) && band.contains(s.avg_price))
        .cloned()
        .collect();
    match sort {
        PriceSort::AvgPriceAsc => out.sort_by(|a, b| a.avg_price.total_cmp(&b.avg_price)),
        PriceSort::AvgPriceDesc => out.sort_by(|a, b| b.avg_price.total_cmp(&a.avg_price)),
        PriceSort::OffersDesc => out.sort_by(|a, b| b.total_offers.cmp(&a.total_offers)),
        PriceSort::Name => out.sort_by(|a, b| a.gpu_name.cmp(&b.gpu_name)),
    }
    out
}

/// Start of a window reaching `hours` back from `now`. Windows older than
/// chrono can represent start at the earliest representable instant.
pub fn window_start(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    TimeDelta::try_hours(hours.max(0))
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// History points within the last `hours` of `now`, oldest first.
pub fn history_window(
    history: &[PricePoint],
    patterns: &[String],
    now: DateTime<Utc>,
    hours: i64,
) -> Vec<PricePoint> {
    let since = window_start(now, hours);
    let mut out: Vec<PricePoint> = history
        .iter()
        .filter(|p| p.timestamp >= since && p.timestamp <= now)
        .filter(|p| gpu_name_matches(&p.gpu_name, patterns))
        .cloned()
        .collect();
    out.sort_by_key(|p| p.timestamp);
    out
}

/// Relative change of the average price across a window, in percent.
///
/// Only defined for a single GPU model; a mixed window yields `None`.
pub fn trend_percent(points: &[PricePoint]) -> Option<f64> {
    let first = points.first()?;
    if points.iter().any(|p| p.gpu_name != first.gpu_name) {
        return None;
    }
    change_percent(first, points.last()?)
}

/// Per-model trend over a window sorted oldest first.
pub fn trends_by_gpu(points: &[PricePoint]) -> BTreeMap<String, f64> {
    let mut ends: BTreeMap<&str, (&PricePoint, &PricePoint)> = BTreeMap::new();
    for p in points {
        ends.entry(p.gpu_name.as_str())
            .and_modify(|(_, last)| *last = p)
            .or_insert((p, p));
    }
    ends.into_iter()
        .filter_map(|(name, (first, last))| Some((name.to_string(), change_percent(first, last)?)))
        .collect()
}

fn change_percent(first: &PricePoint, last: &PricePoint) -> Option<f64> {
    if first.avg_price <= 0.0 {
        return None;
    }
    Some((last.avg_price - first.avg_price) / first.avg_price * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_filter::parse_gpu_patterns;
    use chrono::TimeZone;

    fn summary(name: &str, avg: f64, offers: u32) -> GpuPriceSummary {
        GpuPriceSummary {
            gpu_name: name.into(),
            avg_price: avg,
            min_price: avg * 0.8,
            max_price: avg * 1.2,
            total_offers: offers,
            available_gpus: offers * 2,
        }
    }

    #[test]
    fn filter_applies_pattern_band_and_sort() {
        let list = vec![
            summary("RTX 4090", 0.45, 120),
            summary("A100 PCIE", 1.40, 30),
            summary("H100 SXM", 2.60, 12),
            summary("RTX 3090", 0.22, 300),
        ];
        let out = filter_summaries(
            &list,
            &parse_gpu_patterns(Some("RTX*")),
            PriceBand {
                min: Some(0.3),
                max: None,
            },
            PriceSort::AvgPriceAsc,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].gpu_name, "RTX 4090");

        let by_offers = filter_summaries(&list, &[], PriceBand::default(), PriceSort::OffersDesc);
        assert_eq!(by_offers[0].gpu_name, "RTX 3090");
        assert_eq!(by_offers.len(), 4);
    }

    #[test]
    fn history_window_drops_old_points_and_sorts() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        let point = |h: i64, price: f64| PricePoint {
            timestamp: now - chrono::Duration::hours(h),
            gpu_name: "A100".into(),
            avg_price: price,
            min_price: price,
            max_price: price,
            total_offers: 1,
        };
        let history = vec![point(1, 1.1), point(30, 0.9), point(5, 1.0)];
        let w = history_window(&history, &[], now, 24);
        assert_eq!(w.len(), 2);
        assert!(w[0].timestamp < w[1].timestamp);
        let t = trend_percent(&w).unwrap();
        assert!((t - 10.0).abs() < 1e-9);
    }

    #[test]
    fn trend_needs_positive_base() {
        assert_eq!(trend_percent(&[]), None);
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(window_start(now, i64::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(now, -5), now);
        let old = PricePoint {
            timestamp: Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
            gpu_name: "A100".into(),
            avg_price: 1.0,
            min_price: 1.0,
            max_price: 1.0,
            total_offers: 1,
        };
        let w = history_window(&[old], &[], now, i64::from(u32::MAX));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn trend_is_per_gpu_model() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        let point = |h: i64, name: &str, price: f64| PricePoint {
            timestamp: now - chrono::Duration::hours(h),
            gpu_name: name.into(),
            avg_price: price,
            min_price: price,
            max_price: price,
            total_offers: 1,
        };
        let mixed = vec![
            point(4, "RTX 4090", 0.40),
            point(3, "H100 SXM", 2.00),
            point(2, "RTX 4090", 0.44),
            point(1, "H100 SXM", 1.80),
        ];
        assert_eq!(trend_percent(&mixed), None);
        let trends = trends_by_gpu(&mixed);
        assert_eq!(trends.len(), 2);
        assert!((trends["RTX 4090"] - 10.0).abs() < 1e-9);
        assert!((trends["H100 SXM"] + 10.0).abs() < 1e-9);
    }
}
