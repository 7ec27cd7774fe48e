//! # Revenue Aggregation
//!
//! Per-exporter grouping of valued job cards, plus the daily/weekly/monthly
//! period filter behind the report endpoints.
//!
//! Aggregation is keyed through a `BTreeMap` so output ordering is
//! deterministic (alphabetical by exporter), which keeps CSV exports
//! diffable between runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use aurex_core::error::ValidationError;

/// Bucket name for records with no exporter attached.
pub const UNKNOWN_EXPORTER: &str = "Unknown";

/// One valued job card, flattened for reporting.
///
/// Assembled by the API layer from the job-card store; the aggregator
/// itself knows nothing about persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    /// Human-readable job card reference.
    pub reference: String,
    /// Exporter name, if the card has one attached.
    pub exporter_name: Option<String>,
    /// Total USD value of the card's assays.
    pub usd_value: f64,
    /// Total GHS value of the card's assays.
    pub ghs_value: f64,
    /// Number of assays recorded against the card.
    pub assay_count: usize,
    /// When the card was created.
    pub created_at: DateTime<Utc>,
}

/// Aggregated revenue figures for one exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterSummary {
    /// Exporter name (or [`UNKNOWN_EXPORTER`]).
    pub exporter: String,
    /// Summed USD revenue across the exporter's job cards.
    pub revenue_usd: f64,
    /// Number of job cards.
    pub job_card_count: usize,
    /// Number of assays across those cards.
    pub assay_count: usize,
    /// `revenue_usd / job_card_count`, 0 when there are no cards.
    pub avg_job_card_value: f64,
    /// Exporter's share of total revenue across all buckets, 0-100.
    pub market_share_percent: f64,
    /// Most recent job card creation time in the bucket.
    pub last_activity: Option<DateTime<Utc>>,
}

/// Reporting window selected by the `period` query flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    /// Last 1 day.
    Daily,
    /// Last 7 days.
    Weekly,
    /// Last 30 days.
    Monthly,
}

impl ReportPeriod {
    /// Window length in days.
    pub fn days(&self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    /// Parse a period flag, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(ValidationError::InvalidStatus {
                field: "period",
                value: other.to_string(),
                expected: "daily, weekly, monthly",
            }),
        }
    }

    /// Return the string representation of this period.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Report shape selected by the `mode` query flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Grouped per-exporter totals.
    Summary,
    /// Per-record detail rows, newest first.
    Comprehensive,
}

impl ReportMode {
    /// Parse a mode flag, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "summary" => Ok(Self::Summary),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(ValidationError::InvalidStatus {
                field: "mode",
                value: other.to_string(),
                expected: "summary, comprehensive",
            }),
        }
    }

    /// Return the string representation of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Comprehensive => "comprehensive",
        }
    }
}

/// Keep only records created within the period window ending at `now`.
pub fn filter_by_period(
    records: &[RevenueRecord],
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> Vec<RevenueRecord> {
    let cutoff = now - Duration::days(period.days());
    records
        .iter()
        .filter(|r| r.created_at >= cutoff)
        .cloned()
        .collect()
}

/// Group records by exporter and sum valuation outputs.
///
/// Records without an exporter bucket under [`UNKNOWN_EXPORTER`]. Division
/// guards: an empty bucket averages to 0 and a zero-revenue population
/// yields 0% shares, never NaN.
pub fn aggregate_by_exporter(records: &[RevenueRecord]) -> Vec<ExporterSummary> {
    struct Bucket {
        revenue_usd: f64,
        job_card_count: usize,
        assay_count: usize,
        last_activity: Option<DateTime<Utc>>,
    }

    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    for record in records {
        let name = record
            .exporter_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_EXPORTER)
            .to_string();
        let bucket = buckets.entry(name).or_insert(Bucket {
            revenue_usd: 0.0,
            job_card_count: 0,
            assay_count: 0,
            last_activity: None,
        });
        bucket.revenue_usd += record.usd_value;
        bucket.job_card_count += 1;
        bucket.assay_count += record.assay_count;
        bucket.last_activity = match bucket.last_activity {
            Some(prev) if prev >= record.created_at => Some(prev),
            _ => Some(record.created_at),
        };
    }

    let total_revenue: f64 = buckets.values().map(|b| b.revenue_usd).sum();

    buckets
        .into_iter()
        .map(|(exporter, bucket)| {
            let avg_job_card_value = if bucket.job_card_count == 0 {
                0.0
            } else {
                bucket.revenue_usd / bucket.job_card_count as f64
            };
            let market_share_percent = if total_revenue == 0.0 {
                0.0
            } else {
                bucket.revenue_usd / total_revenue * 100.0
            };
            ExporterSummary {
                exporter,
                revenue_usd: bucket.revenue_usd,
                job_card_count: bucket.job_card_count,
                assay_count: bucket.assay_count,
                avg_job_card_value,
                market_share_percent,
                last_activity: bucket.last_activity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(exporter: Option<&str>, usd: f64, assays: usize, day: u32) -> RevenueRecord {
        RevenueRecord {
            reference: format!("JC-2026-{day:06}"),
            exporter_name: exporter.map(String::from),
            usd_value: usd,
            ghs_value: usd * 12.0,
            assay_count: assays,
            created_at: Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn sums_revenue_per_exporter_exactly() {
        let records = vec![
            record(Some("Ashanti Gold Ltd"), 1000.0, 1, 1),
            record(Some("Ashanti Gold Ltd"), 500.0, 2, 2),
            record(Some("Bonte Mining"), 250.0, 1, 3),
        ];
        let summaries = aggregate_by_exporter(&records);
        assert_eq!(summaries.len(), 2);

        let ashanti = &summaries[0];
        assert_eq!(ashanti.exporter, "Ashanti Gold Ltd");
        assert!((ashanti.revenue_usd - 1500.0).abs() < 1e-9);
        assert_eq!(ashanti.job_card_count, 2);
        assert_eq!(ashanti.assay_count, 3);
        assert!((ashanti.avg_job_card_value - 750.0).abs() < 1e-9);

        let per_exporter_total: f64 = summaries.iter().map(|s| s.revenue_usd).sum();
        assert!((per_exporter_total - 1750.0).abs() < 1e-9);
    }

    #[test]
    fn market_shares_sum_to_hundred() {
        let records = vec![
            record(Some("A"), 600.0, 1, 1),
            record(Some("B"), 300.0, 1, 1),
            record(Some("C"), 100.0, 1, 1),
        ];
        let summaries = aggregate_by_exporter(&records);
        let share_sum: f64 = summaries.iter().map(|s| s.market_share_percent).sum();
        assert!((share_sum - 100.0).abs() < 1e-9);
        assert!((summaries[0].market_share_percent - 60.0).abs() < 1e-9);
    }

    #[test]
    fn missing_exporter_buckets_under_unknown() {
        let records = vec![record(None, 100.0, 1, 1), record(Some("  "), 50.0, 0, 2)];
        let summaries = aggregate_by_exporter(&records);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].exporter, UNKNOWN_EXPORTER);
        assert!((summaries[0].revenue_usd - 150.0).abs() < 1e-9);
    }

    #[test]
    fn zero_revenue_population_has_zero_shares_not_nan() {
        let records = vec![record(Some("A"), 0.0, 0, 1)];
        let summaries = aggregate_by_exporter(&records);
        assert_eq!(summaries[0].market_share_percent, 0.0);
        assert_eq!(summaries[0].avg_job_card_value, 0.0);
        assert!(summaries[0].market_share_percent.is_finite());
    }

    #[test]
    fn empty_input_aggregates_to_empty_output() {
        assert!(aggregate_by_exporter(&[]).is_empty());
    }

    #[test]
    fn last_activity_is_the_newest_card() {
        let records = vec![
            record(Some("A"), 10.0, 1, 3),
            record(Some("A"), 10.0, 1, 9),
            record(Some("A"), 10.0, 1, 5),
        ];
        let summaries = aggregate_by_exporter(&records);
        assert_eq!(
            summaries[0].last_activity,
            Some(Utc.with_ymd_and_hms(2026, 8, 9, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn period_filter_keeps_only_window() {
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 0, 0, 0).unwrap();
        let records = vec![
            record(Some("A"), 1.0, 1, 9),  // 1 day old
            record(Some("A"), 1.0, 1, 5),  // 5 days old
            record(Some("A"), 1.0, 1, 1),  // 9 days old
        ];

        assert_eq!(filter_by_period(&records, ReportPeriod::Daily, now).len(), 1);
        assert_eq!(filter_by_period(&records, ReportPeriod::Weekly, now).len(), 2);
        assert_eq!(filter_by_period(&records, ReportPeriod::Monthly, now).len(), 3);
    }

    #[test]
    fn period_and_mode_parse() {
        assert_eq!(ReportPeriod::parse("weekly").unwrap(), ReportPeriod::Weekly);
        assert_eq!(ReportPeriod::Daily.days(), 1);
        assert!(ReportPeriod::parse("yearly").is_err());
        assert_eq!(
            ReportMode::parse("comprehensive").unwrap(),
            ReportMode::Comprehensive
        );
        assert!(ReportMode::parse("detailed").is_err());
    }
}
