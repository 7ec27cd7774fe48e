//! # CSV Rendering
//!
//! RFC-4180-style CSV output for the report endpoints. Fields containing a
//! comma, quote, or line break are wrapped in quotes with internal quotes
//! doubled; everything else is emitted bare. Rows end in `\r\n` so the
//! files open cleanly in the spreadsheet tools the finance desk uses.

use chrono::SecondsFormat;

use aurex_core::currency::format_amount;

use crate::revenue::{ExporterSummary, RevenueRecord};

/// Header row for the per-exporter revenue summary export.
pub const SUMMARY_HEADER: &str =
    "Exporter,Total_Revenue_USD,Job_Cards,Assays,Avg_Value_Per_Card,Market_Share_Percent,Last_Activity";

/// Header row for the comprehensive per-card export.
pub const DETAIL_HEADER: &str = "Reference,Exporter,Value_USD,Value_GHS,Assays,Created_At";

/// Row cap for comprehensive exports. Very large exporters are truncated
/// rather than streamed; the truncation is logged so the export is never
/// silently incomplete.
const MAX_DETAIL_ROWS: usize = 2000;

/// Escape one field per RFC 4180.
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join pre-escaped or numeric fields into one CSV row (no terminator).
fn csv_row(fields: &[String]) -> String {
    fields.join(",")
}

/// Render the per-exporter summary export.
pub fn render_revenue_summary_csv(summaries: &[ExporterSummary]) -> String {
    let mut out = String::new();
    out.push_str(SUMMARY_HEADER);
    out.push_str("\r\n");
    for s in summaries {
        let row = csv_row(&[
            csv_escape(&s.exporter),
            format_amount(s.revenue_usd),
            s.job_card_count.to_string(),
            s.assay_count.to_string(),
            format_amount(s.avg_job_card_value),
            format!("{:.2}", s.market_share_percent),
            s.last_activity
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
        ]);
        out.push_str(&row);
        out.push_str("\r\n");
    }
    out
}

/// Render the comprehensive per-card export, newest first.
///
/// Input beyond [`MAX_DETAIL_ROWS`] after sorting is dropped with a warning.
pub fn render_revenue_detail_csv(records: &[RevenueRecord]) -> String {
    let mut sorted: Vec<&RevenueRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if sorted.len() > MAX_DETAIL_ROWS {
        tracing::warn!(
            total = sorted.len(),
            cap = MAX_DETAIL_ROWS,
            "comprehensive export truncated to row cap — oldest rows dropped"
        );
        sorted.truncate(MAX_DETAIL_ROWS);
    }

    let mut out = String::new();
    out.push_str(DETAIL_HEADER);
    out.push_str("\r\n");
    for r in sorted {
        let row = csv_row(&[
            csv_escape(&r.reference),
            csv_escape(r.exporter_name.as_deref().unwrap_or("")),
            format_amount(r.usd_value),
            format_amount(r.ghs_value),
            r.assay_count.to_string(),
            r.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ]);
        out.push_str(&row);
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revenue::aggregate_by_exporter;
    use chrono::{TimeZone, Utc};

    /// Minimal RFC-4180 field parser for round-trip assertions.
    fn parse_csv_field(s: &str) -> String {
        if let Some(inner) = s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
            inner.replace("\"\"", "\"")
        } else {
            s.to_string()
        }
    }

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(csv_escape("Ashanti Gold"), "Ashanti Gold");
        assert_eq!(csv_escape(""), "");
    }

    #[test]
    fn comma_fields_are_quoted_and_roundtrip() {
        let original = "O'Brien, Gold Ltd";
        let escaped = csv_escape(original);
        assert_eq!(escaped, "\"O'Brien, Gold Ltd\"");
        assert_eq!(parse_csv_field(&escaped), original);
    }

    #[test]
    fn internal_quotes_are_doubled() {
        let original = "The \"Golden\" Co";
        let escaped = csv_escape(original);
        assert_eq!(escaped, "\"The \"\"Golden\"\" Co\"");
        assert_eq!(parse_csv_field(&escaped), original);
    }

    #[test]
    fn newline_fields_are_quoted() {
        let escaped = csv_escape("line1\nline2");
        assert!(escaped.starts_with('"') && escaped.ends_with('"'));
    }

    fn sample_record(exporter: &str, usd: f64, day: u32) -> RevenueRecord {
        RevenueRecord {
            reference: format!("JC-2026-{day:06}"),
            exporter_name: Some(exporter.to_string()),
            usd_value: usd,
            ghs_value: usd * 12.0,
            assay_count: 1,
            created_at: Utc.with_ymd_and_hms(2026, 8, day, 8, 30, 0).unwrap(),
        }
    }

    #[test]
    fn summary_csv_has_exact_header_and_amounts() {
        let summaries =
            aggregate_by_exporter(&[sample_record("Bonte Mining", 5915.73, 1)]);
        let csv = render_revenue_summary_csv(&summaries);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Exporter,Total_Revenue_USD,Job_Cards,Assays,Avg_Value_Per_Card,Market_Share_Percent,Last_Activity"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("Bonte Mining,5915.73,1,1,5915.73,100.00,"));
        assert!(row.ends_with("Z"));
    }

    #[test]
    fn detail_csv_sorted_newest_first() {
        let records = vec![
            sample_record("A", 1.0, 2),
            sample_record("A", 2.0, 9),
            sample_record("A", 3.0, 5),
        ];
        let csv = render_revenue_detail_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], DETAIL_HEADER);
        assert!(lines[1].starts_with("JC-2026-000009"));
        assert!(lines[2].starts_with("JC-2026-000005"));
        assert!(lines[3].starts_with("JC-2026-000002"));
    }

    #[test]
    fn detail_csv_escapes_exporter_names() {
        let mut record = sample_record("A", 1.0, 1);
        record.exporter_name = Some("O'Brien, Gold Ltd".to_string());
        let csv = render_revenue_detail_csv(&[record]);
        assert!(csv.contains("\"O'Brien, Gold Ltd\""));
    }

    #[test]
    fn rows_use_crlf_terminators() {
        let csv = render_revenue_summary_csv(&[]);
        assert!(csv.ends_with("\r\n"));
    }
}
