//! # Reporting Console API
//!
//! Read-only aggregation endpoints for the regulator's dashboard and
//! exports. All heavy lifting happens in `aurex-reporting`; these
//! handlers flatten job cards into revenue records, pass the current
//! time into the period filter, and choose an output encoding.
//!
//! Reports are officer-and-above: exporter agents get their figures from
//! their own job card listings, not from the cross-exporter console.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use aurex_reporting::revenue::{
    aggregate_by_exporter, filter_by_period, ReportMode, ReportPeriod, RevenueRecord,
};
use aurex_reporting::{
    csv::{render_revenue_detail_csv, render_revenue_summary_csv},
    html::render_revenue_document,
};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::state::AppState;

/// Dashboard summary for the regulator console.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_exporters: usize,
    pub total_job_cards: usize,
    pub total_assays: usize,
    pub total_invoices: usize,
    /// Summed USD value across all job cards.
    pub total_usd_value: f64,
    /// Summed GHS value across all job cards.
    pub total_ghs_value: f64,
    /// Per-exporter revenue summaries, alphabetical.
    #[schema(value_type = Vec<Object>)]
    pub exporters: Vec<aurex_reporting::revenue::ExporterSummary>,
}

/// Query parameters for the revenue report.
#[derive(Debug, Deserialize, Default)]
pub struct RevenueReportParams {
    /// "daily", "weekly" (default "monthly").
    pub period: Option<String>,
    /// "summary" (default) or "comprehensive".
    pub mode: Option<String>,
}

/// Build the reports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/reports/summary", get(dashboard_summary))
        .route("/v1/reports/revenue", get(revenue_csv))
        .route("/v1/reports/revenue/print", get(revenue_print))
}

/// Flatten the job card store into reporting records.
fn revenue_records(state: &AppState) -> Vec<RevenueRecord> {
    state
        .job_cards
        .list()
        .into_iter()
        .map(|card| RevenueRecord {
            reference: card.reference.as_str().to_string(),
            exporter_name: if card.exporter_name.trim().is_empty() {
                None
            } else {
                Some(card.exporter_name.clone())
            },
            usd_value: card.total_usd_value,
            ghs_value: card.total_ghs_value,
            assay_count: card.assay_count,
            created_at: card.created_at,
        })
        .collect()
}

fn parse_report_params(
    params: &RevenueReportParams,
) -> Result<(ReportPeriod, ReportMode), AppError> {
    let period = match params.period.as_deref() {
        Some(p) => ReportPeriod::parse(p)?,
        None => ReportPeriod::Monthly,
    };
    let mode = match params.mode.as_deref() {
        Some(m) => ReportMode::parse(m)?,
        None => ReportMode::Summary,
    };
    Ok((period, mode))
}

/// GET /v1/reports/summary — Dashboard totals and per-exporter figures.
#[utoipa::path(
    get,
    path = "/v1/reports/summary",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 403, description = "Officer role required"),
    ),
    tag = "reports"
)]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<DashboardSummary>, AppError> {
    require_role(&caller, Role::Officer)?;

    let records = revenue_records(&state);
    let total_usd_value = records.iter().map(|r| r.usd_value).sum();
    let total_ghs_value = records.iter().map(|r| r.ghs_value).sum();
    let exporters = aggregate_by_exporter(&records);

    Ok(Json(DashboardSummary {
        total_exporters: state.exporters.len(),
        total_job_cards: state.job_cards.len(),
        total_assays: state.assays.len(),
        total_invoices: state.invoices.len(),
        total_usd_value,
        total_ghs_value,
        exporters,
    }))
}

/// GET /v1/reports/revenue — Revenue report as a CSV attachment.
#[utoipa::path(
    get,
    path = "/v1/reports/revenue",
    params(
        ("period" = Option<String>, Query, description = "daily | weekly | monthly"),
        ("mode" = Option<String>, Query, description = "summary | comprehensive"),
    ),
    responses(
        (status = 200, description = "CSV export", body = String, content_type = "text/csv"),
        (status = 403, description = "Officer role required"),
    ),
    tag = "reports"
)]
pub async fn revenue_csv(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<RevenueReportParams>,
) -> Result<Response, AppError> {
    require_role(&caller, Role::Officer)?;
    let (period, mode) = parse_report_params(&params)?;

    let records = filter_by_period(&revenue_records(&state), period, Utc::now());
    let csv = match mode {
        ReportMode::Summary => render_revenue_summary_csv(&aggregate_by_exporter(&records)),
        ReportMode::Comprehensive => render_revenue_detail_csv(&records),
    };

    let filename = format!("revenue-{}-{}.csv", period.as_str(), mode.as_str());
    tracing::info!(period = period.as_str(), mode = mode.as_str(), rows = records.len(), "revenue CSV exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

/// GET /v1/reports/revenue/print — Revenue report as a printable A4 document.
#[utoipa::path(
    get,
    path = "/v1/reports/revenue/print",
    params(
        ("period" = Option<String>, Query, description = "daily | weekly | monthly"),
    ),
    responses(
        (status = 200, description = "Printable report", body = String, content_type = "text/html"),
        (status = 403, description = "Officer role required"),
    ),
    tag = "reports"
)]
pub async fn revenue_print(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<RevenueReportParams>,
) -> Result<Html<String>, AppError> {
    require_role(&caller, Role::Officer)?;
    let (period, _) = parse_report_params(&params)?;

    let records = filter_by_period(&revenue_records(&state), period, Utc::now());
    let summaries = aggregate_by_exporter(&records);
    let title = format!(
        "Revenue Report — {}",
        match period {
            ReportPeriod::Daily => "Last Day",
            ReportPeriod::Weekly => "Last 7 Days",
            ReportPeriod::Monthly => "Last 30 Days",
        }
    );

    Ok(Html(render_revenue_document(&title, &summaries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::state::{ExporterRecord, JobCardRecord};
    use aurex_core::{ExporterCode, ExporterType, WeightUnit};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn officer() -> CallerIdentity {
        CallerIdentity {
            role: Role::Officer,
            exporter_id: None,
        }
    }

    fn test_app(state: AppState, caller: CallerIdentity) -> Router {
        router().with_state(state).layer(axum::Extension(caller))
    }

    fn seed_card(state: &AppState, exporter_name: &str, code: &str, usd: f64, assays: usize) {
        let now = Utc::now();
        let exporter = ExporterRecord {
            id: Uuid::new_v4(),
            name: exporter_name.to_string(),
            code: ExporterCode::new(code).unwrap(),
            exporter_type: ExporterType::Gold,
            authorized_signatory: "S".to_string(),
            created_at: now,
            updated_at: now,
        };
        state.exporters.insert(exporter.id, exporter.clone());

        let card = JobCardRecord {
            id: Uuid::new_v4(),
            reference: state.next_job_card_reference(),
            exporter_id: exporter.id,
            exporter_name: exporter.name,
            received_date: now,
            unit_of_measure: WeightUnit::Grams,
            status: aurex_core::JobCardStatus::InProgress,
            total_net_gold_oz: 0.0,
            total_net_silver_oz: 0.0,
            total_usd_value: usd,
            total_ghs_value: usd * 12.0,
            assay_count: assays,
            created_at: now,
            updated_at: now,
        };
        state.job_cards.insert(card.id, card);
    }

    #[tokio::test]
    async fn summary_reports_totals_and_buckets() {
        let state = AppState::new();
        seed_card(&state, "Ashanti Gold Ltd", "AGL-01", 1000.0, 1);
        seed_card(&state, "Bonte Mining", "BNT-02", 500.0, 2);
        let app = test_app(state, officer());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/reports/summary")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let summary: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(summary["total_job_cards"], 2);
        assert_eq!(summary["total_exporters"], 2);
        assert!((summary["total_usd_value"].as_f64().unwrap() - 1500.0).abs() < 1e-9);
        let exporters = summary["exporters"].as_array().unwrap();
        assert_eq!(exporters.len(), 2);
        // Alphabetical: Ashanti first.
        assert_eq!(exporters[0]["exporter"], "Ashanti Gold Ltd");
        let share_sum: f64 = exporters
            .iter()
            .map(|e| e["market_share_percent"].as_f64().unwrap())
            .sum();
        assert!((share_sum - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn revenue_csv_is_an_attachment_with_header_row() {
        let state = AppState::new();
        seed_card(&state, "O'Brien, Gold Ltd", "OBR-01", 250.0, 1);
        let app = test_app(state, officer());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/reports/revenue?period=weekly&mode=summary")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/csv"));
        let disposition = response
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("revenue-weekly-summary.csv"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(csv.starts_with(
            "Exporter,Total_Revenue_USD,Job_Cards,Assays,Avg_Value_Per_Card,Market_Share_Percent,Last_Activity"
        ));
        // Comma-bearing exporter name survives quoting.
        assert!(csv.contains("\"O'Brien, Gold Ltd\""));
    }

    #[tokio::test]
    async fn comprehensive_mode_emits_detail_rows() {
        let state = AppState::new();
        seed_card(&state, "Ashanti Gold Ltd", "AGL-01", 100.0, 1);
        let app = test_app(state, officer());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/reports/revenue?period=monthly&mode=comprehensive")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(csv.starts_with("Reference,Exporter,Value_USD,Value_GHS,Assays,Created_At"));
        assert!(csv.contains("JC-"));
    }

    #[tokio::test]
    async fn unknown_period_flag_rejected() {
        let app = test_app(AppState::new(), officer());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/reports/revenue?period=yearly")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn exporter_agent_cannot_read_reports() {
        let agent = CallerIdentity {
            role: Role::ExporterAgent,
            exporter_id: Some(Uuid::new_v4()),
        };
        let app = test_app(AppState::new(), agent);
        for uri in [
            "/v1/reports/summary",
            "/v1/reports/revenue",
            "/v1/reports/revenue/print",
        ] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri: {uri}");
        }
    }

    #[tokio::test]
    async fn print_returns_html_table() {
        let state = AppState::new();
        seed_card(&state, "Ashanti Gold Ltd", "AGL-01", 1000.0, 1);
        let app = test_app(state, officer());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/reports/revenue/print?period=weekly")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Last 7 Days"));
        assert!(html.contains("Ashanti Gold Ltd"));
        assert!(html.contains("size: A4"));
    }
}
