//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Aurex API — Precious-Metals Export Back Office",
        version = "0.2.7",
        description = "Job card intake, assay capture, valuation, statutory levy invoicing, daily pricing, and the regulator's reporting console.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Exporters
        crate::routes::exporters::create_exporter,
        crate::routes::exporters::list_exporters,
        crate::routes::exporters::get_exporter,
        crate::routes::exporters::update_exporter,
        // Job cards
        crate::routes::job_cards::create_job_card,
        crate::routes::job_cards::list_job_cards,
        crate::routes::job_cards::get_job_card,
        crate::routes::job_cards::update_job_card,
        crate::routes::job_cards::delete_job_card,
        // Assays
        crate::routes::assays::create_assay,
        crate::routes::assays::list_assays,
        crate::routes::assays::get_assay,
        crate::routes::assays::append_measurements,
        // Invoices
        crate::routes::invoices::create_invoice,
        crate::routes::invoices::list_invoices,
        crate::routes::invoices::get_invoice,
        crate::routes::invoices::pay_invoice,
        crate::routes::invoices::print_invoice,
        // Prices
        crate::routes::prices::create_daily_price,
        crate::routes::prices::latest_daily_price,
        // Reports
        crate::routes::reports::dashboard_summary,
        crate::routes::reports::revenue_csv,
        crate::routes::reports::revenue_print,
    ),
    components(schemas(
        // State record types
        crate::state::ExporterRecord,
        crate::state::JobCardRecord,
        crate::state::AssayRecord,
        crate::state::InvoiceRecord,
        crate::state::DailyPriceRecord,
        // Request types
        crate::routes::exporters::CreateExporterRequest,
        crate::routes::exporters::UpdateExporterRequest,
        crate::routes::job_cards::CreateJobCardRequest,
        crate::routes::job_cards::UpdateJobCardRequest,
        crate::routes::assays::CreateAssayRequest,
        crate::routes::assays::MeasurementInput,
        crate::routes::assays::PricingInput,
        crate::routes::assays::AppendMeasurementsRequest,
        crate::routes::invoices::CreateInvoiceRequest,
        crate::routes::prices::CreateDailyPriceRequest,
        // Response types
        crate::routes::reports::DashboardSummary,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::auth::Role,
    )),
    tags(
        (name = "exporters", description = "Exporter registry"),
        (name = "job-cards", description = "Shipment intake records"),
        (name = "assays", description = "Laboratory measurement capture"),
        (name = "invoices", description = "Levy assessment and settlement"),
        (name = "prices", description = "Daily commodity price feed"),
        (name = "reports", description = "Regulator console and exports"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

/// GET /openapi.json — The assembled spec.
async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_assembles_and_includes_core_paths() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).unwrap();
        let paths = json["paths"].as_object().unwrap();
        for path in [
            "/v1/exporters",
            "/v1/job-cards",
            "/v1/job-cards/{id}/assays",
            "/v1/invoices/{id}/pay",
            "/v1/prices/latest",
            "/v1/reports/revenue",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn spec_includes_record_schemas() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).unwrap();
        let schemas = json["components"]["schemas"].as_object().unwrap();
        for schema in [
            "ExporterRecord",
            "JobCardRecord",
            "AssayRecord",
            "InvoiceRecord",
            "DailyPriceRecord",
        ] {
            assert!(schemas.contains_key(schema), "missing schema: {schema}");
        }
    }
}
