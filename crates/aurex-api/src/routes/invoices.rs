//! # Invoicing API
//!
//! Issues invoices against valued job cards, applying the statutory levy
//! chain to the card's GHS assay value. Paying an invoice is a one-way
//! transition that also moves the job card to `paid` and freezes it.
//!
//! `GET /v1/invoices/:id/print` returns the invoice as a self-contained
//! A4 HTML document; clients print it to PDF.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use aurex_core::{Currency, InvoiceStatus, JobCardStatus};
use aurex_reporting::html::{render_invoice_document, InvoiceDocument};
use aurex_valuation::levy;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, InvoiceRecord};

/// Request to issue an invoice for a job card.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    /// The valued job card to bill.
    pub job_card_id: Uuid,
    /// The regulator's rate, percentage of assay value.
    pub rate_percent: f64,
    /// Billing currency. Defaults to GHS.
    pub currency: Option<String>,
}

impl Validate for CreateInvoiceRequest {
    fn validate(&self) -> Result<(), String> {
        if !self.rate_percent.is_finite() || !(0.0..=100.0).contains(&self.rate_percent) {
            return Err("rate_percent must be between 0 and 100".to_string());
        }
        if let Some(ref currency) = self.currency {
            Currency::parse(currency).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Query parameters for listing invoices.
#[derive(Debug, Deserialize, Default)]
pub struct InvoiceQueryParams {
    /// Filter by job card.
    pub job_card_id: Option<Uuid>,
    /// Filter by status string ("pending" or "paid").
    pub status: Option<String>,
}

/// Build the invoices router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/invoices", get(list_invoices).post(create_invoice))
        .route("/v1/invoices/:id", get(get_invoice))
        .route("/v1/invoices/:id/pay", post(pay_invoice))
        .route("/v1/invoices/:id/print", get(print_invoice))
}

/// POST /v1/invoices — Issue an invoice for a valued job card.
#[utoipa::path(
    post,
    path = "/v1/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice issued", body = InvoiceRecord),
        (status = 404, description = "Job card not found"),
        (status = 409, description = "Job card has no assay"),
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<Json<InvoiceRecord>, AppError> {
    require_role(&caller, Role::Officer)?;
    let req = extract_validated_json(body)?;

    let card = state
        .job_cards
        .get(&req.job_card_id)
        .ok_or_else(|| AppError::NotFound(format!("job card {} not found", req.job_card_id)))?;

    if card.assay_count == 0 {
        return Err(AppError::Conflict(format!(
            "job card {} has no assay — value it before invoicing",
            card.reference
        )));
    }
    if matches!(card.status, JobCardStatus::Paid | JobCardStatus::Rejected) {
        return Err(AppError::Conflict(format!(
            "job card {} is {} and cannot be invoiced",
            card.reference, card.status
        )));
    }

    let currency = match &req.currency {
        Some(code) => Currency::parse(code)?,
        None => Currency::Ghs,
    };

    let levies = levy::assess(card.total_ghs_value, req.rate_percent);

    let now = Utc::now();
    let record = InvoiceRecord {
        id: Uuid::new_v4(),
        invoice_number: state.next_invoice_number(),
        job_card_id: card.id,
        currency,
        assay_value_usd: card.total_usd_value,
        assay_value_ghs: card.total_ghs_value,
        levies,
        status: InvoiceStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    state.invoices.insert(record.id, record.clone());

    // Issuing the invoice completes the valuation phase.
    let updated_card = if card.status == JobCardStatus::InProgress {
        state
            .job_cards
            .update(&card.id, |c| {
                c.status = JobCardStatus::Completed;
                c.updated_at = Utc::now();
            })
            .unwrap_or(card)
    } else {
        card
    };

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::invoices::insert(pool, &record).await {
            tracing::error!(invoice = %record.invoice_number, error = %e, "failed to persist invoice");
            return Err(AppError::Internal(
                "invoice recorded in-memory but database persist failed".to_string(),
            ));
        }
        if let Err(e) = crate::db::job_cards::update(pool, &updated_card).await {
            tracing::error!(job_card = %updated_card.reference, error = %e, "failed to persist job card status");
            return Err(AppError::Internal(
                "invoice persisted but job card status update failed".to_string(),
            ));
        }
    }

    tracing::info!(
        invoice = %record.invoice_number,
        job_card = %updated_card.reference,
        grand_total = record.levies.grand_total,
        "invoice issued"
    );
    Ok(Json(record))
}

/// GET /v1/invoices — List invoices with optional filtering.
#[utoipa::path(
    get,
    path = "/v1/invoices",
    responses(
        (status = 200, description = "Matching invoices", body = Vec<InvoiceRecord>),
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<InvoiceQueryParams>,
) -> Result<Json<Vec<InvoiceRecord>>, AppError> {
    let status_filter = params
        .status
        .as_deref()
        .map(InvoiceStatus::parse)
        .transpose()?;

    let mut invoices: Vec<InvoiceRecord> = state
        .invoices
        .list()
        .into_iter()
        .filter(|i| {
            if let Some(ref jid) = params.job_card_id {
                if i.job_card_id != *jid {
                    return false;
                }
            }
            if let Some(status) = status_filter {
                if i.status != status {
                    return false;
                }
            }
            // Exporter agents only see invoices on their own cards.
            match state.job_cards.get(&i.job_card_id) {
                Some(card) => caller.can_access_exporter(card.exporter_id),
                None => caller.has_role(Role::Officer),
            }
        })
        .collect();

    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(invoices))
}

/// GET /v1/invoices/:id — Get an invoice by ID.
#[utoipa::path(
    get,
    path = "/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "The invoice", body = InvoiceRecord),
        (status = 404, description = "Not found"),
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceRecord>, AppError> {
    let invoice = state
        .invoices
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("invoice {id} not found")))?;
    if let Some(card) = state.job_cards.get(&invoice.job_card_id) {
        if !caller.can_access_exporter(card.exporter_id) {
            return Err(AppError::Forbidden(
                "invoice belongs to another exporter".to_string(),
            ));
        }
    }
    Ok(Json(invoice))
}

/// POST /v1/invoices/:id/pay — Settle an invoice.
#[utoipa::path(
    post,
    path = "/v1/invoices/{id}/pay",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Settled invoice", body = InvoiceRecord),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already paid"),
    ),
    tag = "invoices"
)]
pub async fn pay_invoice(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceRecord>, AppError> {
    require_role(&caller, Role::Officer)?;

    let now = Utc::now();
    let updated = state
        .invoices
        .try_update(&id, |invoice| {
            if invoice.status == InvoiceStatus::Paid {
                return Err(AppError::Conflict(format!(
                    "invoice {} is already paid",
                    invoice.invoice_number
                )));
            }
            invoice.status = InvoiceStatus::Paid;
            invoice.updated_at = now;
            Ok(invoice.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("invoice {id} not found")))??;

    // Settle the job card. Completed → Paid per the transition table.
    let updated_card = state.job_cards.update(&updated.job_card_id, |c| {
        if c.status.can_transition_to(JobCardStatus::Paid) {
            c.status = JobCardStatus::Paid;
            c.updated_at = now;
        }
    });

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::invoices::mark_paid(pool, id, now).await {
            tracing::error!(invoice = %updated.invoice_number, error = %e, "failed to persist payment");
            return Err(AppError::Internal(
                "payment recorded in-memory but database persist failed".to_string(),
            ));
        }
        if let Some(card) = &updated_card {
            if let Err(e) = crate::db::job_cards::update(pool, card).await {
                tracing::error!(job_card = %card.reference, error = %e, "failed to persist job card settlement");
                return Err(AppError::Internal(
                    "payment persisted but job card status update failed".to_string(),
                ));
            }
        }
    }

    tracing::info!(invoice = %updated.invoice_number, "invoice paid");
    Ok(Json(updated))
}

/// GET /v1/invoices/:id/print — The invoice as a printable A4 document.
#[utoipa::path(
    get,
    path = "/v1/invoices/{id}/print",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Printable invoice", body = String, content_type = "text/html"),
        (status = 404, description = "Not found"),
    ),
    tag = "invoices"
)]
pub async fn print_invoice(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let invoice = state
        .invoices
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("invoice {id} not found")))?;
    let card = state
        .job_cards
        .get(&invoice.job_card_id)
        .ok_or_else(|| AppError::NotFound(format!("job card {} not found", invoice.job_card_id)))?;
    if !caller.can_access_exporter(card.exporter_id) {
        return Err(AppError::Forbidden(
            "invoice belongs to another exporter".to_string(),
        ));
    }
    let exporter = state
        .exporters
        .get(&card.exporter_id)
        .ok_or_else(|| AppError::NotFound(format!("exporter {} not found", card.exporter_id)))?;

    let doc = InvoiceDocument {
        invoice_number: invoice.invoice_number.as_str().to_string(),
        issued_on: invoice.created_at.format("%Y-%m-%d").to_string(),
        exporter_name: exporter.name,
        exporter_code: exporter.code.as_str().to_string(),
        job_card_reference: card.reference.as_str().to_string(),
        currency: invoice.currency.as_str().to_string(),
        assay_value_usd: invoice.assay_value_usd,
        assay_value_ghs: invoice.assay_value_ghs,
        levies: invoice.levies,
        status: invoice.status.as_str().to_string(),
    };

    Ok(Html(render_invoice_document(&doc)))
}
