//! # Job Card Intake API
//!
//! CRUD for per-shipment intake records. Two rules shape every handler:
//!
//! 1. **Immutability once valued or settled.** A card with an assay or a
//!    paid invoice rejects update and delete with 409. The freeze check
//!    lives in [`AppState::job_card_freeze_reason`], not here.
//! 2. **Exporter scoping.** Exporter agents only see their own exporter's
//!    cards; officers and admins see everything.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use aurex_core::{JobCardStatus, WeightUnit};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, JobCardRecord};

/// Units accepted on job cards. Pounds exist only for legacy measurement
/// rows, never for new intake.
fn parse_intake_unit(tag: &str) -> Result<WeightUnit, String> {
    match tag.trim().to_ascii_lowercase().as_str() {
        "g" => Ok(WeightUnit::Grams),
        "kg" => Ok(WeightUnit::Kilograms),
        other => Err(format!("unit_of_measure must be \"g\" or \"kg\", got \"{other}\"")),
    }
}

/// Request to open a job card.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobCardRequest {
    /// The registered exporter shipping the consignment.
    pub exporter_id: Uuid,
    /// When the consignment was received. Defaults to now.
    pub received_date: Option<DateTime<Utc>>,
    /// Unit weights will be recorded in: "g" or "kg".
    pub unit_of_measure: String,
}

impl Validate for CreateJobCardRequest {
    fn validate(&self) -> Result<(), String> {
        parse_intake_unit(&self.unit_of_measure).map(|_| ())
    }
}

/// Request to amend a job card before it has been valued.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateJobCardRequest {
    pub received_date: Option<DateTime<Utc>>,
    /// "g" or "kg".
    pub unit_of_measure: Option<String>,
    /// Target status; only transitions the status table allows succeed.
    pub status: Option<String>,
}

impl Validate for UpdateJobCardRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref unit) = self.unit_of_measure {
            parse_intake_unit(unit)?;
        }
        if let Some(ref status) = self.status {
            JobCardStatus::parse(status).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Query parameters for listing job cards.
#[derive(Debug, Deserialize, Default)]
pub struct JobCardQueryParams {
    /// Filter by exporter.
    pub exporter_id: Option<Uuid>,
    /// Filter by status string.
    pub status: Option<String>,
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

/// Build the job cards router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/job-cards", get(list_job_cards).post(create_job_card))
        .route(
            "/v1/job-cards/:id",
            get(get_job_card).put(update_job_card).delete(delete_job_card),
        )
}

/// POST /v1/job-cards — Open a job card for a consignment.
#[utoipa::path(
    post,
    path = "/v1/job-cards",
    request_body = CreateJobCardRequest,
    responses(
        (status = 200, description = "Job card opened", body = JobCardRecord),
        (status = 404, description = "Exporter not found"),
    ),
    tag = "job-cards"
)]
pub async fn create_job_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateJobCardRequest>, JsonRejection>,
) -> Result<Json<JobCardRecord>, AppError> {
    let req = extract_validated_json(body)?;

    if !caller.can_access_exporter(req.exporter_id) {
        return Err(AppError::Forbidden(
            "cannot open job cards for another exporter".to_string(),
        ));
    }

    let exporter = state
        .exporters
        .get(&req.exporter_id)
        .ok_or_else(|| AppError::NotFound(format!("exporter {} not found", req.exporter_id)))?;

    // Validate already checked the unit string.
    let unit = parse_intake_unit(&req.unit_of_measure).map_err(AppError::Validation)?;

    let now = Utc::now();
    let record = JobCardRecord {
        id: Uuid::new_v4(),
        reference: state.next_job_card_reference(),
        exporter_id: exporter.id,
        exporter_name: exporter.name.clone(),
        received_date: req.received_date.unwrap_or(now),
        unit_of_measure: unit,
        status: JobCardStatus::Pending,
        total_net_gold_oz: 0.0,
        total_net_silver_oz: 0.0,
        total_usd_value: 0.0,
        total_ghs_value: 0.0,
        assay_count: 0,
        created_at: now,
        updated_at: now,
    };

    state.job_cards.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::job_cards::insert(pool, &record).await {
            tracing::error!(job_card = %record.reference, error = %e, "failed to persist job card");
            return Err(AppError::Internal(
                "job card recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::info!(job_card = %record.reference, exporter = %exporter.code, "job card opened");
    Ok(Json(record))
}

/// GET /v1/job-cards — List job cards with optional filtering.
#[utoipa::path(
    get,
    path = "/v1/job-cards",
    responses(
        (status = 200, description = "Matching job cards", body = Vec<JobCardRecord>),
    ),
    tag = "job-cards"
)]
pub async fn list_job_cards(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<JobCardQueryParams>,
) -> Result<Json<Vec<JobCardRecord>>, AppError> {
    let status_filter = params
        .status
        .as_deref()
        .map(JobCardStatus::parse)
        .transpose()?;

    let limit = params.limit.unwrap_or(100).min(1000);
    let offset = params.offset.unwrap_or(0);

    let mut cards: Vec<JobCardRecord> = state
        .job_cards
        .list()
        .into_iter()
        .filter(|c| caller.can_access_exporter(c.exporter_id))
        .filter(|c| {
            if let Some(ref eid) = params.exporter_id {
                if c.exporter_id != *eid {
                    return false;
                }
            }
            if let Some(status) = status_filter {
                if c.status != status {
                    return false;
                }
            }
            true
        })
        .collect();

    cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(cards.into_iter().skip(offset).take(limit).collect()))
}

/// GET /v1/job-cards/:id — Get a job card by ID.
#[utoipa::path(
    get,
    path = "/v1/job-cards/{id}",
    params(("id" = Uuid, Path, description = "Job card ID")),
    responses(
        (status = 200, description = "The job card", body = JobCardRecord),
        (status = 404, description = "Not found"),
    ),
    tag = "job-cards"
)]
pub async fn get_job_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<JobCardRecord>, AppError> {
    let card = state
        .job_cards
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("job card {id} not found")))?;
    if !caller.can_access_exporter(card.exporter_id) {
        return Err(AppError::Forbidden(
            "job card belongs to another exporter".to_string(),
        ));
    }
    Ok(Json(card))
}

/// PUT /v1/job-cards/:id — Amend a job card that has not been valued.
#[utoipa::path(
    put,
    path = "/v1/job-cards/{id}",
    params(("id" = Uuid, Path, description = "Job card ID")),
    request_body = UpdateJobCardRequest,
    responses(
        (status = 200, description = "Updated job card", body = JobCardRecord),
        (status = 404, description = "Not found"),
        (status = 409, description = "Card is frozen or transition not allowed"),
    ),
    tag = "job-cards"
)]
pub async fn update_job_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateJobCardRequest>, JsonRejection>,
) -> Result<Json<JobCardRecord>, AppError> {
    let req = extract_validated_json(body)?;

    let card = state
        .job_cards
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("job card {id} not found")))?;
    if !caller.can_access_exporter(card.exporter_id) {
        return Err(AppError::Forbidden(
            "job card belongs to another exporter".to_string(),
        ));
    }

    if let Some(reason) = state.job_card_freeze_reason(id) {
        return Err(AppError::Conflict(reason));
    }

    let target_status = req
        .status
        .as_deref()
        .map(JobCardStatus::parse)
        .transpose()?;
    let unit = req
        .unit_of_measure
        .as_deref()
        .map(|u| parse_intake_unit(u).map_err(AppError::Validation))
        .transpose()?;

    let result = state
        .job_cards
        .try_update(&id, |card| {
            if let Some(status) = target_status {
                if status != card.status && !card.status.can_transition_to(status) {
                    return Err(AppError::Conflict(format!(
                        "cannot move job card from {} to {}",
                        card.status, status
                    )));
                }
                card.status = status;
            }
            if let Some(date) = req.received_date {
                card.received_date = date;
            }
            if let Some(unit) = unit {
                card.unit_of_measure = unit;
            }
            card.updated_at = Utc::now();
            Ok(card.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("job card {id} not found")))??;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::job_cards::update(pool, &result).await {
            tracing::error!(job_card = %result.reference, error = %e, "failed to persist job card update");
            return Err(AppError::Internal(
                "job card updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(result))
}

/// DELETE /v1/job-cards/:id — Remove a job card that has not been valued.
#[utoipa::path(
    delete,
    path = "/v1/job-cards/{id}",
    params(("id" = Uuid, Path, description = "Job card ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Card is frozen or invoiced"),
    ),
    tag = "job-cards"
)]
pub async fn delete_job_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let card = state
        .job_cards
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("job card {id} not found")))?;
    if !caller.can_access_exporter(card.exporter_id) {
        return Err(AppError::Forbidden(
            "job card belongs to another exporter".to_string(),
        ));
    }

    if let Some(reason) = state.job_card_freeze_reason(id) {
        return Err(AppError::Conflict(reason));
    }
    // Deleting an invoiced card would orphan the invoice, paid or not.
    if !state.invoices.filter(|i| i.job_card_id == id).is_empty() {
        return Err(AppError::Conflict(
            "job card has an invoice and cannot be deleted".to_string(),
        ));
    }

    state.job_cards.remove(&id);

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::job_cards::delete(pool, id).await {
            tracing::error!(job_card_id = %id, error = %e, "failed to delete job card from database");
            return Err(AppError::Internal(
                "job card removed in-memory but database delete failed".to_string(),
            ));
        }
    }

    tracing::info!(job_card = %card.reference, "job card deleted");
    Ok(StatusCode::NO_CONTENT)
}
