//! # Assay Capture API
//!
//! Records laboratory measurement batches against job cards and keeps the
//! valuation invariant: assay totals are always computed from the current
//! measurement set via the valuation engine, and job-card totals are
//! re-derived from assay totals in the same operation.
//!
//! An assay and its measurements are created as one unit of work. The
//! legacy system created them through sequential independent calls, which
//! could leave an assay with no measurements after a crash; here the
//! in-memory insert is a single record carrying its batch, and the
//! database write is one transaction.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use aurex_core::{AssayMethod, JobCardStatus};
use aurex_valuation::valuation::{value_measurements, Measurement, PricingSnapshot};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, AssayRecord};

/// One measurement row as submitted by the laboratory.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MeasurementInput {
    /// 1-based piece index. Assigned from position when omitted.
    pub piece: Option<u32>,
    /// Physical bar or seal marking.
    pub bar_number: Option<String>,
    /// Gross weight in the job card's unit.
    pub gross_weight: Option<f64>,
    /// Gold fineness percentage (0-100).
    pub gold_assay_percent: Option<f64>,
    /// Silver fineness percentage (0-100).
    pub silver_assay_percent: Option<f64>,
    /// Assayer-entered net gold weight. Wins over recomputation.
    pub net_gold_weight: Option<f64>,
    /// Assayer-entered net silver weight. Wins over recomputation.
    pub net_silver_weight: Option<f64>,
}

impl MeasurementInput {
    fn validate_row(&self, index: usize) -> Result<(), String> {
        for (field, value) in [
            ("gross_weight", self.gross_weight),
            ("net_gold_weight", self.net_gold_weight),
            ("net_silver_weight", self.net_silver_weight),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!(
                        "measurement {}: {field} must be a non-negative number",
                        index + 1
                    ));
                }
            }
        }
        for (field, value) in [
            ("gold_assay_percent", self.gold_assay_percent),
            ("silver_assay_percent", self.silver_assay_percent),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                    return Err(format!(
                        "measurement {}: {field} must be between 0 and 100",
                        index + 1
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Pricing override for an assay. When omitted, the latest daily price
/// row is snapshotted instead.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PricingInput {
    pub gold_price_per_oz: f64,
    pub silver_price_per_oz: f64,
    pub usd_to_ghs_rate: f64,
}

impl PricingInput {
    fn validate_fields(&self) -> Result<(), String> {
        for (field, value) in [
            ("gold_price_per_oz", self.gold_price_per_oz),
            ("silver_price_per_oz", self.silver_price_per_oz),
            ("usd_to_ghs_rate", self.usd_to_ghs_rate),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("pricing.{field} must be a positive number"));
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> PricingSnapshot {
        PricingSnapshot {
            gold_price_per_oz: self.gold_price_per_oz,
            silver_price_per_oz: self.silver_price_per_oz,
            usd_to_ghs_rate: self.usd_to_ghs_rate,
        }
    }
}

/// Request to record an assay with its measurement batch.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAssayRequest {
    /// Laboratory method: "x_ray" or "water_density".
    pub method: String,
    /// When the analysis was performed. Defaults to now.
    pub date_of_analysis: Option<DateTime<Utc>>,
    /// Signing assayer.
    pub signatory: String,
    /// Seal numbers applied to the consignment.
    pub seal_numbers: Option<Vec<String>>,
    /// The measurement batch. May be empty (totals will be zero).
    #[serde(default)]
    pub measurements: Vec<MeasurementInput>,
    /// Pricing override; latest daily price when omitted.
    pub pricing: Option<PricingInput>,
}

impl Validate for CreateAssayRequest {
    fn validate(&self) -> Result<(), String> {
        AssayMethod::parse(&self.method).map_err(|e| e.to_string())?;
        if self.signatory.trim().is_empty() {
            return Err("signatory must not be empty".to_string());
        }
        for (i, m) in self.measurements.iter().enumerate() {
            m.validate_row(i)?;
        }
        if let Some(ref pricing) = self.pricing {
            pricing.validate_fields()?;
        }
        Ok(())
    }
}

/// Request to append measurements to an existing assay.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendMeasurementsRequest {
    pub measurements: Vec<MeasurementInput>,
}

impl Validate for AppendMeasurementsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.measurements.is_empty() {
            return Err("measurements must not be empty".to_string());
        }
        for (i, m) in self.measurements.iter().enumerate() {
            m.validate_row(i)?;
        }
        Ok(())
    }
}

/// Build the assays router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/job-cards/:id/assays",
            get(list_assays).post(create_assay),
        )
        .route("/v1/assays/:id", get(get_assay))
        .route("/v1/assays/:id/measurements", post(append_measurements))
}

/// Materialize submitted rows into engine measurements, assigning piece
/// indexes and the job card's unit.
fn build_measurements(
    inputs: &[MeasurementInput],
    unit: aurex_core::WeightUnit,
    next_piece: u32,
) -> Vec<Measurement> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let piece = input.piece.unwrap_or(next_piece + i as u32);
            Measurement {
                piece,
                bar_number: input
                    .bar_number
                    .clone()
                    .unwrap_or_else(|| format!("BAR-{piece:03}")),
                unit,
                gross_weight: input.gross_weight,
                gold_assay_percent: input.gold_assay_percent,
                silver_assay_percent: input.silver_assay_percent,
                net_gold_weight: input.net_gold_weight,
                net_silver_weight: input.net_silver_weight,
            }
        })
        .collect()
}

/// POST /v1/job-cards/:id/assays — Record an assay and its measurements.
#[utoipa::path(
    post,
    path = "/v1/job-cards/{id}/assays",
    params(("id" = Uuid, Path, description = "Job card ID")),
    request_body = CreateAssayRequest,
    responses(
        (status = 200, description = "Assay recorded", body = AssayRecord),
        (status = 404, description = "Job card not found"),
        (status = 409, description = "Job card is not accepting assays"),
        (status = 422, description = "No pricing available"),
    ),
    tag = "assays"
)]
pub async fn create_assay(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(job_card_id): Path<Uuid>,
    body: Result<Json<CreateAssayRequest>, JsonRejection>,
) -> Result<Json<AssayRecord>, AppError> {
    require_role(&caller, Role::Officer)?;
    let req = extract_validated_json(body)?;

    let card = state
        .job_cards
        .get(&job_card_id)
        .ok_or_else(|| AppError::NotFound(format!("job card {job_card_id} not found")))?;

    // Assays are accepted until the card is invoiced.
    if !matches!(card.status, JobCardStatus::Pending | JobCardStatus::InProgress) {
        return Err(AppError::Conflict(format!(
            "job card {} is {} and not accepting assays",
            card.reference, card.status
        )));
    }

    let method = AssayMethod::parse(&req.method)?;

    let pricing = match &req.pricing {
        Some(p) => p.snapshot(),
        None => state
            .latest_price()
            .map(|p| p.snapshot())
            .ok_or_else(|| {
                AppError::Validation(
                    "no pricing available — supply pricing or record a daily price first"
                        .to_string(),
                )
            })?,
    };

    let measurements = build_measurements(&req.measurements, card.unit_of_measure, 1);
    let valuation = value_measurements(&measurements, &pricing);

    let now = Utc::now();
    let mut assay = AssayRecord {
        id: Uuid::new_v4(),
        job_card_id,
        method,
        date_of_analysis: req.date_of_analysis.unwrap_or(now),
        signatory: req.signatory.trim().to_string(),
        seal_numbers: req.seal_numbers.clone().unwrap_or_default(),
        gold_price_per_oz: pricing.gold_price_per_oz,
        silver_price_per_oz: pricing.silver_price_per_oz,
        usd_to_ghs_rate: pricing.usd_to_ghs_rate,
        measurements,
        total_net_gold_oz: 0.0,
        total_net_silver_oz: 0.0,
        total_gold_value_usd: 0.0,
        total_silver_value_usd: 0.0,
        total_combined_value_usd: 0.0,
        total_value_ghs: 0.0,
        created_at: now,
        updated_at: now,
    };
    assay.apply_valuation(&valuation);

    // One unit of work in memory: the assay lands with its batch, the card
    // moves to in_progress, and totals are re-derived from assays.
    state.assays.insert(assay.id, assay.clone());
    if card.status == JobCardStatus::Pending {
        state.job_cards.update(&job_card_id, |c| {
            c.status = JobCardStatus::InProgress;
        });
    }
    let updated_card = state
        .recompute_job_card_totals(job_card_id)
        .ok_or_else(|| AppError::NotFound(format!("job card {job_card_id} not found")))?;

    // One transaction in the database: assay + measurements + card totals.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::assays::insert_with_job_card(pool, &assay, &updated_card).await {
            tracing::error!(assay_id = %assay.id, error = %e, "failed to persist assay");
            return Err(AppError::Internal(
                "assay recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::info!(
        assay_id = %assay.id,
        job_card = %updated_card.reference,
        pieces = assay.measurements.len(),
        combined_usd = assay.total_combined_value_usd,
        "assay recorded"
    );
    Ok(Json(assay))
}

/// GET /v1/job-cards/:id/assays — List a job card's assays.
#[utoipa::path(
    get,
    path = "/v1/job-cards/{id}/assays",
    params(("id" = Uuid, Path, description = "Job card ID")),
    responses(
        (status = 200, description = "The card's assays", body = Vec<AssayRecord>),
        (status = 404, description = "Job card not found"),
    ),
    tag = "assays"
)]
pub async fn list_assays(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(job_card_id): Path<Uuid>,
) -> Result<Json<Vec<AssayRecord>>, AppError> {
    let card = state
        .job_cards
        .get(&job_card_id)
        .ok_or_else(|| AppError::NotFound(format!("job card {job_card_id} not found")))?;
    if !caller.can_access_exporter(card.exporter_id) {
        return Err(AppError::Forbidden(
            "job card belongs to another exporter".to_string(),
        ));
    }

    let mut assays = state.assays_for_job_card(job_card_id);
    assays.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(assays))
}

/// GET /v1/assays/:id — Get an assay by ID.
#[utoipa::path(
    get,
    path = "/v1/assays/{id}",
    params(("id" = Uuid, Path, description = "Assay ID")),
    responses(
        (status = 200, description = "The assay", body = AssayRecord),
        (status = 404, description = "Not found"),
    ),
    tag = "assays"
)]
pub async fn get_assay(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AssayRecord>, AppError> {
    let assay = state
        .assays
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("assay {id} not found")))?;
    if let Some(card) = state.job_cards.get(&assay.job_card_id) {
        if !caller.can_access_exporter(card.exporter_id) {
            return Err(AppError::Forbidden(
                "assay belongs to another exporter".to_string(),
            ));
        }
    }
    Ok(Json(assay))
}

/// POST /v1/assays/:id/measurements — Append measurements to an assay.
///
/// Measurements are append-only; existing rows are never edited or
/// removed. Totals are recomputed from the full batch against the assay's
/// original pricing snapshot.
#[utoipa::path(
    post,
    path = "/v1/assays/{id}/measurements",
    params(("id" = Uuid, Path, description = "Assay ID")),
    request_body = AppendMeasurementsRequest,
    responses(
        (status = 200, description = "Updated assay", body = AssayRecord),
        (status = 404, description = "Assay not found"),
        (status = 409, description = "Owning job card is already invoiced"),
    ),
    tag = "assays"
)]
pub async fn append_measurements(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<AppendMeasurementsRequest>, JsonRejection>,
) -> Result<Json<AssayRecord>, AppError> {
    require_role(&caller, Role::Officer)?;
    let req = extract_validated_json(body)?;

    let assay = state
        .assays
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("assay {id} not found")))?;
    let card = state
        .job_cards
        .get(&assay.job_card_id)
        .ok_or_else(|| AppError::NotFound(format!("job card {} not found", assay.job_card_id)))?;

    // Once invoiced the valuation is frozen into the invoice snapshot.
    if !matches!(card.status, JobCardStatus::Pending | JobCardStatus::InProgress) {
        return Err(AppError::Conflict(format!(
            "job card {} is {} — measurements are frozen",
            card.reference, card.status
        )));
    }

    let next_piece = assay
        .measurements
        .iter()
        .map(|m| m.piece)
        .max()
        .unwrap_or(0)
        + 1;
    let appended = build_measurements(&req.measurements, card.unit_of_measure, next_piece);

    let pricing = assay.pricing();
    let updated = state
        .assays
        .update(&id, |a| {
            a.measurements.extend(appended.iter().cloned());
            let valuation = value_measurements(&a.measurements, &pricing);
            a.apply_valuation(&valuation);
            a.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("assay {id} not found")))?;

    let updated_card = state
        .recompute_job_card_totals(assay.job_card_id)
        .ok_or_else(|| AppError::NotFound(format!("job card {} not found", assay.job_card_id)))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) =
            crate::db::assays::append_measurements(pool, &updated, &appended, &updated_card).await
        {
            tracing::error!(assay_id = %id, error = %e, "failed to persist appended measurements");
            return Err(AppError::Internal(
                "measurements recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}
