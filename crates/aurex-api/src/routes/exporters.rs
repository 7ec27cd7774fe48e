//! # Exporter Registry API
//!
//! CRUD for registered exporters. Registry management is admin-only;
//! reads are open to any authenticated caller. Exporters referenced by
//! job cards are never deleted — there is deliberately no delete endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use aurex_core::{ExporterCode, ExporterType};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, ExporterRecord};

/// Request to register an exporter.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateExporterRequest {
    /// Registered business name.
    pub name: String,
    /// Registry short code (2-12 uppercase alphanumeric/dash).
    pub code: String,
    /// Classification: "small_scale", "large_scale", "gold", "other".
    pub exporter_type: String,
    /// Authorized signatory on export documents.
    pub authorized_signatory: String,
}

impl Validate for CreateExporterRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.name.len() > 255 {
            return Err("name must not exceed 255 characters".to_string());
        }
        if self.authorized_signatory.trim().is_empty() {
            return Err("authorized_signatory must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to update an exporter's mutable fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateExporterRequest {
    pub name: Option<String>,
    pub authorized_signatory: Option<String>,
}

impl Validate for UpdateExporterRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty".to_string());
            }
            if name.len() > 255 {
                return Err("name must not exceed 255 characters".to_string());
            }
        }
        if let Some(ref signatory) = self.authorized_signatory {
            if signatory.trim().is_empty() {
                return Err("authorized_signatory must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Build the exporters router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/exporters", get(list_exporters).post(create_exporter))
        .route("/v1/exporters/:id", get(get_exporter).put(update_exporter))
}

/// POST /v1/exporters — Register an exporter.
#[utoipa::path(
    post,
    path = "/v1/exporters",
    request_body = CreateExporterRequest,
    responses(
        (status = 200, description = "Exporter registered", body = ExporterRecord),
        (status = 409, description = "Code already registered"),
    ),
    tag = "exporters"
)]
pub async fn create_exporter(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateExporterRequest>, JsonRejection>,
) -> Result<Json<ExporterRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let code = ExporterCode::new(req.code.as_str())?;
    let exporter_type = ExporterType::parse(&req.exporter_type)?;

    let duplicate = state.exporters.filter(|e| e.code == code);
    if !duplicate.is_empty() {
        return Err(AppError::Conflict(format!(
            "exporter code {code} is already registered"
        )));
    }

    let now = Utc::now();
    let record = ExporterRecord {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        code,
        exporter_type,
        authorized_signatory: req.authorized_signatory.trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    state.exporters.insert(record.id, record.clone());

    // Write-through persistence. Failure is surfaced because the in-memory
    // record would be lost on restart, causing silent data loss.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::exporters::insert(pool, &record).await {
            tracing::error!(exporter_id = %record.id, error = %e, "failed to persist exporter");
            return Err(AppError::Internal(
                "exporter recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::info!(exporter_id = %record.id, code = %record.code, "exporter registered");
    Ok(Json(record))
}

/// GET /v1/exporters — List registered exporters.
#[utoipa::path(
    get,
    path = "/v1/exporters",
    responses(
        (status = 200, description = "All registered exporters", body = Vec<ExporterRecord>),
    ),
    tag = "exporters"
)]
pub async fn list_exporters(State(state): State<AppState>) -> Json<Vec<ExporterRecord>> {
    let mut all = state.exporters.list();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    Json(all)
}

/// GET /v1/exporters/:id — Get an exporter by ID.
#[utoipa::path(
    get,
    path = "/v1/exporters/{id}",
    params(("id" = Uuid, Path, description = "Exporter ID")),
    responses(
        (status = 200, description = "The exporter", body = ExporterRecord),
        (status = 404, description = "Not found"),
    ),
    tag = "exporters"
)]
pub async fn get_exporter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExporterRecord>, AppError> {
    state
        .exporters
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("exporter {id} not found")))
}

/// PUT /v1/exporters/:id — Update an exporter's mutable fields.
#[utoipa::path(
    put,
    path = "/v1/exporters/{id}",
    params(("id" = Uuid, Path, description = "Exporter ID")),
    request_body = UpdateExporterRequest,
    responses(
        (status = 200, description = "Updated exporter", body = ExporterRecord),
        (status = 404, description = "Not found"),
    ),
    tag = "exporters"
)]
pub async fn update_exporter(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateExporterRequest>, JsonRejection>,
) -> Result<Json<ExporterRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let updated = state
        .exporters
        .update(&id, |e| {
            if let Some(ref name) = req.name {
                e.name = name.trim().to_string();
            }
            if let Some(ref signatory) = req.authorized_signatory {
                e.authorized_signatory = signatory.trim().to_string();
            }
            e.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("exporter {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::exporters::update(pool, &updated).await {
            tracing::error!(exporter_id = %id, error = %e, "failed to persist exporter update");
            return Err(AppError::Internal(
                "exporter updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}
