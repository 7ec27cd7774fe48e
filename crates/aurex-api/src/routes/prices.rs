//! # Daily Price Feed API
//!
//! The finance desk posts one price row per day (gold/silver spot, GHS
//! exchange rate). Assay creation snapshots the latest row when the
//! request doesn't carry explicit pricing, so getting this feed wrong
//! mis-values every shipment — hence the positive-value validation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, DailyPriceRecord};

/// Request to record (or correct) a day's prices.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDailyPriceRequest {
    /// Calendar date the prices apply to. Defaults to today (UTC).
    pub price_date: Option<NaiveDate>,
    /// Gold spot price, USD per troy ounce.
    pub gold_price_per_oz: f64,
    /// Silver spot price, USD per troy ounce.
    pub silver_price_per_oz: f64,
    /// Exchange rate, GHS per USD.
    pub usd_to_ghs_rate: f64,
}

impl Validate for CreateDailyPriceRequest {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("gold_price_per_oz", self.gold_price_per_oz),
            ("silver_price_per_oz", self.silver_price_per_oz),
            ("usd_to_ghs_rate", self.usd_to_ghs_rate),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{field} must be a positive number"));
            }
        }
        Ok(())
    }
}

/// Build the daily prices router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/prices", post(create_daily_price))
        .route("/v1/prices/latest", get(latest_daily_price))
}

/// POST /v1/prices — Record a day's prices (idempotent per date).
#[utoipa::path(
    post,
    path = "/v1/prices",
    request_body = CreateDailyPriceRequest,
    responses(
        (status = 200, description = "Price row recorded", body = DailyPriceRecord),
    ),
    tag = "prices"
)]
pub async fn create_daily_price(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateDailyPriceRequest>, JsonRejection>,
) -> Result<Json<DailyPriceRecord>, AppError> {
    require_role(&caller, Role::Officer)?;
    let req = extract_validated_json(body)?;

    let price_date = req.price_date.unwrap_or_else(|| Utc::now().date_naive());

    // One row per date: re-posting a date replaces it (price corrections).
    let existing = state.daily_prices.filter(|p| p.price_date == price_date);
    for stale in existing {
        state.daily_prices.remove(&stale.id);
    }

    let record = DailyPriceRecord {
        id: Uuid::new_v4(),
        price_date,
        gold_price_per_oz: req.gold_price_per_oz,
        silver_price_per_oz: req.silver_price_per_oz,
        usd_to_ghs_rate: req.usd_to_ghs_rate,
        created_at: Utc::now(),
    };

    state.daily_prices.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::prices::upsert(pool, &record).await {
            tracing::error!(price_date = %price_date, error = %e, "failed to persist daily price");
            return Err(AppError::Internal(
                "price recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::info!(
        price_date = %record.price_date,
        gold = record.gold_price_per_oz,
        rate = record.usd_to_ghs_rate,
        "daily price recorded"
    );
    Ok(Json(record))
}

/// GET /v1/prices/latest — The most recent price row.
#[utoipa::path(
    get,
    path = "/v1/prices/latest",
    responses(
        (status = 200, description = "Latest price row", body = DailyPriceRecord),
        (status = 404, description = "No prices recorded yet"),
    ),
    tag = "prices"
)]
pub async fn latest_daily_price(
    State(state): State<AppState>,
) -> Result<Json<DailyPriceRecord>, AppError> {
    state
        .latest_price()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no daily prices recorded".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn officer() -> CallerIdentity {
        CallerIdentity {
            role: Role::Officer,
            exporter_id: None,
        }
    }

    fn test_app(state: AppState, caller: CallerIdentity) -> Router {
        router().with_state(state).layer(axum::Extension(caller))
    }

    fn post_price(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/prices")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn record_and_fetch_latest() {
        let app = test_app(AppState::new(), officer());

        let response = app
            .clone()
            .oneshot(post_price(serde_json::json!({
                "price_date": "2026-08-04",
                "gold_price_per_oz": 2000.0,
                "silver_price_per_oz": 25.0,
                "usd_to_ghs_rate": 12.0
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/prices/latest")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let latest: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(latest["gold_price_per_oz"], 2000.0);
    }

    #[tokio::test]
    async fn reposting_a_date_replaces_it() {
        let state = AppState::new();
        let app = test_app(state.clone(), officer());

        for gold in [1990.0, 2010.0] {
            let response = app
                .clone()
                .oneshot(post_price(serde_json::json!({
                    "price_date": "2026-08-04",
                    "gold_price_per_oz": gold,
                    "silver_price_per_oz": 25.0,
                    "usd_to_ghs_rate": 12.0
                })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(state.daily_prices.len(), 1);
        assert_eq!(state.latest_price().unwrap().gold_price_per_oz, 2010.0);
    }

    #[tokio::test]
    async fn non_positive_price_rejected() {
        let app = test_app(AppState::new(), officer());
        let response = app
            .oneshot(post_price(serde_json::json!({
                "gold_price_per_oz": 0.0,
                "silver_price_per_oz": 25.0,
                "usd_to_ghs_rate": 12.0
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn exporter_agent_cannot_post_prices() {
        let agent = CallerIdentity {
            role: Role::ExporterAgent,
            exporter_id: Some(Uuid::new_v4()),
        };
        let app = test_app(AppState::new(), agent);
        let response = app
            .oneshot(post_price(serde_json::json!({
                "gold_price_per_oz": 2000.0,
                "silver_price_per_oz": 25.0,
                "usd_to_ghs_rate": 12.0
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn latest_is_not_found_when_empty() {
        let app = test_app(AppState::new(), officer());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/prices/latest")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
