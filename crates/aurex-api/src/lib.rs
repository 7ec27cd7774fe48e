//! # aurex-api — Axum API Services for the Aurex Back Office
//!
//! HTTP surface for the precious-metals export regulator's back office:
//! intake of job cards, assay (purity) measurement capture, valuation,
//! statutory levy invoicing, daily pricing, and reporting.
//!
//! ## API Surface
//!
//! | Prefix              | Module                  | Domain                  |
//! |---------------------|-------------------------|-------------------------|
//! | `/v1/exporters/*`   | [`routes::exporters`]   | Exporter registry       |
//! | `/v1/job-cards/*`   | [`routes::job_cards`]   | Shipment intake         |
//! | `/v1/assays/*`      | [`routes::assays`]      | Measurement capture     |
//! | `/v1/invoices/*`    | [`routes::invoices`]    | Levy invoicing          |
//! | `/v1/prices/*`      | [`routes::prices`]      | Daily price feed        |
//! | `/v1/reports/*`     | [`routes::reports`]     | Regulator console       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → Metrics → Auth → Session → RateLimit → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::session::SessionTracker;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());
    let sessions = SessionTracker::new(state.config.session_idle_secs);

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::exporters::router())
        .merge(routes::job_cards::router())
        .merge(routes::assays::router())
        .merge(routes::invoices::router())
        .merge(routes::prices::router())
        .merge(routes::reports::router())
        .merge(openapi::router())
        .route(
            "/metrics",
            axum::routing::get(middleware::metrics::metrics_handler),
        )
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::session_middleware))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .layer(axum::Extension(sessions))
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
