//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx.
//!
//! When `DATABASE_URL` is set, every write-path endpoint persists its
//! record write-through after updating the in-memory store, and startup
//! hydrates the stores from the tables. When absent, the API runs
//! in-memory only (suitable for development and testing).
//!
//! Each module owns one aggregate's tables and follows the same shape:
//! `insert` / targeted `update` functions taking `&PgPool`, a `load_all`
//! used by hydration, and an internal `#[derive(sqlx::FromRow)]` row type
//! that converts to the API record, rejecting malformed stored values
//! instead of silently defaulting them.

pub mod assays;
pub mod exporters;
pub mod invoices;
pub mod job_cards;
pub mod prices;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    // Run embedded migrations.
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Wrap a malformed stored value into a decode error with context.
pub(crate) fn decode_error(
    err: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
