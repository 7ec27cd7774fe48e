//! Daily price persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `daily_prices` table.
//! One row per calendar date; re-posting a date upserts it.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::DailyPriceRecord;

/// Insert or replace the price row for a date.
pub async fn upsert(pool: &PgPool, record: &DailyPriceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO daily_prices (id, price_date, gold_price_per_oz, silver_price_per_oz,
         usd_to_ghs_rate, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (price_date) DO UPDATE SET
           gold_price_per_oz = EXCLUDED.gold_price_per_oz,
           silver_price_per_oz = EXCLUDED.silver_price_per_oz,
           usd_to_ghs_rate = EXCLUDED.usd_to_ghs_rate",
    )
    .bind(record.id)
    .bind(record.price_date)
    .bind(record.gold_price_per_oz)
    .bind(record.silver_price_per_oz)
    .bind(record.usd_to_ghs_rate)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all daily prices into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<DailyPriceRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DailyPriceRow>(
        "SELECT id, price_date, gold_price_per_oz, silver_price_per_oz, usd_to_ghs_rate,
         created_at
         FROM daily_prices ORDER BY price_date",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DailyPriceRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DailyPriceRow {
    id: Uuid,
    price_date: NaiveDate,
    gold_price_per_oz: f64,
    silver_price_per_oz: f64,
    usd_to_ghs_rate: f64,
    created_at: DateTime<Utc>,
}

impl DailyPriceRow {
    fn into_record(self) -> DailyPriceRecord {
        DailyPriceRecord {
            id: self.id,
            price_date: self.price_date,
            gold_price_per_oz: self.gold_price_per_oz,
            silver_price_per_oz: self.silver_price_per_oz,
            usd_to_ghs_rate: self.usd_to_ghs_rate,
            created_at: self.created_at,
        }
    }
}
