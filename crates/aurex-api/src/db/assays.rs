//! Assay persistence operations.
//!
//! An assay and its measurements are one unit of work: [`insert_with_job_card`]
//! writes the assay row, every measurement row, and the owning job card's
//! refreshed totals inside a single transaction. A crash mid-sequence can
//! never leave an assay without its measurements or a card whose totals
//! disagree with its assays.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use aurex_core::{AssayMethod, WeightUnit};
use aurex_valuation::valuation::Measurement;

use crate::db::decode_error;
use crate::state::{AssayRecord, JobCardRecord};

/// Insert an assay, its measurements, and the owning job card's refreshed
/// totals in one transaction.
pub async fn insert_with_job_card(
    pool: &PgPool,
    assay: &AssayRecord,
    job_card: &JobCardRecord,
) -> Result<(), sqlx::Error> {
    let seal_numbers = serde_json::to_value(&assay.seal_numbers).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize assay seal_numbers");
        sqlx::Error::Encode(Box::new(e))
    })?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO assays (id, job_card_id, method, date_of_analysis, signatory,
         seal_numbers, gold_price_per_oz, silver_price_per_oz, usd_to_ghs_rate,
         total_net_gold_oz, total_net_silver_oz, total_gold_value_usd,
         total_silver_value_usd, total_combined_value_usd, total_value_ghs,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(assay.id)
    .bind(assay.job_card_id)
    .bind(assay.method.as_str())
    .bind(assay.date_of_analysis)
    .bind(&assay.signatory)
    .bind(&seal_numbers)
    .bind(assay.gold_price_per_oz)
    .bind(assay.silver_price_per_oz)
    .bind(assay.usd_to_ghs_rate)
    .bind(assay.total_net_gold_oz)
    .bind(assay.total_net_silver_oz)
    .bind(assay.total_gold_value_usd)
    .bind(assay.total_silver_value_usd)
    .bind(assay.total_combined_value_usd)
    .bind(assay.total_value_ghs)
    .bind(assay.created_at)
    .bind(assay.updated_at)
    .execute(&mut *tx)
    .await?;

    for m in &assay.measurements {
        insert_measurement(&mut tx, assay.id, m).await?;
    }

    update_job_card_totals(&mut tx, job_card).await?;

    tx.commit().await?;
    Ok(())
}

/// Persist appended measurements and refreshed totals in one transaction.
///
/// Measurements are append-only, so only rows with `piece` beyond what is
/// already stored are inserted.
pub async fn append_measurements(
    pool: &PgPool,
    assay: &AssayRecord,
    appended: &[Measurement],
    job_card: &JobCardRecord,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for m in appended {
        insert_measurement(&mut tx, assay.id, m).await?;
    }

    sqlx::query(
        "UPDATE assays SET total_net_gold_oz = $2, total_net_silver_oz = $3,
         total_gold_value_usd = $4, total_silver_value_usd = $5,
         total_combined_value_usd = $6, total_value_ghs = $7, updated_at = $8
         WHERE id = $1",
    )
    .bind(assay.id)
    .bind(assay.total_net_gold_oz)
    .bind(assay.total_net_silver_oz)
    .bind(assay.total_gold_value_usd)
    .bind(assay.total_silver_value_usd)
    .bind(assay.total_combined_value_usd)
    .bind(assay.total_value_ghs)
    .bind(assay.updated_at)
    .execute(&mut *tx)
    .await?;

    update_job_card_totals(&mut tx, job_card).await?;

    tx.commit().await?;
    Ok(())
}

async fn insert_measurement(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    assay_id: Uuid,
    m: &Measurement,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO measurements (assay_id, piece, bar_number, unit, gross_weight,
         gold_assay_percent, silver_assay_percent, net_gold_weight, net_silver_weight)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(assay_id)
    .bind(piece_i32(m.piece))
    .bind(&m.bar_number)
    .bind(m.unit.as_str())
    .bind(m.gross_weight)
    .bind(m.gold_assay_percent)
    .bind(m.silver_assay_percent)
    .bind(m.net_gold_weight)
    .bind(m.net_silver_weight)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_job_card_totals(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    job_card: &JobCardRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE job_cards SET status = $2, total_net_gold_oz = $3, total_net_silver_oz = $4,
         total_usd_value = $5, total_ghs_value = $6, assay_count = $7, updated_at = $8
         WHERE id = $1",
    )
    .bind(job_card.id)
    .bind(job_card.status.as_str())
    .bind(job_card.total_net_gold_oz)
    .bind(job_card.total_net_silver_oz)
    .bind(job_card.total_usd_value)
    .bind(job_card.total_ghs_value)
    .bind(i32::try_from(job_card.assay_count).unwrap_or(i32::MAX))
    .bind(job_card.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn piece_i32(piece: u32) -> i32 {
    i32::try_from(piece).unwrap_or_else(|_| {
        tracing::error!(piece, "piece index exceeds i32::MAX — clamping for DB storage");
        i32::MAX
    })
}

/// Load all assays (with their measurements) on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AssayRecord>, sqlx::Error> {
    let assay_rows = sqlx::query_as::<_, AssayRow>(
        "SELECT id, job_card_id, method, date_of_analysis, signatory, seal_numbers,
         gold_price_per_oz, silver_price_per_oz, usd_to_ghs_rate,
         total_net_gold_oz, total_net_silver_oz, total_gold_value_usd,
         total_silver_value_usd, total_combined_value_usd, total_value_ghs,
         created_at, updated_at
         FROM assays ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let measurement_rows = sqlx::query_as::<_, MeasurementRow>(
        "SELECT assay_id, piece, bar_number, unit, gross_weight, gold_assay_percent,
         silver_assay_percent, net_gold_weight, net_silver_weight
         FROM measurements ORDER BY assay_id, piece",
    )
    .fetch_all(pool)
    .await?;

    let mut by_assay: HashMap<Uuid, Vec<Measurement>> = HashMap::new();
    for row in measurement_rows {
        let assay_id = row.assay_id;
        by_assay.entry(assay_id).or_default().push(row.into_measurement());
    }

    assay_rows
        .into_iter()
        .map(|row| {
            let measurements = by_assay.remove(&row.id).unwrap_or_default();
            row.into_record(measurements)
        })
        .collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AssayRow {
    id: Uuid,
    job_card_id: Uuid,
    method: String,
    date_of_analysis: DateTime<Utc>,
    signatory: String,
    seal_numbers: serde_json::Value,
    gold_price_per_oz: f64,
    silver_price_per_oz: f64,
    usd_to_ghs_rate: f64,
    total_net_gold_oz: f64,
    total_net_silver_oz: f64,
    total_gold_value_usd: f64,
    total_silver_value_usd: f64,
    total_combined_value_usd: f64,
    total_value_ghs: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AssayRow {
    fn into_record(self, measurements: Vec<Measurement>) -> Result<AssayRecord, sqlx::Error> {
        let method = AssayMethod::parse(&self.method).map_err(decode_error)?;
        let seal_numbers: Vec<String> =
            serde_json::from_value(self.seal_numbers).map_err(|e| {
                tracing::error!(assay_id = %self.id, error = %e, "malformed seal_numbers in database");
                sqlx::Error::Decode(Box::new(e))
            })?;
        Ok(AssayRecord {
            id: self.id,
            job_card_id: self.job_card_id,
            method,
            date_of_analysis: self.date_of_analysis,
            signatory: self.signatory,
            seal_numbers,
            gold_price_per_oz: self.gold_price_per_oz,
            silver_price_per_oz: self.silver_price_per_oz,
            usd_to_ghs_rate: self.usd_to_ghs_rate,
            measurements,
            total_net_gold_oz: self.total_net_gold_oz,
            total_net_silver_oz: self.total_net_silver_oz,
            total_gold_value_usd: self.total_gold_value_usd,
            total_silver_value_usd: self.total_silver_value_usd,
            total_combined_value_usd: self.total_combined_value_usd,
            total_value_ghs: self.total_value_ghs,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Internal measurement row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct MeasurementRow {
    assay_id: Uuid,
    piece: i32,
    bar_number: String,
    unit: String,
    gross_weight: Option<f64>,
    gold_assay_percent: Option<f64>,
    silver_assay_percent: Option<f64>,
    net_gold_weight: Option<f64>,
    net_silver_weight: Option<f64>,
}

impl MeasurementRow {
    fn into_measurement(self) -> Measurement {
        Measurement {
            piece: u32::try_from(self.piece).unwrap_or(0),
            bar_number: self.bar_number,
            unit: WeightUnit::parse(&self.unit),
            gross_weight: self.gross_weight,
            gold_assay_percent: self.gold_assay_percent,
            silver_assay_percent: self.silver_assay_percent,
            net_gold_weight: self.net_gold_weight,
            net_silver_weight: self.net_silver_weight,
        }
    }
}
