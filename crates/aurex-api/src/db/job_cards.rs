//! Job card persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `job_cards` table.
//! Status strings are parsed back through [`JobCardStatus::parse`] on
//! load — a malformed stored status is a decode error, never a silent
//! default that would resurrect the defective-string problem.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use aurex_core::{JobCardReference, JobCardStatus, WeightUnit};

use crate::db::decode_error;
use crate::state::JobCardRecord;

/// Insert a new job card record.
pub async fn insert(pool: &PgPool, record: &JobCardRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO job_cards (id, reference, exporter_id, exporter_name, received_date,
         unit_of_measure, status, total_net_gold_oz, total_net_silver_oz,
         total_usd_value, total_ghs_value, assay_count, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(record.id)
    .bind(record.reference.as_str())
    .bind(record.exporter_id)
    .bind(&record.exporter_name)
    .bind(record.received_date)
    .bind(record.unit_of_measure.as_str())
    .bind(record.status.as_str())
    .bind(record.total_net_gold_oz)
    .bind(record.total_net_silver_oz)
    .bind(record.total_usd_value)
    .bind(record.total_ghs_value)
    .bind(assay_count_i32(record.assay_count))
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update a job card's mutable fields and aggregate totals.
pub async fn update(pool: &PgPool, record: &JobCardRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE job_cards SET received_date = $2, unit_of_measure = $3, status = $4,
         total_net_gold_oz = $5, total_net_silver_oz = $6, total_usd_value = $7,
         total_ghs_value = $8, assay_count = $9, updated_at = $10
         WHERE id = $1",
    )
    .bind(record.id)
    .bind(record.received_date)
    .bind(record.unit_of_measure.as_str())
    .bind(record.status.as_str())
    .bind(record.total_net_gold_oz)
    .bind(record.total_net_silver_oz)
    .bind(record.total_usd_value)
    .bind(record.total_ghs_value)
    .bind(assay_count_i32(record.assay_count))
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a job card. The caller has already verified the card is not frozen.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM job_cards WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all job cards into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<JobCardRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobCardRow>(
        "SELECT id, reference, exporter_id, exporter_name, received_date, unit_of_measure,
         status, total_net_gold_oz, total_net_silver_oz, total_usd_value, total_ghs_value,
         assay_count, created_at, updated_at
         FROM job_cards ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(JobCardRow::into_record).collect()
}

fn assay_count_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or_else(|_| {
        tracing::error!(
            assay_count = count,
            "assay_count exceeds i32::MAX — clamping for DB storage"
        );
        i32::MAX
    })
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct JobCardRow {
    id: Uuid,
    reference: String,
    exporter_id: Uuid,
    exporter_name: String,
    received_date: DateTime<Utc>,
    unit_of_measure: String,
    status: String,
    total_net_gold_oz: f64,
    total_net_silver_oz: f64,
    total_usd_value: f64,
    total_ghs_value: f64,
    assay_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobCardRow {
    fn into_record(self) -> Result<JobCardRecord, sqlx::Error> {
        let reference = JobCardReference::parse(&self.reference).map_err(decode_error)?;
        let status = JobCardStatus::parse(&self.status).map_err(decode_error)?;
        Ok(JobCardRecord {
            id: self.id,
            reference,
            exporter_id: self.exporter_id,
            exporter_name: self.exporter_name,
            received_date: self.received_date,
            unit_of_measure: WeightUnit::parse(&self.unit_of_measure),
            status,
            total_net_gold_oz: self.total_net_gold_oz,
            total_net_silver_oz: self.total_net_silver_oz,
            total_usd_value: self.total_usd_value,
            total_ghs_value: self.total_ghs_value,
            assay_count: usize::try_from(self.assay_count).unwrap_or(0),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
