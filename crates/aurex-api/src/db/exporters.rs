//! Exporter persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `exporters` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use aurex_core::{ExporterCode, ExporterType};

use crate::db::decode_error;
use crate::state::ExporterRecord;

/// Insert a new exporter record.
pub async fn insert(pool: &PgPool, record: &ExporterRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exporters (id, name, code, exporter_type, authorized_signatory,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(record.code.as_str())
    .bind(record.exporter_type.as_str())
    .bind(&record.authorized_signatory)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update an exporter's mutable fields.
pub async fn update(pool: &PgPool, record: &ExporterRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exporters SET name = $2, authorized_signatory = $3, updated_at = $4
         WHERE id = $1",
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(&record.authorized_signatory)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all exporters into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ExporterRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExporterRow>(
        "SELECT id, name, code, exporter_type, authorized_signatory, created_at, updated_at
         FROM exporters ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ExporterRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ExporterRow {
    id: Uuid,
    name: String,
    code: String,
    exporter_type: String,
    authorized_signatory: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExporterRow {
    fn into_record(self) -> Result<ExporterRecord, sqlx::Error> {
        let code = ExporterCode::new(self.code.as_str()).map_err(decode_error)?;
        let exporter_type = ExporterType::parse(&self.exporter_type).map_err(decode_error)?;
        Ok(ExporterRecord {
            id: self.id,
            name: self.name,
            code,
            exporter_type,
            authorized_signatory: self.authorized_signatory,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
