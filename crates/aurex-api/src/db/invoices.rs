//! Invoice persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `invoices` table.
//! The levy breakdown is stored flattened into columns so the finance
//! desk can query individual charges directly.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use aurex_core::{Currency, InvoiceNumber, InvoiceStatus};
use aurex_valuation::levy::LevyBreakdown;

use crate::db::decode_error;
use crate::state::InvoiceRecord;

/// Insert a new invoice record.
pub async fn insert(pool: &PgPool, record: &InvoiceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO invoices (id, invoice_number, job_card_id, currency,
         assay_value_usd, assay_value_ghs, rate_percent, total_exclusive, nhil,
         getfund, covid, sub_total, vat, grand_total, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(record.id)
    .bind(record.invoice_number.as_str())
    .bind(record.job_card_id)
    .bind(record.currency.as_str())
    .bind(record.assay_value_usd)
    .bind(record.assay_value_ghs)
    .bind(record.levies.rate_percent)
    .bind(record.levies.total_exclusive)
    .bind(record.levies.nhil)
    .bind(record.levies.getfund)
    .bind(record.levies.covid)
    .bind(record.levies.sub_total)
    .bind(record.levies.vat)
    .bind(record.levies.grand_total)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark an invoice as paid.
pub async fn mark_paid(pool: &PgPool, id: Uuid, updated_at: DateTime<Utc>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE invoices SET status = 'paid', updated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(updated_at)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all invoices into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<InvoiceRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, InvoiceRow>(
        "SELECT id, invoice_number, job_card_id, currency, assay_value_usd, assay_value_ghs,
         rate_percent, total_exclusive, nhil, getfund, covid, sub_total, vat, grand_total,
         status, created_at, updated_at
         FROM invoices ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(InvoiceRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: String,
    job_card_id: Uuid,
    currency: String,
    assay_value_usd: f64,
    assay_value_ghs: f64,
    rate_percent: f64,
    total_exclusive: f64,
    nhil: f64,
    getfund: f64,
    covid: f64,
    sub_total: f64,
    vat: f64,
    grand_total: f64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_record(self) -> Result<InvoiceRecord, sqlx::Error> {
        let invoice_number = InvoiceNumber::parse(&self.invoice_number).map_err(decode_error)?;
        let currency = Currency::parse(&self.currency).map_err(decode_error)?;
        let status = InvoiceStatus::parse(&self.status).map_err(decode_error)?;
        Ok(InvoiceRecord {
            id: self.id,
            invoice_number,
            job_card_id: self.job_card_id,
            currency,
            assay_value_usd: self.assay_value_usd,
            assay_value_ghs: self.assay_value_ghs,
            levies: LevyBreakdown {
                rate_percent: self.rate_percent,
                total_exclusive: self.total_exclusive,
                nhil: self.nhil,
                getfund: self.getfund,
                covid: self.covid,
                sub_total: self.sub_total,
                vat: self.vat,
                grand_total: self.grand_total,
            },
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
