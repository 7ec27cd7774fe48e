//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! `AppState` holds the registry's working set as in-memory stores with
//! optional Postgres write-through:
//!
//! - **Exporters** — the registered business entities
//! - **Job Cards** — per-shipment intake records with aggregate totals
//! - **Assays** — measurement batches with pricing snapshots and totals
//! - **Invoices** — billing documents with the statutory levy breakdown
//! - **Daily Prices** — the commodity price / exchange rate feed
//!
//! Aggregate totals obey one invariant everywhere: a job card's totals are
//! the sum of its assays' totals, which are the sum of their measurements'
//! computed values. [`AppState::recompute_job_card_totals`] is the only
//! code path that writes job-card totals.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use aurex_core::{
    AssayMethod, Currency, ExporterCode, ExporterType, InvoiceNumber, InvoiceStatus,
    JobCardReference, JobCardStatus, WeightUnit,
};
use aurex_valuation::levy::LevyBreakdown;
use aurex_valuation::valuation::{Measurement, PricingSnapshot};

use crate::session::DEFAULT_IDLE_SECS;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// List records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives a `&mut T` and may inspect the current state,
    /// validate preconditions, mutate the record, and return `Ok(R)` or
    /// `Err(E)`. The entire operation runs under a single write lock,
    /// eliminating TOCTOU races between read and update.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    #[allow(dead_code)]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Registry Record Types ----------------------------------------------------

/// A registered exporter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExporterRecord {
    pub id: Uuid,
    pub name: String,
    /// Registry short code, unique across exporters.
    #[schema(value_type = String)]
    pub code: ExporterCode,
    /// Registry classification.
    #[schema(value_type = String)]
    pub exporter_type: ExporterType,
    pub authorized_signatory: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A job card: the per-shipment intake record.
///
/// Aggregate totals are maintained by [`AppState::recompute_job_card_totals`]
/// as the sum of the card's assays. A card with an assay or a paid invoice
/// is frozen — update and delete endpoints reject it with 409.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobCardRecord {
    pub id: Uuid,
    /// Human-readable reference (`JC-YYYY-NNNNNN`).
    #[schema(value_type = String)]
    pub reference: JobCardReference,
    pub exporter_id: Uuid,
    /// Exporter name snapshot for report rows.
    pub exporter_name: String,
    pub received_date: DateTime<Utc>,
    /// Unit the shipment's weights are recorded in (g or kg).
    #[schema(value_type = String)]
    pub unit_of_measure: WeightUnit,
    /// Lifecycle state (see [`JobCardStatus`] transition table).
    #[schema(value_type = String)]
    pub status: JobCardStatus,
    /// Sum of assay gold totals, troy ounces.
    pub total_net_gold_oz: f64,
    /// Sum of assay silver totals, troy ounces.
    pub total_net_silver_oz: f64,
    /// Sum of assay combined values, USD.
    pub total_usd_value: f64,
    /// Sum of assay combined values, GHS.
    pub total_ghs_value: f64,
    /// Number of assays recorded against this card.
    pub assay_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An assay: one laboratory measurement batch with its pricing snapshot
/// and computed totals.
///
/// Created in a single unit of work with its measurements — there is no
/// state in which an assay exists without the measurements it was
/// submitted with. Measurements are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssayRecord {
    pub id: Uuid,
    pub job_card_id: Uuid,
    /// Laboratory method.
    #[schema(value_type = String)]
    pub method: AssayMethod,
    pub date_of_analysis: DateTime<Utc>,
    pub signatory: String,
    pub seal_numbers: Vec<String>,
    /// Gold spot price snapshot, USD per troy ounce.
    pub gold_price_per_oz: f64,
    /// Silver spot price snapshot, USD per troy ounce.
    pub silver_price_per_oz: f64,
    /// Exchange rate snapshot, GHS per USD.
    pub usd_to_ghs_rate: f64,
    /// The measurement batch. Append-only after creation.
    #[schema(value_type = Vec<Object>)]
    pub measurements: Vec<Measurement>,
    pub total_net_gold_oz: f64,
    pub total_net_silver_oz: f64,
    pub total_gold_value_usd: f64,
    pub total_silver_value_usd: f64,
    pub total_combined_value_usd: f64,
    pub total_value_ghs: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssayRecord {
    /// The pricing snapshot this assay was valued against.
    pub fn pricing(&self) -> PricingSnapshot {
        PricingSnapshot {
            gold_price_per_oz: self.gold_price_per_oz,
            silver_price_per_oz: self.silver_price_per_oz,
            usd_to_ghs_rate: self.usd_to_ghs_rate,
        }
    }

    /// Overwrite the computed totals from a fresh valuation.
    pub fn apply_valuation(&mut self, v: &aurex_valuation::valuation::AssayValuation) {
        self.total_net_gold_oz = v.gold.troy_ounces;
        self.total_net_silver_oz = v.silver.troy_ounces;
        self.total_gold_value_usd = v.gold.usd_value;
        self.total_silver_value_usd = v.silver.usd_value;
        self.total_combined_value_usd = v.combined_usd;
        self.total_value_ghs = v.combined_ghs;
    }
}

/// An invoice billing one job card's assay value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceRecord {
    pub id: Uuid,
    /// Human-readable number (`INV-YYYY-NNNNNN`).
    #[schema(value_type = String)]
    pub invoice_number: InvoiceNumber,
    pub job_card_id: Uuid,
    /// Billing currency.
    #[schema(value_type = String)]
    pub currency: Currency,
    /// Assay value snapshot, USD, at issue time.
    pub assay_value_usd: f64,
    /// Assay value snapshot, GHS, at issue time.
    pub assay_value_ghs: f64,
    /// The statutory levy decomposition.
    #[schema(value_type = Object)]
    pub levies: LevyBreakdown,
    /// Settlement state. Paying is one-way and freezes the job card.
    #[schema(value_type = String)]
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One day's commodity prices and exchange rate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyPriceRecord {
    pub id: Uuid,
    pub price_date: NaiveDate,
    /// Gold spot price, USD per troy ounce.
    pub gold_price_per_oz: f64,
    /// Silver spot price, USD per troy ounce.
    pub silver_price_per_oz: f64,
    /// Exchange rate, GHS per USD.
    pub usd_to_ghs_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl DailyPriceRecord {
    /// The pricing snapshot an assay takes from this price row.
    pub fn snapshot(&self) -> PricingSnapshot {
        PricingSnapshot {
            gold_price_per_oz: self.gold_price_per_oz,
            silver_price_per_oz: self.silver_price_per_oz,
            usd_to_ghs_rate: self.usd_to_ghs_rate,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Idle session timeout, seconds.
    pub session_idle_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("session_idle_secs", &self.session_idle_secs)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            session_idle_secs: DEFAULT_IDLE_SECS,
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each `Store`. Document sequence
/// counters are process-wide atomics, hydrated past the highest persisted
/// sequence on startup so restarts never reissue a reference.
#[derive(Debug, Clone)]
pub struct AppState {
    pub exporters: Store<ExporterRecord>,
    pub job_cards: Store<JobCardRecord>,
    pub assays: Store<AssayRecord>,
    pub invoices: Store<InvoiceRecord>,
    pub daily_prices: Store<DailyPriceRecord>,

    /// Last issued job card sequence number.
    job_card_seq: Arc<AtomicU32>,
    /// Last issued invoice sequence number.
    invoice_seq: Arc<AtomicU32>,

    // -- Database persistence (optional) --
    /// PostgreSQL connection pool for durable state persistence.
    /// When `Some`, records are persisted write-through in addition to the
    /// in-memory stores. When `None`, the API operates in-memory only.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with default configuration and no pool.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a new application state with the given configuration and
    /// optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            exporters: Store::new(),
            job_cards: Store::new(),
            assays: Store::new(),
            invoices: Store::new(),
            daily_prices: Store::new(),
            job_card_seq: Arc::new(AtomicU32::new(0)),
            invoice_seq: Arc::new(AtomicU32::new(0)),
            db_pool,
            config,
        }
    }

    /// Allocate the next job card reference.
    pub fn next_job_card_reference(&self) -> JobCardReference {
        let seq = self.job_card_seq.fetch_add(1, Ordering::SeqCst) + 1;
        JobCardReference::new(current_year(), seq)
    }

    /// Allocate the next invoice number.
    pub fn next_invoice_number(&self) -> InvoiceNumber {
        let seq = self.invoice_seq.fetch_add(1, Ordering::SeqCst) + 1;
        InvoiceNumber::new(current_year(), seq)
    }

    /// All assays recorded against a job card.
    pub fn assays_for_job_card(&self, job_card_id: Uuid) -> Vec<AssayRecord> {
        self.assays.filter(|a| a.job_card_id == job_card_id)
    }

    /// The most recent daily price row, if any has been recorded.
    pub fn latest_price(&self) -> Option<DailyPriceRecord> {
        self.daily_prices
            .list()
            .into_iter()
            .max_by_key(|p| (p.price_date, p.created_at))
    }

    /// Why a job card rejects mutation, if it does.
    ///
    /// A card is frozen once it has been valued (any assay exists) or
    /// settled (any paid invoice exists).
    pub fn job_card_freeze_reason(&self, job_card_id: Uuid) -> Option<String> {
        let assay_count = self
            .assays
            .filter(|a| a.job_card_id == job_card_id)
            .len();
        if assay_count > 0 {
            return Some(format!(
                "job card has {assay_count} assay(s) and is immutable once valued"
            ));
        }
        let paid = self
            .invoices
            .filter(|i| i.job_card_id == job_card_id && i.status == InvoiceStatus::Paid)
            .len();
        if paid > 0 {
            return Some("job card has a paid invoice and is immutable".to_string());
        }
        None
    }

    /// Re-derive a job card's aggregate totals from its assays.
    ///
    /// The only writer of job-card totals. Returns the updated record, or
    /// `None` if the card does not exist.
    pub fn recompute_job_card_totals(&self, job_card_id: Uuid) -> Option<JobCardRecord> {
        let assays = self.assays_for_job_card(job_card_id);
        let (gold_oz, silver_oz, usd, ghs) = assays.iter().fold(
            (0.0, 0.0, 0.0, 0.0),
            |(g, s, u, c), a| {
                (
                    g + a.total_net_gold_oz,
                    s + a.total_net_silver_oz,
                    u + a.total_combined_value_usd,
                    c + a.total_value_ghs,
                )
            },
        );
        self.job_cards.update(&job_card_id, |card| {
            card.total_net_gold_oz = gold_oz;
            card.total_net_silver_oz = silver_oz;
            card.total_usd_value = usd;
            card.total_ghs_value = ghs;
            card.assay_count = assays.len();
            card.updated_at = Utc::now();
        })
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available. Also
    /// advances the document sequence counters past the highest persisted
    /// reference so restarts never reissue a number.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let exporters = crate::db::exporters::load_all(pool)
            .await
            .map_err(|e| format!("failed to load exporters: {e}"))?;
        let exporter_count = exporters.len();
        for record in exporters {
            self.exporters.insert(record.id, record);
        }

        let job_cards = crate::db::job_cards::load_all(pool)
            .await
            .map_err(|e| format!("failed to load job cards: {e}"))?;
        let job_card_count = job_cards.len();
        let max_jc_seq = job_cards.iter().map(|c| c.reference.seq()).max().unwrap_or(0);
        self.job_card_seq.fetch_max(max_jc_seq, Ordering::SeqCst);
        for record in job_cards {
            self.job_cards.insert(record.id, record);
        }

        let assays = crate::db::assays::load_all(pool)
            .await
            .map_err(|e| format!("failed to load assays: {e}"))?;
        let assay_count = assays.len();
        for record in assays {
            self.assays.insert(record.id, record);
        }

        let invoices = crate::db::invoices::load_all(pool)
            .await
            .map_err(|e| format!("failed to load invoices: {e}"))?;
        let invoice_count = invoices.len();
        let max_inv_seq = invoices
            .iter()
            .map(|i| i.invoice_number.seq())
            .max()
            .unwrap_or(0);
        self.invoice_seq.fetch_max(max_inv_seq, Ordering::SeqCst);
        for record in invoices {
            self.invoices.insert(record.id, record);
        }

        let prices = crate::db::prices::load_all(pool)
            .await
            .map_err(|e| format!("failed to load daily prices: {e}"))?;
        let price_count = prices.len();
        for record in prices {
            self.daily_prices.insert(record.id, record);
        }

        tracing::info!(
            exporters = exporter_count,
            job_cards = job_card_count,
            assays = assay_count,
            invoices = invoice_count,
            daily_prices = price_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Current calendar year for document references.
fn current_year() -> u16 {
    Utc::now().year() as u16
}
