#![deny(missing_docs)]

//! # aurex-reporting — Revenue Aggregation & Export Rendering
//!
//! Groups valued job cards by exporter or time period and renders the
//! results for the three consumers the back office actually has: the
//! dashboard (JSON), spreadsheet exports (CSV), and print-to-PDF (HTML).
//!
//! The aggregation functions take `now` as a parameter rather than reading
//! the wall clock, so period filtering is deterministic and testable.
//! Rendering never re-derives values — it formats what the valuation and
//! levy engines already computed.

pub mod csv;
pub mod html;
pub mod revenue;

pub use csv::{csv_escape, render_revenue_detail_csv, render_revenue_summary_csv};
pub use html::{render_invoice_document, render_revenue_document, InvoiceDocument};
pub use revenue::{
    aggregate_by_exporter, filter_by_period, ExporterSummary, ReportMode, ReportPeriod,
    RevenueRecord, UNKNOWN_EXPORTER,
};
