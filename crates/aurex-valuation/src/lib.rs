#![deny(missing_docs)]

//! # aurex-valuation — Valuation & Levy Engines
//!
//! Turns physical measurements into money, deterministically.
//!
//! The legacy system reimplemented these formulas in report routes,
//! dashboard components, and print pages, with constants that disagreed
//! between pages. This crate is the consolidation: one valuation path,
//! one levy chain, both pure functions of their inputs.
//!
//! ## Pipeline
//!
//! ```text
//! Vec<Measurement> + PricingSnapshot
//!   → value_measurements()  → AssayValuation   (per-metal grams/oz/USD/GHS)
//!   → sum over assays       → job-card totals
//!   → levy::assess()        → LevyBreakdown    (NHIL/GETFund/COVID/VAT)
//! ```
//!
//! ## Determinism
//!
//! Given identical inputs, both engines always produce identical outputs.
//! There is no internal state, no clock, and no I/O. This property is what
//! lets the API layer recompute assay totals from measurements at any time
//! and assert they still match what was persisted.

pub mod levy;
pub mod valuation;

pub use levy::{assess, LevyBreakdown, COVID_RATE, GETFUND_RATE, NHIL_RATE, VAT_RATE};
pub use valuation::{
    sum_valuations, value_measurements, AssayValuation, Measurement, Metal, MetalValuation,
    PricingSnapshot,
};
