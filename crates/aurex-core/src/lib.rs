#![deny(missing_docs)]

//! # aurex-core — Foundational Types for the Aurex Back Office
//!
//! This crate defines the foundational types that every other crate in the
//! workspace depends on. It has no internal crate dependencies — only `serde`,
//! `serde_json`, `thiserror`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a distinct
//!    type. You cannot pass an [`AssayId`] where a [`JobCardId`] is expected,
//!    and human-readable references ([`JobCardReference`], [`InvoiceNumber`],
//!    [`ExporterCode`]) validate their format at construction time.
//!
//! 2. **One conversion constant.** Every troy-ounce computation in the entire
//!    stack flows through [`units::GRAMS_PER_TROY_OUNCE`]. There is exactly one
//!    definition; report code and valuation code cannot diverge.
//!
//! 3. **Status enums, not status strings.** Lifecycle states ([`JobCardStatus`],
//!    [`InvoiceStatus`]) are closed enums with explicit transition tables, so a
//!    defective string can never be persisted.
//!
//! 4. **[`ValidationError`] hierarchy.** Structured errors with `thiserror` — no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod currency;
pub mod error;
pub mod identity;
pub mod status;
pub mod units;

// Re-export primary types at crate root for ergonomic imports.
pub use currency::{format_amount, round2, usd_to_ghs, Currency};
pub use error::ValidationError;
pub use identity::{
    AssayId, ExporterCode, ExporterId, InvoiceId, InvoiceNumber, JobCardId, JobCardReference,
};
pub use status::{AssayMethod, ExporterType, InvoiceStatus, JobCardStatus};
pub use units::{grams_to_troy_ounces, to_grams, troy_ounces_to_grams, WeightUnit};
