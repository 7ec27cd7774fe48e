//! # HTTP Route Modules
//!
//! One module per aggregate, each exposing a `router()` that the
//! application assembler merges. Handlers follow the same shape
//! everywhere: extract + validate the body, check authorization, mutate
//! the in-memory store, write through to Postgres when a pool is
//! configured.

pub mod assays;
pub mod exporters;
pub mod invoices;
pub mod job_cards;
pub mod prices;
pub mod reports;
