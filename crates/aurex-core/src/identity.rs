//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the Aurex stack.
//! Each identifier is a distinct type — you cannot pass an [`ExporterId`]
//! where a [`JobCardId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`ExporterCode`], [`JobCardReference`],
//! [`InvoiceNumber`]) validate format at construction time. UUID-based
//! identifiers are always valid by construction.
//!
//! Human-readable references follow the registry's document numbering:
//! `JC-2026-000042` for job cards, `INV-2026-000007` for invoices. The
//! numeric suffix is a zero-padded sequence allocated per deployment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// A unique identifier for a registered exporter.
    ExporterId
}

uuid_id! {
    /// A unique identifier for a job card (per-shipment intake record).
    JobCardId
}

uuid_id! {
    /// A unique identifier for an assay (laboratory measurement batch).
    AssayId
}

uuid_id! {
    /// A unique identifier for an invoice.
    InvoiceId
}

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// A registered exporter's short code (e.g., `GXL-01`).
///
/// 2-12 characters, uppercase alphanumeric plus dashes. Lowercase input
/// is normalized to uppercase before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExporterCode(String);

impl ExporterCode {
    /// Create a validated exporter code, normalizing to uppercase.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let raw: String = code.into();
        let normalized = raw.trim().to_uppercase();
        let valid_len = (2..=12).contains(&normalized.len());
        let valid_chars = normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid_len || !valid_chars || normalized.is_empty() {
            return Err(ValidationError::InvalidExporterCode(raw));
        }
        Ok(Self(normalized))
    }

    /// Return the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExporterCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a `PREFIX-YYYY-NNNNNN` document reference, returning `(year, seq)`.
fn parse_reference(prefix: &str, s: &str) -> Option<(u16, u32)> {
    let rest = s.strip_prefix(prefix)?.strip_prefix('-')?;
    let (year_str, seq_str) = rest.split_once('-')?;
    if year_str.len() != 4 || seq_str.len() != 6 {
        return None;
    }
    let year = year_str.parse::<u16>().ok()?;
    let seq = seq_str.parse::<u32>().ok()?;
    Some((year, seq))
}

/// A human-readable job card reference in the form `JC-YYYY-NNNNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobCardReference(String);

impl JobCardReference {
    /// Build a reference from a year and an allocated sequence number.
    pub fn new(year: u16, seq: u32) -> Self {
        Self(format!("JC-{year:04}-{seq:06}"))
    }

    /// Parse and validate an existing reference string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match parse_reference("JC", s) {
            Some(_) => Ok(Self(s.to_string())),
            None => Err(ValidationError::InvalidJobCardReference(s.to_string())),
        }
    }

    /// Return the sequence number encoded in the reference.
    pub fn seq(&self) -> u32 {
        // The constructor and parser guarantee the format.
        parse_reference("JC", &self.0).map(|(_, seq)| seq).unwrap_or(0)
    }

    /// Return the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobCardReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A human-readable invoice number in the form `INV-YYYY-NNNNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Build an invoice number from a year and an allocated sequence number.
    pub fn new(year: u16, seq: u32) -> Self {
        Self(format!("INV-{year:04}-{seq:06}"))
    }

    /// Parse and validate an existing invoice number string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match parse_reference("INV", s) {
            Some(_) => Ok(Self(s.to_string())),
            None => Err(ValidationError::InvalidInvoiceNumber(s.to_string())),
        }
    }

    /// Return the sequence number encoded in the invoice number.
    pub fn seq(&self) -> u32 {
        parse_reference("INV", &self.0).map(|(_, seq)| seq).unwrap_or(0)
    }

    /// Return the invoice number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_distinct_types_and_unique() {
        let a = JobCardId::new();
        let b = JobCardId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn uuid_id_display_matches_uuid() {
        let raw = Uuid::new_v4();
        let id = AssayId::from_uuid(raw);
        assert_eq!(id.to_string(), raw.to_string());
    }

    #[test]
    fn exporter_code_normalizes_to_uppercase() {
        let code = ExporterCode::new("gxl-01").unwrap();
        assert_eq!(code.as_str(), "GXL-01");
    }

    #[test]
    fn exporter_code_rejects_too_short() {
        assert!(ExporterCode::new("a").is_err());
    }

    #[test]
    fn exporter_code_rejects_too_long() {
        assert!(ExporterCode::new("ABCDEFGHIJKLM").is_err());
    }

    #[test]
    fn exporter_code_rejects_punctuation() {
        assert!(ExporterCode::new("AB_01").is_err());
        assert!(ExporterCode::new("AB 01").is_err());
    }

    #[test]
    fn job_card_reference_roundtrip() {
        let reference = JobCardReference::new(2026, 42);
        assert_eq!(reference.as_str(), "JC-2026-000042");
        assert_eq!(reference.seq(), 42);

        let parsed = JobCardReference::parse("JC-2026-000042").unwrap();
        assert_eq!(parsed, reference);
    }

    #[test]
    fn job_card_reference_rejects_malformed() {
        assert!(JobCardReference::parse("JC-26-000042").is_err());
        assert!(JobCardReference::parse("JC-2026-42").is_err());
        assert!(JobCardReference::parse("INV-2026-000042").is_err());
        assert!(JobCardReference::parse("JC2026000042").is_err());
    }

    #[test]
    fn invoice_number_roundtrip() {
        let number = InvoiceNumber::new(2026, 7);
        assert_eq!(number.as_str(), "INV-2026-000007");
        assert_eq!(number.seq(), 7);
        assert!(InvoiceNumber::parse("INV-2026-000007").is_ok());
    }

    #[test]
    fn invoice_number_rejects_job_card_prefix() {
        assert!(InvoiceNumber::parse("JC-2026-000007").is_err());
    }

    #[test]
    fn references_serialize_transparently() {
        let reference = JobCardReference::new(2026, 1);
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, "\"JC-2026-000001\"");
    }
}
