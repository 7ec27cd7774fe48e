//! # Error Hierarchy
//!
//! Structured validation errors for domain primitives, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Each variant carries the invalid input and the expected format so that
//! operators can diagnose bad intake data without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes and status parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Exporter code does not conform to the registry format.
    #[error("invalid exporter code: \"{0}\" (expected 2-12 uppercase alphanumeric characters or dashes)")]
    InvalidExporterCode(String),

    /// Job card reference does not conform to the `JC-<year>-<seq>` format.
    #[error("invalid job card reference: \"{0}\" (expected JC-YYYY-NNNNNN)")]
    InvalidJobCardReference(String),

    /// Invoice number does not conform to the `INV-<year>-<seq>` format.
    #[error("invalid invoice number: \"{0}\" (expected INV-YYYY-NNNNNN)")]
    InvalidInvoiceNumber(String),

    /// A status or enum-like field received a value outside its closed set.
    #[error("invalid {field}: \"{value}\" (expected one of: {expected})")]
    InvalidStatus {
        /// Name of the field being parsed.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Comma-separated list of accepted values.
        expected: &'static str,
    },

    /// A percentage field is outside the 0-100 range.
    #[error("invalid {field}: {value} (expected a percentage between 0 and 100)")]
    PercentageOutOfRange {
        /// Name of the field being validated.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A weight or monetary magnitude is negative.
    #[error("invalid {field}: {value} (must not be negative)")]
    NegativeMagnitude {
        /// Name of the field being validated.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A required text field is empty or whitespace.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_exporter_code_display() {
        let err = ValidationError::InvalidExporterCode("x".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("invalid exporter code"));
        assert!(msg.contains("\"x\""));
    }

    #[test]
    fn invalid_job_card_reference_display() {
        let err = ValidationError::InvalidJobCardReference("JC-BAD".to_string());
        assert!(format!("{err}").contains("JC-YYYY-NNNNNN"));
    }

    #[test]
    fn invalid_status_display() {
        let err = ValidationError::InvalidStatus {
            field: "status",
            value: "shipped".to_string(),
            expected: "pending, in_progress, completed, paid, rejected",
        };
        let msg = format!("{err}");
        assert!(msg.contains("shipped"));
        assert!(msg.contains("in_progress"));
    }

    #[test]
    fn percentage_out_of_range_display() {
        let err = ValidationError::PercentageOutOfRange {
            field: "gold_assay_percent",
            value: 130.0,
        };
        let msg = format!("{err}");
        assert!(msg.contains("gold_assay_percent"));
        assert!(msg.contains("130"));
    }

    #[test]
    fn negative_magnitude_display() {
        let err = ValidationError::NegativeMagnitude {
            field: "gross_weight",
            value: -4.2,
        };
        assert!(format!("{err}").contains("must not be negative"));
    }

    #[test]
    fn empty_field_display() {
        let err = ValidationError::EmptyField("signatory");
        assert_eq!(format!("{err}"), "signatory must not be empty");
    }
}
