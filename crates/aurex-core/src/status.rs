//! # Lifecycle Status Enums
//!
//! Closed enums for every lifecycle state in the stack, replacing the
//! free-form status strings that plagued the legacy implementation.
//! Serialization uses `snake_case` to match the API contract.
//!
//! [`JobCardStatus`] carries an explicit transition table: a job card can
//! only move forward through intake → assay → invoicing → payment, or be
//! rejected before it has been valued.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle state of a job card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCardStatus {
    /// Intake recorded, no assay yet.
    Pending,
    /// At least one assay has been recorded.
    InProgress,
    /// An invoice has been issued against the valuation.
    Completed,
    /// The invoice has been settled.
    Paid,
    /// Withdrawn or refused before valuation.
    Rejected,
}

impl JobCardStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a status string, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "paid" => Ok(Self::Paid),
            "rejected" => Ok(Self::Rejected),
            other => Err(ValidationError::InvalidStatus {
                field: "status",
                value: other.to_string(),
                expected: "pending, in_progress, completed, paid, rejected",
            }),
        }
    }

    /// Whether a transition from `self` to `to` is permitted.
    ///
    /// Forward-only: `pending → in_progress → completed → paid`.
    /// `rejected` is reachable only before the card is valued, and
    /// terminal states admit no further transitions.
    pub fn can_transition_to(&self, to: JobCardStatus) -> bool {
        use JobCardStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Rejected)
                | (InProgress, Completed)
                | (Completed, Paid)
        )
    }

    /// Whether this state is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Rejected)
    }
}

impl std::fmt::Display for JobCardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued, awaiting settlement.
    Pending,
    /// Settled. Paid invoices freeze their job card.
    Paid,
}

impl InvoiceStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Parse a status string, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(ValidationError::InvalidStatus {
                field: "invoice status",
                value: other.to_string(),
                expected: "pending, paid",
            }),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Laboratory method used for an assay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssayMethod {
    /// X-ray fluorescence analysis.
    XRay,
    /// Water density (Archimedes) analysis.
    WaterDensity,
}

impl AssayMethod {
    /// Return the string representation of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XRay => "x_ray",
            Self::WaterDensity => "water_density",
        }
    }

    /// Parse a method string, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "x_ray" => Ok(Self::XRay),
            "water_density" => Ok(Self::WaterDensity),
            other => Err(ValidationError::InvalidStatus {
                field: "assay method",
                value: other.to_string(),
                expected: "x_ray, water_density",
            }),
        }
    }
}

impl std::fmt::Display for AssayMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry classification of an exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExporterType {
    /// Licensed small-scale operator.
    SmallScale,
    /// Licensed large-scale operator.
    LargeScale,
    /// Gold-only license.
    Gold,
    /// Any other registered classification.
    Other,
}

impl ExporterType {
    /// Return the string representation of this classification.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmallScale => "small_scale",
            Self::LargeScale => "large_scale",
            Self::Gold => "gold",
            Self::Other => "other",
        }
    }

    /// Parse a classification string, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "small_scale" => Ok(Self::SmallScale),
            "large_scale" => Ok(Self::LargeScale),
            "gold" => Ok(Self::Gold),
            "other" => Ok(Self::Other),
            value => Err(ValidationError::InvalidStatus {
                field: "exporter type",
                value: value.to_string(),
                expected: "small_scale, large_scale, gold, other",
            }),
        }
    }
}

impl std::fmt::Display for ExporterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_card_status_parse_roundtrip() {
        for s in ["pending", "in_progress", "completed", "paid", "rejected"] {
            let status = JobCardStatus::parse(s).unwrap();
            assert_eq!(status.as_str(), s);
        }
    }

    #[test]
    fn job_card_status_rejects_unknown() {
        let err = JobCardStatus::parse("shipped").unwrap_err();
        assert!(format!("{err}").contains("shipped"));
    }

    #[test]
    fn job_card_forward_transitions_allowed() {
        use JobCardStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Rejected));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Paid));
    }

    #[test]
    fn job_card_backward_transitions_rejected() {
        use JobCardStatus::*;
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Paid.can_transition_to(Completed));
    }

    #[test]
    fn job_card_rejection_only_before_valuation() {
        use JobCardStatus::*;
        assert!(!InProgress.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(Rejected));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use JobCardStatus::*;
        for to in [Pending, InProgress, Completed, Paid, Rejected] {
            assert!(!Paid.can_transition_to(to));
            assert!(!Rejected.can_transition_to(to));
        }
        assert!(Paid.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn invoice_status_parse() {
        assert_eq!(InvoiceStatus::parse("pending").unwrap(), InvoiceStatus::Pending);
        assert_eq!(InvoiceStatus::parse("paid").unwrap(), InvoiceStatus::Paid);
        assert!(InvoiceStatus::parse("void").is_err());
    }

    #[test]
    fn assay_method_parse() {
        assert_eq!(AssayMethod::parse("x_ray").unwrap(), AssayMethod::XRay);
        assert_eq!(
            AssayMethod::parse("water_density").unwrap(),
            AssayMethod::WaterDensity
        );
        assert!(AssayMethod::parse("fire_assay").is_err());
    }

    #[test]
    fn exporter_type_parse() {
        assert_eq!(
            ExporterType::parse("large_scale").unwrap(),
            ExporterType::LargeScale
        );
        assert!(ExporterType::parse("medium").is_err());
    }

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobCardStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&AssayMethod::WaterDensity).unwrap(),
            "\"water_density\""
        );
    }
}
