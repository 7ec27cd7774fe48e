//! # Currency Types & Conversion
//!
//! USD/GHS conversion and display rounding. Valuation happens in USD per
//! troy ounce; statutory levies and invoicing happen in Ghana cedis via
//! the exchange rate snapshotted on the assay.
//!
//! Amounts stay full-precision `f64` through every intermediate
//! computation; [`round2`] and [`format_amount`] exist for the display
//! edge only. Rounding inside the levy chain would compound across the
//! four statutory charges.

use serde::{Deserialize, Serialize};

/// Currencies handled by the invoicing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// United States dollar.
    Usd,
    /// Ghana cedi.
    Ghs,
}

impl Currency {
    /// Return the ISO 4217 code for this currency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Ghs => "GHS",
        }
    }

    /// Parse an ISO 4217 code case-insensitively.
    pub fn parse(code: &str) -> Result<Self, crate::error::ValidationError> {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "GHS" => Ok(Self::Ghs),
            other => Err(crate::error::ValidationError::InvalidStatus {
                field: "currency",
                value: other.to_string(),
                expected: "USD, GHS",
            }),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a USD amount to GHS at the given exchange rate.
///
/// Pure multiplication. The rate is whatever was snapshotted on the assay;
/// sanity-checking rates is a daily-price intake concern.
pub fn usd_to_ghs(usd: f64, exchange_rate: f64) -> f64 {
    usd * exchange_rate
}

/// Round to 2 decimal places. Display edge only.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format an amount with exactly 2 decimal places for documents and CSV.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_parse_case_insensitive() {
        assert_eq!(Currency::parse("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::parse(" GHS ").unwrap(), Currency::Ghs);
        assert!(Currency::parse("EUR").is_err());
    }

    #[test]
    fn currency_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Currency::Ghs).unwrap(), "\"GHS\"");
    }

    #[test]
    fn usd_to_ghs_multiplies() {
        assert_eq!(usd_to_ghs(100.0, 12.0), 1200.0);
        assert_eq!(usd_to_ghs(0.0, 12.0), 0.0);
    }

    #[test]
    fn round2_two_places() {
        assert_eq!(round2(1.006), 1.01);
        assert_eq!(round2(1.004), 1.0);
        assert_eq!(round2(1219.0), 1219.0);
    }

    #[test]
    fn format_amount_two_places() {
        assert_eq!(format_amount(1219.0), "1219.00");
        assert_eq!(format_amount(70982.4), "70982.40");
        assert_eq!(format_amount(0.125), "0.12");
    }
}
