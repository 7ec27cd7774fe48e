//! # Weight Units & Troy-Ounce Conversion
//!
//! Mass conversion for intake weights. Shipments arrive recorded in grams,
//! kilograms, or (rarely, from legacy paperwork) pounds; all valuation is
//! done in troy ounces.
//!
//! ## The One Constant
//!
//! [`GRAMS_PER_TROY_OUNCE`] is the single troy-ounce definition in the
//! entire workspace. The legacy system carried two slightly different
//! constants in different pages, which made job-card totals disagree with
//! their own assay lines in the fourth decimal place. Every conversion
//! here and downstream goes through this one value.
//!
//! ## Permissive Parsing
//!
//! [`WeightUnit::parse`] never fails: intake paperwork abbreviates units
//! inconsistently, and the observed convention is that an unrecognized or
//! missing unit means grams. Validation of which units a given record type
//! accepts happens at the API layer, not here.

use serde::{Deserialize, Serialize};

/// Grams per kilogram.
pub const GRAMS_PER_KILOGRAM: f64 = 1000.0;

/// Grams per avoirdupois pound.
pub const GRAMS_PER_POUND: f64 = 453.59237;

/// Grams per troy ounce. The single conversion constant for the workspace.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// A unit of mass accepted on intake records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    /// Grams (the default and internal unit).
    Grams,
    /// Kilograms.
    Kilograms,
    /// Avoirdupois pounds.
    Pounds,
}

impl WeightUnit {
    /// Parse a unit tag case-insensitively.
    ///
    /// Accepts the abbreviations and spellings seen on intake paperwork.
    /// Anything unrecognized — including the empty string — is grams.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "kg" | "kilogram" | "kilograms" => Self::Kilograms,
            "lb" | "lbs" | "pound" | "pounds" => Self::Pounds,
            _ => Self::Grams,
        }
    }

    /// Return the canonical short tag for this unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grams => "g",
            Self::Kilograms => "kg",
            Self::Pounds => "lb",
        }
    }

    /// Conversion factor from this unit to grams.
    pub fn grams_factor(&self) -> f64 {
        match self {
            Self::Grams => 1.0,
            Self::Kilograms => GRAMS_PER_KILOGRAM,
            Self::Pounds => GRAMS_PER_POUND,
        }
    }
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a magnitude in the given unit to grams.
///
/// Pure arithmetic: zero and negative magnitudes pass through unchanged.
/// Negative-weight rejection is an intake validation concern.
pub fn to_grams(value: f64, unit: WeightUnit) -> f64 {
    value * unit.grams_factor()
}

/// Convert grams to troy ounces via [`GRAMS_PER_TROY_OUNCE`].
pub fn grams_to_troy_ounces(grams: f64) -> f64 {
    grams / GRAMS_PER_TROY_OUNCE
}

/// Convert troy ounces back to grams via [`GRAMS_PER_TROY_OUNCE`].
pub fn troy_ounces_to_grams(ounces: f64) -> f64 {
    ounces * GRAMS_PER_TROY_OUNCE
}
