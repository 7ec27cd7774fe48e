//! # Valuation Engine
//!
//! Computes the monetary value of a set of physical measurements against a
//! pricing snapshot. Gold and silver are valued identically and
//! independently, then combined.
//!
//! ## Net Weight Policy
//!
//! A measurement may carry a stored net weight (entered by the assayer) or
//! only a gross weight plus fineness percentage. The stored value wins when
//! present; otherwise net weight is `gross × percent / 100`. Records with
//! neither contribute zero — intake data is messy and a half-filled row
//! must not poison an entire assay.
//!
//! ## Units
//!
//! Each measurement carries its own [`WeightUnit`] (inherited from the job
//! card at the API layer). Net weights are summed per unit and normalized
//! to grams before the single troy-ounce division, so mixed-unit batches
//! cannot double-convert.

use serde::{Deserialize, Serialize};

use aurex_core::units::{grams_to_troy_ounces, to_grams, WeightUnit};
use aurex_core::currency::usd_to_ghs;

/// The two metals valued by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metal {
    /// Gold.
    Gold,
    /// Silver.
    Silver,
}

impl Metal {
    /// Return the string representation of this metal.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
        }
    }
}

impl std::fmt::Display for Metal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical piece or sample in an assay batch.
///
/// Immutable once recorded. Optional fields model the half-filled rows the
/// intake surface actually produces; the engine treats absent numbers as
/// zero contribution rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// 1-based piece index within the batch.
    pub piece: u32,
    /// Physical bar or seal marking.
    pub bar_number: String,
    /// Unit the weights on this row were recorded in.
    pub unit: WeightUnit,
    /// Gross weight of the piece, in `unit`.
    pub gross_weight: Option<f64>,
    /// Gold fineness as a percentage (0-100).
    pub gold_assay_percent: Option<f64>,
    /// Silver fineness as a percentage (0-100).
    pub silver_assay_percent: Option<f64>,
    /// Assayer-entered net gold weight, in `unit`. Wins over recomputation.
    pub net_gold_weight: Option<f64>,
    /// Assayer-entered net silver weight, in `unit`. Wins over recomputation.
    pub net_silver_weight: Option<f64>,
}

impl Measurement {
    /// Net weight of the given metal for this measurement, in the row's unit.
    ///
    /// Stored net weight when present, otherwise `gross × percent / 100`,
    /// otherwise zero.
    pub fn net_weight(&self, metal: Metal) -> f64 {
        let (stored, percent) = match metal {
            Metal::Gold => (self.net_gold_weight, self.gold_assay_percent),
            Metal::Silver => (self.net_silver_weight, self.silver_assay_percent),
        };
        if let Some(net) = stored {
            return net;
        }
        match (self.gross_weight, percent) {
            (Some(gross), Some(pct)) => gross * (pct / 100.0),
            _ => 0.0,
        }
    }

    /// Net weight of the given metal normalized to grams.
    pub fn net_weight_grams(&self, metal: Metal) -> f64 {
        to_grams(self.net_weight(metal), self.unit)
    }
}

/// Commodity prices and exchange rate in force for one assay.
///
/// Snapshotted onto the assay at creation so that revaluing history never
/// silently shifts with the daily price feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    /// Gold spot price, USD per troy ounce.
    pub gold_price_per_oz: f64,
    /// Silver spot price, USD per troy ounce.
    pub silver_price_per_oz: f64,
    /// Exchange rate, GHS per USD.
    pub usd_to_ghs_rate: f64,
}

impl PricingSnapshot {
    /// Price per troy ounce for the given metal.
    pub fn price_per_oz(&self, metal: Metal) -> f64 {
        match metal {
            Metal::Gold => self.gold_price_per_oz,
            Metal::Silver => self.silver_price_per_oz,
        }
    }
}

/// Valuation of a single metal across a measurement batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MetalValuation {
    /// Summed net weight, grams.
    pub net_weight_grams: f64,
    /// Summed net weight, troy ounces.
    pub troy_ounces: f64,
    /// Value in USD at the snapshot price.
    pub usd_value: f64,
    /// Value in GHS at the snapshot exchange rate.
    pub ghs_value: f64,
}

impl MetalValuation {
    /// Component-wise sum of two valuations.
    pub fn plus(&self, other: &MetalValuation) -> MetalValuation {
        MetalValuation {
            net_weight_grams: self.net_weight_grams + other.net_weight_grams,
            troy_ounces: self.troy_ounces + other.troy_ounces,
            usd_value: self.usd_value + other.usd_value,
            ghs_value: self.ghs_value + other.ghs_value,
        }
    }
}

/// Combined valuation of one assay batch: gold, silver, and totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AssayValuation {
    /// Gold valuation.
    pub gold: MetalValuation,
    /// Silver valuation.
    pub silver: MetalValuation,
    /// Gold + silver value in USD.
    pub combined_usd: f64,
    /// Gold + silver value in GHS.
    pub combined_ghs: f64,
}

impl AssayValuation {
    /// Component-wise sum of two valuations (job-card aggregation).
    pub fn plus(&self, other: &AssayValuation) -> AssayValuation {
        AssayValuation {
            gold: self.gold.plus(&other.gold),
            silver: self.silver.plus(&other.silver),
            combined_usd: self.combined_usd + other.combined_usd,
            combined_ghs: self.combined_ghs + other.combined_ghs,
        }
    }
}

/// Value one metal across a measurement batch.
fn value_metal(measurements: &[Measurement], metal: Metal, pricing: &PricingSnapshot) -> MetalValuation {
    let net_weight_grams: f64 = measurements
        .iter()
        .map(|m| m.net_weight_grams(metal))
        .sum();
    let troy_ounces = grams_to_troy_ounces(net_weight_grams);
    let usd_value = troy_ounces * pricing.price_per_oz(metal);
    let ghs_value = usd_to_ghs(usd_value, pricing.usd_to_ghs_rate);
    MetalValuation {
        net_weight_grams,
        troy_ounces,
        usd_value,
        ghs_value,
    }
}

/// Value a measurement batch against a pricing snapshot.
///
/// An empty batch yields an all-zero valuation; there is no error path.
pub fn value_measurements(measurements: &[Measurement], pricing: &PricingSnapshot) -> AssayValuation {
    let gold = value_metal(measurements, Metal::Gold, pricing);
    let silver = value_metal(measurements, Metal::Silver, pricing);
    AssayValuation {
        combined_usd: gold.usd_value + silver.usd_value,
        combined_ghs: gold.ghs_value + silver.ghs_value,
        gold,
        silver,
    }
}

/// Sum assay valuations onto a job-card total.
///
/// Most job cards have exactly one assay; the sum is defined for the rare
/// multi-assay card so that the card's totals are always the sum of its
/// assays' totals, which are in turn the sum of their measurements.
pub fn sum_valuations<'a>(valuations: impl IntoIterator<Item = &'a AssayValuation>) -> AssayValuation {
    valuations
        .into_iter()
        .fold(AssayValuation::default(), |acc, v| acc.plus(v))
}
