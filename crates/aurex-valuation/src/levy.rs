//! # Statutory Levy Chain
//!
//! Converts a GHS assay value into a grand total inclusive of the four
//! statutory charges applied to the regulator's service fee:
//!
//! 1. The service fee base: `total_exclusive = assay_value × rate / 100`,
//!    where `rate` is the percentage retained by the regulator.
//! 2. NHIL (National Health Insurance Levy) at 2.5% of the exclusive total.
//! 3. GETFund (Ghana Education Trust Fund) at 2.5% of the exclusive total.
//! 4. COVID-19 Health Recovery Levy at 1% of the exclusive total.
//! 5. VAT at 15% of the levy-inclusive subtotal.
//!
//! The three flat levies apply to the exclusive base; VAT compounds on top
//! of the levied subtotal. This ordering follows current Ghana Revenue
//! Authority practice for the straight levies plus VAT-on-subtotal scheme.
//!
//! All intermediate values are full-precision `f64`; rounding happens only
//! when an amount is formatted for a document. Rounding each link of the
//! chain would accumulate error into the grand total.

use serde::{Deserialize, Serialize};

/// National Health Insurance Levy rate.
pub const NHIL_RATE: f64 = 0.025;

/// Ghana Education Trust Fund levy rate.
pub const GETFUND_RATE: f64 = 0.025;

/// COVID-19 Health Recovery Levy rate.
pub const COVID_RATE: f64 = 0.01;

/// Value Added Tax rate, applied to the levy-inclusive subtotal.
pub const VAT_RATE: f64 = 0.15;

/// The full levy decomposition of one invoice.
///
/// Deterministic: identical `(assay_ghs_value, rate_percent)` inputs always
/// produce an identical breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LevyBreakdown {
    /// The regulator's rate, as a percentage of assay value.
    pub rate_percent: f64,
    /// Service fee base: `assay_value × rate / 100`.
    pub total_exclusive: f64,
    /// National Health Insurance Levy (2.5% of exclusive).
    pub nhil: f64,
    /// GETFund levy (2.5% of exclusive).
    pub getfund: f64,
    /// COVID-19 levy (1% of exclusive).
    pub covid: f64,
    /// Exclusive total plus the three flat levies.
    pub sub_total: f64,
    /// VAT (15% of `sub_total`).
    pub vat: f64,
    /// `sub_total + vat` — the amount due.
    pub grand_total: f64,
}

/// Assess the statutory levy chain on a GHS assay value.
///
/// No error paths: a zero rate or zero assay value flows through to an
/// all-zero breakdown, matching the intake surface's behavior when pricing
/// has not been captured yet.
pub fn assess(assay_ghs_value: f64, rate_percent: f64) -> LevyBreakdown {
    let total_exclusive = assay_ghs_value * (rate_percent / 100.0);
    let nhil = total_exclusive * NHIL_RATE;
    let getfund = total_exclusive * GETFUND_RATE;
    let covid = total_exclusive * COVID_RATE;
    let sub_total = total_exclusive + nhil + getfund + covid;
    let vat = sub_total * VAT_RATE;
    let grand_total = sub_total + vat;
    LevyBreakdown {
        rate_percent,
        total_exclusive,
        nhil,
        getfund,
        covid,
        sub_total,
        vat,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn reference_chain_on_thousand_exclusive() {
        // 100% rate makes total_exclusive equal the assay value, which pins
        // the statutory chain: 1000 → 25 / 25 / 10 / 1060 / 159 / 1219.
        let breakdown = assess(1000.0, 100.0);
        assert!((breakdown.total_exclusive - 1000.0).abs() < TOL);
        assert!((breakdown.nhil - 25.0).abs() < TOL);
        assert!((breakdown.getfund - 25.0).abs() < TOL);
        assert!((breakdown.covid - 10.0).abs() < TOL);
        assert!((breakdown.sub_total - 1060.0).abs() < TOL);
        assert!((breakdown.vat - 159.0).abs() < TOL);
        assert!((breakdown.grand_total - 1219.0).abs() < TOL);
    }

    #[test]
    fn rate_scales_the_exclusive_base() {
        let breakdown = assess(70_982.40, 1.5);
        assert!((breakdown.total_exclusive - 1064.736).abs() < 1e-6);
        // Every downstream figure scales with the base.
        assert!((breakdown.grand_total - 1064.736 * 1.219).abs() < 1e-6);
    }

    #[test]
    fn zero_assay_value_yields_zero_chain() {
        let breakdown = assess(0.0, 3.0);
        assert_eq!(breakdown.grand_total, 0.0);
        assert_eq!(breakdown.vat, 0.0);
    }

    #[test]
    fn zero_rate_yields_zero_chain() {
        let breakdown = assess(50_000.0, 0.0);
        assert_eq!(breakdown.total_exclusive, 0.0);
        assert_eq!(breakdown.grand_total, 0.0);
    }

    #[test]
    fn full_precision_is_retained_internally() {
        // A base that would be mangled by per-step 2-dp rounding.
        let breakdown = assess(333.333, 100.0);
        let exclusive = 333.333;
        let sub_total = exclusive * (1.0 + NHIL_RATE + GETFUND_RATE + COVID_RATE);
        assert!((breakdown.sub_total - sub_total).abs() < TOL);
        assert!((breakdown.grand_total - sub_total * (1.0 + VAT_RATE)).abs() < TOL);
    }

    proptest! {
        #[test]
        fn chain_components_always_reconcile(value in 0.0f64..1.0e12, rate in 0.0f64..100.0) {
            let b = assess(value, rate);
            prop_assert!((b.sub_total - (b.total_exclusive + b.nhil + b.getfund + b.covid)).abs()
                <= b.sub_total.abs() * 1e-12 + 1e-9);
            prop_assert!((b.grand_total - (b.sub_total + b.vat)).abs()
                <= b.grand_total.abs() * 1e-12 + 1e-9);
        }

        #[test]
        fn grand_total_is_fixed_multiple_of_exclusive(value in 0.0f64..1.0e9) {
            // (1 + 0.06) × (1 + 0.15) = 1.219 exactly.
            let b = assess(value, 100.0);
            prop_assert!((b.grand_total - value * 1.219).abs() <= value * 1e-9 + 1e-9);
        }
    }
}
