#![deny(warnings)]

//! Core domain models and invariants for the business simulation.
//!
//! This crate defines the player company, the decision vocabulary, KPI
//! projections and the market state record shared by the economic, AI and
//! runtime crates. All types are serializable so they can cross the
//! persistence boundary in portable form.

pub mod company;
pub mod config;
pub mod decision;
pub mod market;
pub mod metrics;

pub use company::{
    Company, CostModel, FinancialData, MarketPosition, OperationsData, PerformanceMetric,
    PerformanceSnapshot, ResourceData, MAX_MARKET_SHARE, PERFORMANCE_HISTORY_LEN,
};
pub use config::{validate_config, SimConfig};
pub use decision::{
    params, Decision, DecisionError, DecisionKind, DecisionParams, DecisionRecord, DecisionSet,
};
pub use market::{
    DemandFactors, EconomicIndicators, MarketConditions, MarketOverrides, MarketState,
    TrendFactors,
};
pub use metrics::{CategoryRecord, Kpis, MetricCategory};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use thiserror::Error;

/// Random source threaded through every stochastic component.
pub type SimRng = ChaCha8Rng;

/// Build a deterministic RNG from a seed.
pub fn seeded_rng(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Derive an independent child RNG from a parent stream.
pub fn fork_rng(parent: &mut SimRng) -> SimRng {
    ChaCha8Rng::seed_from_u64(parent.gen())
}

/// Validation errors for configuration and domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A simulation needs at least one round.
    #[error("max_rounds must be >= 1")]
    ZeroRounds,
    /// A market needs at least one competitor.
    #[error("num_competitors must be >= 1")]
    ZeroCompetitors,
    /// Numeric field must be finite.
    #[error("non-finite value for {0}")]
    NonFinite(&'static str),
    /// Quantity must be strictly positive.
    #[error("{0} must be > 0")]
    NonPositive(&'static str),
    /// Quantity must not be negative.
    #[error("{0} must be >= 0")]
    Negative(&'static str),
}

/// Errors converting entities to and from their portable form.
#[derive(Debug, Error)]
pub enum PortableError {
    /// The nested key-value structure did not match the entity layout.
    #[error("portable form mismatch: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Convert a floating point amount into money.
///
/// NaN maps to zero; magnitudes beyond the decimal range saturate.
pub fn money(value: f64) -> Decimal {
    if value.is_nan() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or(if value.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

/// Lossy projection of money back to floating point.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Clamp a ratio-style value into [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::Rng;

    #[test]
    fn money_handles_edges() {
        assert_eq!(money(15_000.0), Decimal::new(15_000, 0));
        assert_eq!(money(f64::NAN), Decimal::ZERO);
        assert_eq!(money(f64::INFINITY), Decimal::MAX);
        assert_eq!(money(f64::NEG_INFINITY), Decimal::MIN);
        assert_eq!(money(1e300), Decimal::MAX);
    }

    #[test]
    fn forked_rngs_are_reproducible() {
        let mut a = seeded_rng(7);
        let mut b = seeded_rng(7);
        let mut ca = fork_rng(&mut a);
        let mut cb = fork_rng(&mut b);
        assert_eq!(ca.gen::<u64>(), cb.gen::<u64>());
    }

    proptest! {
        #[test]
        fn clamp_unit_stays_in_bounds(x in proptest::num::f64::ANY) {
            let c = clamp_unit(x);
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
