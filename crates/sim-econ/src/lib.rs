#![deny(warnings)]

//! Economic models for the business simulation.
//!
//! This crate provides:
//! - Multi-factor demand evaluation under constant price elasticity
//! - Blended optimal pricing with a bounded price history and OLS trend
//! - Seasonal, long-term and cyclical market trend simulation

pub mod demand;
pub mod pricing;
pub mod trend;

pub use demand::{company_multiplier, economic_multiplier, DemandCalculator};
pub use pricing::{ols_slope, PricingEngine, PRICE_HISTORY_LEN};
pub use trend::{
    cyclical_factor, seasonal_factor, SeasonalPhase, TrendAnalyzer, TrendDirection, TrendRecord,
    TrendSummary, TREND_HISTORY_LEN,
};

use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Elasticity must be finite and strictly negative.
    #[error("invalid elasticity: {0}")]
    InvalidElasticity(f64),
    /// Prices must be finite and strictly positive.
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
    /// A model input or result was not a finite number.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Price as unit cost plus a fractional margin.
///
/// Example:
/// assert_eq!(cost_plus(100.0, 0.3), 130.0);
pub fn cost_plus(unit_cost: f64, margin: f64) -> f64 {
    unit_cost * (1.0 + margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_plus() {
        assert_eq!(cost_plus(100.0, 0.3), 130.0);
        assert_eq!(cost_plus(0.0, 0.3), 0.0);
    }
}
