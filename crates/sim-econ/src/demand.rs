//! Market demand as a product of independent multipliers.

use serde::{Deserialize, Serialize};
use sim_core::{DemandFactors, EconomicIndicators, MarketState};

use crate::EconError;

/// Price at which the price multiplier is exactly 1.
pub const REFERENCE_PRICE: f64 = 100.0;
/// Fraction of demand lost at full competition intensity.
pub const COMPETITION_DAMPING: f64 = 0.2;

const NEUTRAL_QUALITY: f64 = 0.75;
const NEUTRAL_SATISFACTION: f64 = 0.7;

/// Evaluates demand from price, market state and company factors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandCalculator {
    base_demand: f64,
    price_elasticity: f64,
    reference_price: f64,
}

impl DemandCalculator {
    /// Requires `base_demand >= 0` and a finite, strictly negative elasticity.
    pub fn new(base_demand: f64, price_elasticity: f64) -> Result<Self, EconError> {
        if !base_demand.is_finite() || base_demand < 0.0 {
            return Err(EconError::NonFinite("base_demand"));
        }
        if !price_elasticity.is_finite() || price_elasticity >= 0.0 {
            return Err(EconError::InvalidElasticity(price_elasticity));
        }
        Ok(Self {
            base_demand,
            price_elasticity,
            reference_price: REFERENCE_PRICE,
        })
    }

    pub fn with_reference_price(mut self, price: f64) -> Result<Self, EconError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(EconError::InvalidPrice(price));
        }
        self.reference_price = price;
        Ok(self)
    }

    pub fn base_demand(&self) -> f64 {
        self.base_demand
    }

    pub fn price_elasticity(&self) -> f64 {
        self.price_elasticity
    }

    /// Demand at `price`, floored at zero.
    ///
    /// base * economic * (price/ref)^elasticity * (1 + trend) * company
    /// * (1 + seasonal) * (1 + cyclical) * (1 - intensity * 0.2)
    pub fn calculate_demand(
        &self,
        price: f64,
        state: &MarketState,
        factors: &DemandFactors,
    ) -> Result<f64, EconError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(EconError::InvalidPrice(price));
        }
        let price_effect = (price / self.reference_price).powf(self.price_elasticity);
        let trend_effect = 1.0 + state.trend_factors.trend;
        let seasonal_effect =
            (1.0 + state.trend_factors.seasonal) * (1.0 + state.trend_factors.cyclical);
        let competition_effect = 1.0 - state.competition_intensity * COMPETITION_DAMPING;

        let q = self.base_demand
            * economic_multiplier(&state.economic_indicators)
            * price_effect
            * trend_effect
            * company_multiplier(factors)
            * seasonal_effect
            * competition_effect;
        if !q.is_finite() {
            return Err(EconError::NonFinite("demand"));
        }
        Ok(q.max(0.0))
    }
}

/// Demand multiplier from growth, inflation and interest rates.
pub fn economic_multiplier(ind: &EconomicIndicators) -> f64 {
    let gdp = 1.0 + ind.gdp_growth;
    let inflation = 1.0 - ind.inflation * 0.5;
    let interest = 1.0 - ind.interest_rate * 0.3;
    gdp * inflation * interest
}

/// Demand multiplier from quality, brand and satisfaction.
pub fn company_multiplier(f: &DemandFactors) -> f64 {
    let quality = 1.0 + (f.quality - NEUTRAL_QUALITY) * 0.5;
    let brand = 1.0 + (f.brand_value / 100.0) * 0.3;
    let satisfaction = 1.0 + (f.customer_satisfaction - NEUTRAL_SATISFACTION) * 0.4;
    quality * brand * satisfaction
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calc() -> DemandCalculator {
        DemandCalculator::new(1000.0, -1.5).unwrap()
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(DemandCalculator::new(1000.0, 0.5).is_err());
        assert!(DemandCalculator::new(1000.0, f64::NAN).is_err());
        assert!(DemandCalculator::new(-1.0, -1.5).is_err());
        assert!(calc().with_reference_price(0.0).is_err());
        let state = MarketState::default();
        let f = DemandFactors::default();
        assert_eq!(
            calc().calculate_demand(0.0, &state, &f),
            Err(EconError::InvalidPrice(0.0))
        );
    }

    #[test]
    fn neutral_inputs_reduce_to_known_product() {
        let mut state = MarketState::default();
        state.competition_intensity = 0.0;
        state.economic_indicators = EconomicIndicators {
            gdp_growth: 0.0,
            inflation: 0.0,
            interest_rate: 0.0,
        };
        let f = DemandFactors {
            quality: 0.75,
            brand_value: 0.0,
            customer_satisfaction: 0.7,
        };
        let q = calc().calculate_demand(100.0, &state, &f).unwrap();
        assert!((q - 1000.0).abs() < 1e-9);
        state.competition_intensity = 1.0;
        let q = calc().calculate_demand(100.0, &state, &f).unwrap();
        assert!((q - 800.0).abs() < 1e-9);
    }

    #[test]
    fn better_company_sells_more() {
        let state = MarketState::default();
        let weak = DemandFactors {
            quality: 0.5,
            brand_value: 10.0,
            customer_satisfaction: 0.4,
        };
        let strong = DemandFactors {
            quality: 0.95,
            brand_value: 90.0,
            customer_satisfaction: 0.9,
        };
        let c = calc();
        assert!(
            c.calculate_demand(100.0, &state, &strong).unwrap()
                > c.calculate_demand(100.0, &state, &weak).unwrap()
        );
    }

    #[test]
    fn demand_is_floored_at_zero() {
        let mut state = MarketState::default();
        state.trend_factors.trend = -3.0;
        let q = calc()
            .calculate_demand(100.0, &state, &DemandFactors::default())
            .unwrap();
        assert_eq!(q, 0.0);
    }

    proptest! {
        #[test]
        fn demand_is_pure(price in 1.0f64..1000.0) {
            let state = MarketState::default();
            let f = DemandFactors::default();
            let c = calc();
            prop_assert_eq!(c.calculate_demand(price, &state, &f), c.calculate_demand(price, &state, &f));
        }

        #[test]
        fn demand_strictly_decreases_with_price(price in 1.0f64..1000.0,
                                                step in 0.5f64..100.0,
                                                e in -5.0f64..-0.1) {
            let state = MarketState::default();
            let f = DemandFactors::default();
            let c = DemandCalculator::new(1000.0, e).unwrap();
            let low = c.calculate_demand(price, &state, &f).unwrap();
            let high = c.calculate_demand(price + step, &state, &f).unwrap();
            prop_assert!(low > high);
        }
    }
}
