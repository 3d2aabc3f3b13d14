//! Market state record shared by the demand, pricing, trend and competitor
//! models.

use serde::{Deserialize, Serialize};

use crate::clamp_unit;

/// Macro-economic indicators driving demand and pricing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicIndicators {
    /// Real growth per round (e.g., 0.02 = 2%).
    pub gdp_growth: f64,
    /// Inflation rate.
    pub inflation: f64,
    /// Short-term interest rate.
    pub interest_rate: f64,
}

impl Default for EconomicIndicators {
    fn default() -> Self {
        Self {
            gdp_growth: 0.02,
            inflation: 0.03,
            interest_rate: 0.05,
        }
    }
}

/// Trend components written by the trend analyzer each round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendFactors {
    pub seasonal: f64,
    pub trend: f64,
    pub cyclical: f64,
}

/// Current state of the market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub demand_level: f64,
    /// Player price relative to the reference price.
    pub price_index: f64,
    /// Competitive pressure in [0, 1].
    pub competition_intensity: f64,
    pub economic_indicators: EconomicIndicators,
    pub trend_factors: TrendFactors,
    /// Ids of the events active this round.
    #[serde(default)]
    pub active_events: Vec<String>,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            demand_level: 1000.0,
            price_index: 1.0,
            competition_intensity: 0.5,
            economic_indicators: EconomicIndicators::default(),
            trend_factors: TrendFactors::default(),
            active_events: Vec::new(),
        }
    }
}

impl MarketState {
    /// Apply scenario overrides; only fields present in `overrides` change.
    pub fn apply_overrides(&mut self, overrides: &MarketOverrides) {
        if let Some(d) = overrides.demand_level {
            self.demand_level = d.max(0.0);
        }
        if let Some(p) = overrides.price_index {
            self.price_index = p;
        }
        if let Some(c) = overrides.competition_intensity {
            self.competition_intensity = clamp_unit(c);
        }
        if let Some(e) = &overrides.economic_indicators {
            self.economic_indicators = e.clone();
        }
        if let Some(t) = &overrides.trend_factors {
            self.trend_factors = t.clone();
        }
    }
}

/// Scenario-supplied replacement values for the starting market.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketOverrides {
    pub demand_level: Option<f64>,
    pub price_index: Option<f64>,
    pub competition_intensity: Option<f64>,
    pub economic_indicators: Option<EconomicIndicators>,
    pub trend_factors: Option<TrendFactors>,
}

/// Company attributes that shift demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandFactors {
    pub quality: f64,
    pub brand_value: f64,
    pub customer_satisfaction: f64,
}

impl Default for DemandFactors {
    fn default() -> Self {
        Self {
            quality: 0.75,
            brand_value: 50.0,
            customer_satisfaction: 0.7,
        }
    }
}

/// Market inputs consumed by a company state update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketConditions {
    pub demand_level: f64,
    pub price_index: f64,
    /// Prevailing market price used to judge price competitiveness.
    pub market_price: f64,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            demand_level: 1000.0,
            price_index: 1.0,
            market_price: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_touch_only_present_fields() {
        let mut state = MarketState::default();
        state.apply_overrides(&MarketOverrides {
            demand_level: Some(2500.0),
            competition_intensity: Some(3.0),
            ..MarketOverrides::default()
        });
        assert_eq!(state.demand_level, 2500.0);
        assert_eq!(state.competition_intensity, 1.0);
        assert_eq!(state.price_index, 1.0);
        assert_eq!(state.economic_indicators, EconomicIndicators::default());
    }

    #[test]
    fn overrides_parse_from_partial_map() {
        let o: MarketOverrides = serde_json::from_str(
            r#"{"economic_indicators": {"gdp_growth": -0.01, "inflation": 0.08, "interest_rate": 0.1}}"#,
        )
        .unwrap();
        assert!(o.demand_level.is_none());
        assert_eq!(o.economic_indicators.unwrap().inflation, 0.08);
    }
}
