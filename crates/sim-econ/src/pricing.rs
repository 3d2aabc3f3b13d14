//! Optimal price recommendation and price trend estimation.

use serde::{Deserialize, Serialize};
use sim_core::MarketState;
use std::collections::VecDeque;

use crate::cost_plus;

/// Number of recommended prices retained.
pub const PRICE_HISTORY_LEN: usize = 10;
/// Number of most recent prices used for the trend slope.
pub const TREND_WINDOW: usize = 5;

const COST_PLUS_MARGIN: f64 = 0.3;
const NEUTRAL_DEMAND: f64 = 1000.0;
const COST_WEIGHT: f64 = 0.4;
const MARKET_WEIGHT: f64 = 0.4;
const DEMAND_WEIGHT: f64 = 0.2;

/// Blends cost-plus, competitor and demand-driven prices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingEngine {
    base_price: f64,
    price_history: VecDeque<f64>,
}

impl PricingEngine {
    pub fn new(base_price: f64) -> Self {
        Self {
            base_price,
            price_history: VecDeque::with_capacity(PRICE_HISTORY_LEN + 1),
        }
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    pub fn price_history(&self) -> &VecDeque<f64> {
        &self.price_history
    }

    /// Recommended price given competitors and the company's unit cost.
    ///
    /// `(0.4 * cost-plus + 0.4 * competitor price + 0.2 * demand price) * (1 + inflation)`.
    /// The result is appended to the bounded price history.
    pub fn calculate_optimal_price(
        &mut self,
        state: &MarketState,
        competitor_prices: &[f64],
        company_costs: f64,
    ) -> f64 {
        let cost_price = cost_plus(company_costs, COST_PLUS_MARGIN);
        let avg_competitor = if competitor_prices.is_empty() {
            self.base_price
        } else {
            competitor_prices.iter().sum::<f64>() / competitor_prices.len() as f64
        };
        let market_price = avg_competitor * (1.0 + state.competition_intensity * 0.1);
        let demand_multiplier = 1.0 + (state.demand_level / NEUTRAL_DEMAND - 1.0) * 0.2;
        let inflation_adjustment = 1.0 + state.economic_indicators.inflation;

        let price = (cost_price * COST_WEIGHT
            + market_price * MARKET_WEIGHT
            + self.base_price * demand_multiplier * DEMAND_WEIGHT)
            * inflation_adjustment;

        self.price_history.push_back(price);
        while self.price_history.len() > PRICE_HISTORY_LEN {
            self.price_history.pop_front();
        }
        price
    }

    /// Slope of the most recent prices; positive when prices are rising.
    pub fn price_trend(&self) -> f64 {
        let skip = self.price_history.len().saturating_sub(TREND_WINDOW);
        let recent: Vec<f64> = self.price_history.iter().skip(skip).copied().collect();
        ols_slope(&recent)
    }
}

/// Ordinary least squares slope of `ys` against their indices.
///
/// Returns 0 for fewer than two points.
pub fn ols_slope(ys: &[f64]) -> f64 {
    let n = ys.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in ys.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }
    let denom = n_f * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denom
}
