//! The market aggregate: state record plus the demand, pricing, competitor
//! and trend models that evolve it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sim_ai::{Competitor, CompetitorAi, CompetitorSummary, CompetitorUpdate};
use sim_core::{clamp_unit, fork_rng, DemandFactors, MarketOverrides, MarketState, SimConfig, SimRng};
use sim_econ::{
    DemandCalculator, EconError, PricingEngine, TrendAnalyzer, TrendRecord, TrendSummary,
};
use tracing::debug;

use crate::RuntimeError;

/// Share of competitor price pressure folded into competition intensity.
const PRESSURE_TO_INTENSITY: f64 = 0.1;

/// Parameters a market is built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub initial_demand: f64,
    pub initial_price_index: f64,
    pub competition_intensity: f64,
    /// Price at index 1.0; also the fallback competitor price.
    pub base_price: f64,
    pub price_elasticity: f64,
    pub num_competitors: usize,
    /// Half-width of the long-term trend jitter.
    pub trend_jitter: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            initial_demand: 1000.0,
            initial_price_index: 1.0,
            competition_intensity: 0.5,
            base_price: 100.0,
            price_elasticity: -1.5,
            num_competitors: 3,
            trend_jitter: sim_econ::trend::DEFAULT_TREND_JITTER,
        }
    }
}

impl MarketConfig {
    pub fn from_sim_config(cfg: &SimConfig) -> Self {
        Self {
            initial_demand: cfg.initial_market_demand,
            num_competitors: cfg.num_competitors,
            trend_jitter: cfg.trend_jitter(),
            ..Self::default()
        }
    }
}

/// Everything observable about the market at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub state: MarketState,
    pub competitors: Vec<CompetitorSummary>,
    pub trend: Option<TrendSummary>,
    pub round_number: u32,
}

/// Portable form of a [`Market`]. The random streams are not part of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub config: MarketConfig,
    pub state: MarketState,
    #[serde(default)]
    pub round_number: u32,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    #[serde(default)]
    pub trend_history: Vec<TrendRecord>,
    #[serde(default)]
    pub pricing: Option<PricingEngine>,
}

#[derive(Clone, Debug)]
pub struct Market {
    config: MarketConfig,
    state: MarketState,
    demand: DemandCalculator,
    pricing: PricingEngine,
    competitors: CompetitorAi,
    trends: TrendAnalyzer,
    round_number: u32,
}

impl Market {
    /// Build a market, drawing child streams for competitors and trends from `rng`.
    pub fn new(config: MarketConfig, rng: &mut SimRng) -> Result<Self, RuntimeError> {
        let demand = DemandCalculator::new(config.initial_demand, config.price_elasticity)?
            .with_reference_price(config.base_price)?;
        let state = MarketState {
            demand_level: config.initial_demand,
            price_index: config.initial_price_index,
            competition_intensity: clamp_unit(config.competition_intensity),
            ..MarketState::default()
        };
        let competitors = CompetitorAi::new(config.num_competitors, fork_rng(rng));
        let trends = TrendAnalyzer::new(fork_rng(rng), config.trend_jitter);
        Ok(Self {
            pricing: PricingEngine::new(config.base_price),
            config,
            state,
            demand,
            competitors,
            trends,
            round_number: 0,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn competitors(&self) -> &CompetitorAi {
        &self.competitors
    }

    pub fn replace_competitors(&mut self, competitors: Vec<Competitor>, rng: SimRng) {
        self.competitors = CompetitorAi::from_competitors(competitors, rng);
    }

    pub fn apply_overrides(&mut self, overrides: &MarketOverrides) {
        self.state.apply_overrides(overrides);
    }

    /// The player's price implied by the price index.
    pub fn player_price(&self) -> f64 {
        self.state.price_index * self.config.base_price
    }

    pub fn set_player_price(&mut self, price: f64) {
        self.state.price_index = price / self.config.base_price;
    }

    pub fn set_active_events(&mut self, ids: Vec<String>) {
        self.state.active_events = ids;
    }

    /// Move the market to `round`: trends first, then competitor reactions,
    /// whose price pressure feeds back into competition intensity.
    pub fn advance_round(&mut self, round: u32, player_share: f64) -> CompetitorUpdate {
        self.round_number = round;
        self.trends.update_trends(round, &mut self.state);

        let player_price = self.player_price();
        let update = self
            .competitors
            .update_competitor_actions(player_price, player_share);
        self.state.competition_intensity = clamp_unit(
            self.state.competition_intensity + update.impacts.price_pressure * PRESSURE_TO_INTENSITY,
        );
        debug!(
            round,
            intensity = self.state.competition_intensity,
            impacts = ?update.impacts,
            "market advanced"
        );
        update
    }

    pub fn calculate_demand(&self, price: f64, factors: &DemandFactors) -> Result<f64, EconError> {
        self.demand.calculate_demand(price, &self.state, factors)
    }

    /// Recommended price for the given unit cost; recorded in the price history.
    pub fn recommend_price(&mut self, unit_cost: f64) -> f64 {
        let prices = self.competitors.prices();
        self.pricing
            .calculate_optimal_price(&self.state, &prices, unit_cost)
    }

    pub fn price_trend(&self) -> f64 {
        self.pricing.price_trend()
    }

    pub fn competitor_prices(&self) -> Vec<f64> {
        self.competitors.prices()
    }

    /// Mean competitor price, or the base price without competitors.
    pub fn average_competitor_price(&self) -> f64 {
        self.competitors
            .average_price()
            .unwrap_or(self.config.base_price)
    }

    pub fn trend_forecast(&self, rounds_ahead: u32) -> Vec<TrendRecord> {
        self.trends.predict_future_trends(rounds_ahead)
    }

    pub fn summary(&self) -> MarketSummary {
        MarketSummary {
            state: self.state.clone(),
            competitors: self.competitors.summaries(),
            trend: self.trends.summary(),
            round_number: self.round_number,
        }
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            config: self.config.clone(),
            state: self.state.clone(),
            round_number: self.round_number,
            competitors: self.competitors.competitors().to_vec(),
            trend_history: self.trends.history().iter().cloned().collect(),
            pricing: Some(self.pricing.clone()),
        }
    }

    /// Rebuild a market from its snapshot; `rng` seeds the new random streams.
    pub fn from_snapshot(snapshot: MarketSnapshot, rng: &mut SimRng) -> Result<Self, RuntimeError> {
        let mut market = Market::new(snapshot.config, rng)?;
        market.state = snapshot.state;
        market.state.competition_intensity = clamp_unit(market.state.competition_intensity);
        market.round_number = snapshot.round_number;
        market.replace_competitors(snapshot.competitors, fork_rng(rng));
        market.trends.restore_history(snapshot.trend_history);
        if let Some(pricing) = snapshot.pricing {
            market.pricing = pricing;
        }
        Ok(market)
    }

    pub fn to_portable_form(&self) -> Result<Value, RuntimeError> {
        Ok(serde_json::to_value(self.snapshot()).map_err(sim_core::PortableError::from)?)
    }

    pub fn from_portable_form(value: Value, rng: &mut SimRng) -> Result<Self, RuntimeError> {
        let snapshot: MarketSnapshot =
            serde_json::from_value(value).map_err(sim_core::PortableError::from)?;
        Market::from_snapshot(snapshot, rng)
    }
}
