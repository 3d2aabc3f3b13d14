//! Simulation configuration record.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of rounds before the simulation is over (>= 1).
    pub max_rounds: u32,
    /// Number of AI competitors seeded into the market (>= 1).
    pub num_competitors: usize,
    /// Base demand level of the market (> 0).
    pub initial_market_demand: f64,
    /// Scales the long-term trend jitter; 0.1 gives +/-0.01 per round.
    pub market_volatility: f64,
    /// Scales random event probabilities; 0.3 leaves them unchanged.
    pub event_frequency: f64,
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
}

impl SimConfig {
    /// Event frequency at which definition probabilities apply as written.
    pub const BASELINE_EVENT_FREQUENCY: f64 = 0.3;
    /// Trend jitter half-width per unit of volatility.
    pub const JITTER_PER_VOLATILITY: f64 = 0.1;

    /// Half-width of the uniform jitter applied to the long-term trend.
    pub fn trend_jitter(&self) -> f64 {
        self.market_volatility * Self::JITTER_PER_VOLATILITY
    }

    /// Multiplier applied to random event probabilities.
    pub fn event_probability_scale(&self) -> f64 {
        self.event_frequency / Self::BASELINE_EVENT_FREQUENCY
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            num_competitors: 3,
            initial_market_demand: 1000.0,
            market_volatility: 0.1,
            event_frequency: 0.3,
            rng_seed: 42,
        }
    }
}

/// Validate configuration ranges.
pub fn validate_config(cfg: &SimConfig) -> Result<(), ValidationError> {
    if cfg.max_rounds == 0 {
        return Err(ValidationError::ZeroRounds);
    }
    if cfg.num_competitors == 0 {
        return Err(ValidationError::ZeroCompetitors);
    }
    if !cfg.initial_market_demand.is_finite() {
        return Err(ValidationError::NonFinite("initial_market_demand"));
    }
    if cfg.initial_market_demand <= 0.0 {
        return Err(ValidationError::NonPositive("initial_market_demand"));
    }
    if !cfg.market_volatility.is_finite() {
        return Err(ValidationError::NonFinite("market_volatility"));
    }
    if cfg.market_volatility < 0.0 {
        return Err(ValidationError::Negative("market_volatility"));
    }
    if !cfg.event_frequency.is_finite() {
        return Err(ValidationError::NonFinite("event_frequency"));
    }
    if cfg.event_frequency < 0.0 {
        return Err(ValidationError::Negative("event_frequency"));
    }
    Ok(())
}
