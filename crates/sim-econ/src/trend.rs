//! Seasonal, long-term and cyclical demand trends.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{MarketState, SimRng};
use std::collections::VecDeque;
use tracing::debug;

/// Number of trend records retained.
pub const TREND_HISTORY_LEN: usize = 24;
/// Expected long-term growth per round.
pub const BASE_TREND: f64 = 0.005;
/// Default half-width of the per-round trend jitter.
pub const DEFAULT_TREND_JITTER: f64 = 0.01;

/// Seasonal offsets for months 1..=12; Q4 runs above Q1.
const SEASONAL_PATTERN: [f64; 12] = [
    -0.1, -0.15, -0.05, 0.0, 0.05, 0.1, 0.15, 0.1, 0.05, 0.0, 0.1, 0.2,
];
/// Eight-round business cycle.
const CYCLE_PATTERN: [f64; 8] = [0.05, 0.03, 0.01, -0.01, -0.03, -0.05, -0.03, 0.01];

/// Seasonal offset for a round; month = (round % 12) + 1.
pub fn seasonal_factor(round: u32) -> f64 {
    SEASONAL_PATTERN[(round % 12) as usize]
}

/// Cyclical offset for a round.
pub fn cyclical_factor(round: u32) -> f64 {
    CYCLE_PATTERN[(round % 8) as usize]
}

/// Trend components computed for one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub round: u32,
    pub seasonal: f64,
    pub trend: f64,
    pub cyclical: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Growing,
    Declining,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalPhase {
    High,
    Normal,
    Low,
}

/// Latest trend values with a qualitative reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub seasonal: f64,
    pub trend: f64,
    pub cyclical: f64,
    pub direction: TrendDirection,
    pub phase: SeasonalPhase,
}

/// Simulates market trends round over round.
#[derive(Clone, Debug)]
pub struct TrendAnalyzer {
    history: VecDeque<TrendRecord>,
    jitter: f64,
    rng: SimRng,
}

impl TrendAnalyzer {
    /// `jitter` is the half-width of the uniform noise added to [`BASE_TREND`].
    pub fn new(rng: SimRng, jitter: f64) -> Self {
        let jitter = if jitter.is_finite() { jitter.abs() } else { 0.0 };
        Self {
            history: VecDeque::with_capacity(TREND_HISTORY_LEN + 1),
            jitter,
            rng,
        }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn history(&self) -> &VecDeque<TrendRecord> {
        &self.history
    }

    /// Replace the history, keeping only the newest records.
    pub fn restore_history(&mut self, records: Vec<TrendRecord>) {
        self.history = records.into();
        while self.history.len() > TREND_HISTORY_LEN {
            self.history.pop_front();
        }
    }

    fn trend_component(&mut self) -> f64 {
        BASE_TREND + self.rng.gen_range(-self.jitter..=self.jitter)
    }

    /// Recompute all trend components for `round` and write them into `state`.
    pub fn update_trends(&mut self, round: u32, state: &mut MarketState) -> TrendRecord {
        let record = TrendRecord {
            round,
            seasonal: seasonal_factor(round),
            trend: self.trend_component(),
            cyclical: cyclical_factor(round),
        };
        debug!(round, seasonal = record.seasonal, trend = record.trend, cyclical = record.cyclical, "trends updated");

        state.trend_factors.seasonal = record.seasonal;
        state.trend_factors.trend = record.trend;
        state.trend_factors.cyclical = record.cyclical;

        self.history.push_back(record.clone());
        while self.history.len() > TREND_HISTORY_LEN {
            self.history.pop_front();
        }
        record
    }

    /// Expected trend values for the next `rounds_ahead` rounds.
    ///
    /// The long-term component is its expectation; no randomness is consumed.
    pub fn predict_future_trends(&self, rounds_ahead: u32) -> Vec<TrendRecord> {
        let current = self.history.back().map(|r| r.round).unwrap_or(0);
        (1..=rounds_ahead)
            .map(|i| {
                let round = current + i;
                TrendRecord {
                    round,
                    seasonal: seasonal_factor(round),
                    trend: BASE_TREND,
                    cyclical: cyclical_factor(round),
                }
            })
            .collect()
    }

    pub fn summary(&self) -> Option<TrendSummary> {
        let latest = self.history.back()?;
        let direction = if latest.trend > 0.0 {
            TrendDirection::Growing
        } else {
            TrendDirection::Declining
        };
        let phase = if latest.seasonal > 0.05 {
            SeasonalPhase::High
        } else if latest.seasonal < -0.05 {
            SeasonalPhase::Low
        } else {
            SeasonalPhase::Normal
        };
        Some(TrendSummary {
            seasonal: latest.seasonal,
            trend: latest.trend,
            cyclical: latest.cyclical,
            direction,
            phase,
        })
    }
}
