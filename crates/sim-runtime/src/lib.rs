#![deny(warnings)]

//! Round engine for the business simulation.
//!
//! [`SimulationEngine`] owns the round counter, the event manager and the
//! current [`SimulationState`]. Each call to [`SimulationEngine::run_round`]
//! applies the player's decisions, triggers and expires events, moves the
//! market, computes round results and commits them to the player company.

pub mod engine;
pub mod events;
pub mod market;
pub mod round;
pub mod state;

pub use engine::{EngineSummary, RoundOutput, SimulationEngine};
pub use events::{
    default_catalog, ActiveEvent, EventConditions, EventDefinition, EventHistoryEntry, EventKind,
    EventManager, Impacts,
};
pub use market::{Market, MarketConfig, MarketSnapshot, MarketSummary};
pub use round::{
    apply_event_impacts, DecisionOutcome, ProcessedDecisions, RoundManager, RoundMetric,
    RoundResults,
};
pub use state::{default_player_company, Scenario, SimulationState, StartingConditions, StateSnapshot};

use sim_core::{PortableError, ValidationError};
use sim_econ::EconError;
use thiserror::Error;

/// Errors surfaced by the round engine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A round was requested before the engine was initialized.
    #[error("simulation not initialized")]
    NotInitialized,
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error(transparent)]
    Portable(#[from] PortableError),
}
