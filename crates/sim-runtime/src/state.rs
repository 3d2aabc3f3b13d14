//! Simulation state, its portable snapshot and scenario overrides.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sim_ai::{Competitor, CompetitorSummary};
use sim_core::{Company, FinancialData, Kpis, MarketOverrides, PortableError, SimRng};

use crate::events::EventDefinition;
use crate::market::{Market, MarketSnapshot};
use crate::RuntimeError;

pub const PLAYER_COMPANY_ID: &str = "player_company";

/// The player company every default simulation starts with.
pub fn default_player_company() -> Company {
    let mut company = Company::new(PLAYER_COMPANY_ID, "Player Company");
    company.financial = FinancialData {
        revenue: Decimal::new(100_000, 0),
        costs: Decimal::new(80_000, 0),
        profit: Decimal::new(20_000, 0),
        cash: Decimal::new(50_000, 0),
        cash_flow: Decimal::ZERO,
        assets: Decimal::new(200_000, 0),
        liabilities: Decimal::new(150_000, 0),
    };
    company
}

/// Everything the simulation knows at the end of a round.
///
/// The state owns the company and the market; nothing else keeps references
/// into them between rounds.
#[derive(Clone, Debug)]
pub struct SimulationState {
    pub round_number: u32,
    pub company: Company,
    pub market: Market,
    /// Definitions of the events active after this round's expiry step.
    pub events: Vec<EventDefinition>,
    pub kpis: Kpis,
    pub timestamp: DateTime<Utc>,
}

/// Serializable view of a [`SimulationState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub round_number: u32,
    pub player_company: Company,
    pub market: MarketSnapshot,
    #[serde(default)]
    pub competitors: Vec<CompetitorSummary>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub kpis: Kpis,
    pub timestamp: DateTime<Utc>,
}

impl SimulationState {
    pub fn new(round_number: u32, company: Company, market: Market) -> Self {
        let kpis = company.kpis();
        Self {
            round_number,
            company,
            market,
            events: Vec::new(),
            kpis,
            timestamp: Utc::now(),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            round_number: self.round_number,
            player_company: self.company.clone(),
            market: self.market.snapshot(),
            competitors: self.market.competitors().summaries(),
            events: self.events.clone(),
            kpis: self.kpis.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Rebuild a state; KPIs are recomputed from the company.
    pub fn from_snapshot(snapshot: StateSnapshot, rng: &mut SimRng) -> Result<Self, RuntimeError> {
        let mut company = snapshot.player_company;
        company.normalize();
        let market = Market::from_snapshot(snapshot.market, rng)?;
        let kpis = company.kpis();
        Ok(Self {
            round_number: snapshot.round_number,
            company,
            market,
            events: snapshot.events,
            kpis,
            timestamp: snapshot.timestamp,
        })
    }

    pub fn to_portable_form(&self) -> Result<Value, PortableError> {
        Ok(serde_json::to_value(self.snapshot())?)
    }

    pub fn from_portable_form(value: Value, rng: &mut SimRng) -> Result<Self, RuntimeError> {
        let snapshot: StateSnapshot = serde_json::from_value(value).map_err(PortableError::from)?;
        SimulationState::from_snapshot(snapshot, rng)
    }
}

/// Starting overrides applied once, at initialization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingConditions {
    /// Portable form of the player company.
    pub company: Option<Value>,
    pub competitors: Option<Vec<Competitor>>,
    pub round_number: Option<u32>,
}

/// Named set of initialization overrides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub market: MarketOverrides,
    pub starting: StartingConditions,
}

impl Scenario {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketConfig;
    use serde_json::json;
    use sim_core::seeded_rng;

    fn state() -> SimulationState {
        let market = Market::new(MarketConfig::default(), &mut seeded_rng(1)).unwrap();
        SimulationState::new(0, default_player_company(), market)
    }

    #[test]
    fn default_company_has_starting_books() {
        let c = default_player_company();
        assert_eq!(c.id, PLAYER_COMPANY_ID);
        assert_eq!(c.financial.profit, c.financial.revenue - c.financial.costs);
        assert!((c.kpis().roi - 0.1).abs() < 1e-12);
    }

    #[test]
    fn portable_form_roundtrip() {
        let mut s = state();
        s.market.advance_round(1, 0.15);
        s.round_number = 1;
        let v = s.to_portable_form().unwrap();
        assert_eq!(v["round_number"], 1);
        assert_eq!(v["competitors"].as_array().map(Vec::len), Some(3));
        let back = SimulationState::from_portable_form(v, &mut seeded_rng(9)).unwrap();
        assert_eq!(back.snapshot(), s.snapshot());
    }

    #[test]
    fn malformed_portable_form_is_an_error() {
        let err = SimulationState::from_portable_form(json!({"round_number": "x"}), &mut seeded_rng(1));
        assert!(matches!(err, Err(RuntimeError::Portable(_))));
    }

    #[test]
    fn scenario_parses_partial_overrides() {
        let sc: Scenario = serde_json::from_value(json!({
            "name": "recession",
            "market": {"demand_level": 600.0},
            "starting": {"round_number": 2}
        }))
        .unwrap();
        assert_eq!(sc.market.demand_level, Some(600.0));
        assert_eq!(sc.market.price_index, None);
        assert_eq!(sc.starting.round_number, Some(2));
        assert!(sc.starting.company.is_none());
        assert_eq!(Scenario::named("x").name, "x");
    }
}
