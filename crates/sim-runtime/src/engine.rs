//! The round orchestrator.

use serde::{Deserialize, Serialize};
use sim_ai::CompetitorUpdate;
use sim_core::{
    fork_rng, seeded_rng, validate_config, Company, DecisionSet, Kpis, MarketConditions, SimConfig,
    SimRng,
};
use tracing::{info, info_span, warn};

use crate::events::{ActiveEvent, EventManager, Impacts};
use crate::market::{Market, MarketConfig};
use crate::round::{apply_event_impacts, ProcessedDecisions, RoundManager, RoundResults};
use crate::state::{default_player_company, Scenario, SimulationState, StateSnapshot};
use crate::RuntimeError;

/// Everything produced by one call to [`SimulationEngine::run_round`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundOutput {
    pub round_number: u32,
    pub processed_decisions: ProcessedDecisions,
    pub round_results: RoundResults,
    pub triggered_events: Vec<ActiveEvent>,
    pub expired_events: Vec<ActiveEvent>,
    pub event_impacts: Impacts,
    /// Impact keys with no round metric to land on.
    pub ignored_impacts: Vec<String>,
    pub competitor_update: CompetitorUpdate,
    pub recommended_price: f64,
    pub game_state: StateSnapshot,
    pub is_simulation_over: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSummary {
    pub initialized: bool,
    pub current_round: u32,
    pub max_rounds: u32,
    pub is_simulation_over: bool,
    pub total_events: usize,
    pub active_events: usize,
    pub kpis: Option<Kpis>,
    pub history_len: usize,
}

/// Drives the simulation one round at a time.
pub struct SimulationEngine {
    config: SimConfig,
    rounds: RoundManager,
    events: EventManager,
    state: Option<SimulationState>,
    history: Vec<StateSnapshot>,
    rng: SimRng,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Result<Self, RuntimeError> {
        validate_config(&config)?;
        let mut rng = seeded_rng(config.rng_seed);
        let events = EventManager::new(fork_rng(&mut rng))
            .with_probability_scale(config.event_probability_scale());
        Ok(Self {
            rounds: RoundManager::new(config.max_rounds),
            events,
            state: None,
            history: Vec::new(),
            rng,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn initialize(&mut self) -> Result<&SimulationState, RuntimeError> {
        self.initialize_with(&Scenario::default())
    }

    /// Start a fresh simulation, applying `scenario` on top of the defaults.
    ///
    /// Every call reseeds all random streams from the configured seed.
    pub fn initialize_with(&mut self, scenario: &Scenario) -> Result<&SimulationState, RuntimeError> {
        let mut rng = seeded_rng(self.config.rng_seed);
        let event_rng = fork_rng(&mut rng);

        let company = match &scenario.starting.company {
            Some(portable) => Company::from_portable_form(portable.clone())?,
            None => default_player_company(),
        };
        let mut market = Market::new(MarketConfig::from_sim_config(&self.config), &mut rng)?;
        market.apply_overrides(&scenario.market);
        if let Some(competitors) = &scenario.starting.competitors {
            market.replace_competitors(competitors.clone(), fork_rng(&mut rng));
        }

        self.rounds.reset();
        if let Some(round) = scenario.starting.round_number {
            self.rounds.resume_at(round);
        }
        self.events.reset();
        self.events.reseed(event_rng);
        self.history.clear();
        self.rng = rng;

        let state = SimulationState::new(self.rounds.current_round(), company, market);
        info!(
            scenario = %scenario.name,
            round = state.round_number,
            max_rounds = self.config.max_rounds,
            seed = self.config.rng_seed,
            "simulation initialized"
        );
        self.history.push(state.snapshot());
        Ok(self.state.insert(state))
    }

    /// Play one round with the player's decisions.
    ///
    /// Fails with [`RuntimeError::NotInitialized`] before any state changes
    /// if [`initialize`](Self::initialize) has not been called.
    pub fn run_round(&mut self, decisions: &DecisionSet) -> Result<RoundOutput, RuntimeError> {
        let state = self.state.as_mut().ok_or(RuntimeError::NotInitialized)?;

        let round = self.rounds.advance_round();
        let span = info_span!("round", round);
        let _enter = span.enter();

        let processed = self.rounds.process_decisions(&mut state.company, decisions);
        if let Some(price) = processed.new_price() {
            state.market.set_player_price(price);
        }

        let mut candidates = self.events.generate_random_events(round);
        candidates.extend(self.events.process_scheduled_events(round));
        candidates.extend(self.events.decision_events(round, &processed.applied_kinds()));
        let triggered: Vec<ActiveEvent> = candidates
            .iter()
            .map(|ev| self.events.trigger_event(ev, round))
            .collect();

        let expired = self.events.process_active_events();
        let impacts = self.events.active_event_impacts();
        state.market.set_active_events(
            self.events
                .active_events()
                .iter()
                .map(|ev| ev.event.id.clone())
                .collect(),
        );

        let competitor_update = state
            .market
            .advance_round(round, state.company.market.market_share);

        let mut results = self.rounds.calculate_round_results(&state.company, &processed);
        let ignored = apply_event_impacts(&mut results, &impacts);

        commit_round_results(&mut state.company, &results);
        let conditions = market_conditions(&state.market, &state.company);
        state.company.update_state(&conditions);
        let recommended_price = state
            .market
            .recommend_price(state.company.cost_model.unit_operating_cost);

        state.round_number = round;
        state.events = self
            .events
            .active_events()
            .iter()
            .map(|ev| ev.event.clone())
            .collect();
        state.kpis = state.company.kpis();
        state.timestamp = chrono::Utc::now();

        let snapshot = state.snapshot();
        self.history.push(snapshot.clone());

        let is_over = self.rounds.is_simulation_over();
        info!(
            triggered = triggered.len(),
            expired = expired.len(),
            revenue = %results.revenue,
            profit = %results.profit,
            is_over,
            "round complete"
        );
        Ok(RoundOutput {
            round_number: round,
            processed_decisions: processed,
            round_results: results,
            triggered_events: triggered,
            expired_events: expired,
            event_impacts: impacts,
            ignored_impacts: ignored,
            competitor_update,
            recommended_price,
            game_state: snapshot,
            is_simulation_over: is_over,
        })
    }

    pub fn is_simulation_over(&self) -> bool {
        self.rounds.is_simulation_over()
    }

    pub fn current_state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    pub fn history(&self) -> &[StateSnapshot] {
        &self.history
    }

    pub fn round_manager(&self) -> &RoundManager {
        &self.rounds
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.events
    }

    /// Mutable access for registering or removing event definitions.
    pub fn event_manager_mut(&mut self) -> &mut EventManager {
        &mut self.events
    }

    pub fn summary(&self) -> EngineSummary {
        EngineSummary {
            initialized: self.state.is_some(),
            current_round: self.rounds.current_round(),
            max_rounds: self.config.max_rounds,
            is_simulation_over: self.rounds.is_simulation_over(),
            total_events: self.events.history().len(),
            active_events: self.events.active_events().len(),
            kpis: self.state.as_ref().map(|s| s.kpis.clone()),
            history_len: self.history.len(),
        }
    }

    /// Replace the current state with one restored from its portable form.
    ///
    /// Active events and the round history are not part of a state and start empty.
    pub fn restore(&mut self, portable: serde_json::Value) -> Result<&SimulationState, RuntimeError> {
        let state = SimulationState::from_portable_form(portable, &mut self.rng)?;
        self.rounds.reset();
        self.rounds.resume_at(state.round_number);
        self.events.reset();
        self.history.clear();
        self.history.push(state.snapshot());
        warn!(round = state.round_number, "simulation restored; active events cleared");
        Ok(self.state.insert(state))
    }
}

/// Push round figures into the company ahead of its state update.
fn commit_round_results(company: &mut Company, results: &RoundResults) {
    let f = &mut company.financial;
    f.revenue = results.revenue;
    f.costs = results.costs;
    f.profit = results.revenue.saturating_sub(results.costs);
    company.set_market_share(results.market_share);
    company.operations.customer_satisfaction = results.customer_satisfaction;
}

/// Conditions the company sees: demand at the player's price, the price
/// index and the average competitor price.
fn market_conditions(market: &Market, company: &Company) -> MarketConditions {
    let state = market.state();
    let demand_level = market
        .calculate_demand(market.player_price(), &company.demand_factors())
        .unwrap_or_else(|e| {
            warn!(error = %e, "demand calculation failed; using market demand level");
            state.demand_level
        });
    MarketConditions {
        demand_level,
        price_index: state.price_index,
        market_price: market.average_competitor_price(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventConditions, EventDefinition, EventKind};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sim_core::{params, DecisionKind};

    fn config(max_rounds: u32, event_frequency: f64) -> SimConfig {
        SimConfig {
            max_rounds,
            event_frequency,
            ..SimConfig::default()
        }
    }

    fn engine(max_rounds: u32) -> SimulationEngine {
        SimulationEngine::new(config(max_rounds, 0.0)).unwrap()
    }

    fn plan() -> DecisionSet {
        let mut set = DecisionSet::new();
        set.insert("price_change".into(), params(&[("new_price", 110.0)]));
        set.insert("marketing_campaign".into(), params(&[("budget", 5000.0)]));
        set
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            SimulationEngine::new(config(0, 0.3)),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn run_before_initialize_fails_without_mutation() {
        let mut e = engine(5);
        let before = e.summary();
        let err = e.run_round(&plan()).unwrap_err();
        assert!(matches!(err, RuntimeError::NotInitialized));
        assert_eq!(e.summary(), before);
        assert_eq!(e.round_manager().current_round(), 0);
        assert!(e.history().is_empty());
    }

    #[test]
    fn initialize_records_first_snapshot() {
        let mut e = engine(5);
        let s = e.initialize().unwrap();
        assert_eq!(s.round_number, 0);
        assert_eq!(s.kpis, s.company.kpis());
        assert_eq!(s.market.competitors().competitors().len(), 3);
        assert_eq!(e.history().len(), 1);
        assert!(e.summary().initialized);
    }

    #[test]
    fn over_exactly_at_the_last_round() {
        let mut e = SimulationEngine::new(config(5, 0.3)).unwrap();
        e.initialize().unwrap();
        for round in 1..=5 {
            let out = e.run_round(&plan()).unwrap();
            assert_eq!(out.round_number, round);
            assert_eq!(out.is_simulation_over, round == 5);
            assert_eq!(e.is_simulation_over(), round == 5);
        }
        assert_eq!(e.history().len(), 6);
    }

    #[test]
    fn rounds_past_the_end_keep_the_last_number() {
        let mut e = engine(2);
        e.initialize().unwrap();
        for _ in 0..4 {
            e.run_round(&DecisionSet::new()).unwrap();
        }
        assert_eq!(e.current_state().map(|s| s.round_number), Some(2));
    }

    #[test]
    fn decisions_reach_company_and_market() {
        let mut e = engine(5);
        e.initialize().unwrap();
        let mut set = plan();
        set.insert("expansion".into(), params(&[("amount", 1.0)]));
        set.insert("hiring".into(), params(&[("num_employees", 2.5)]));
        let out = e.run_round(&set).unwrap();

        let outcomes = &out.processed_decisions.outcomes;
        assert_eq!(outcomes["expansion"], crate::round::DecisionOutcome::UnknownDecisionType);
        assert!(matches!(outcomes["hiring"], crate::round::DecisionOutcome::Invalid { .. }));
        let state = e.current_state().unwrap();
        assert_eq!(state.company.decision_log().len(), 2);
        assert!((state.market.state().price_index - 1.1).abs() < 1e-12);
        assert!((state.company.market.brand_value - 50.5).abs() < 1e-9);
        // 100k * 1.1 * 1.5, no events with zero frequency
        assert!((sim_core::to_f64(out.round_results.revenue) - 165_000.0).abs() < 1e-6);
        assert!(out.recommended_price > 0.0);
    }

    #[test]
    fn scheduled_regulation_fires_in_round_five() {
        let mut e = engine(6);
        e.initialize().unwrap();
        for _ in 0..4 {
            let out = e.run_round(&DecisionSet::new()).unwrap();
            assert!(out.triggered_events.is_empty());
        }
        let out = e.run_round(&DecisionSet::new()).unwrap();
        assert_eq!(out.triggered_events.len(), 1);
        assert_eq!(out.triggered_events[0].event.id, "regulatory_change");
        // A one-round event expires in the round it starts.
        assert_eq!(out.expired_events.len(), 1);
        assert!(out.event_impacts.is_empty());
        assert_eq!(e.event_manager().history().len(), 1);
    }

    #[test]
    fn active_event_impacts_shape_round_results() {
        let mut e = engine(5);
        e.event_manager_mut()
            .add_custom_event(EventDefinition {
                id: "slump".into(),
                name: "Slump".into(),
                description: String::new(),
                kind: EventKind::Scheduled,
                probability: 1.0,
                impact: [("revenue".to_string(), -0.5), ("demand".to_string(), 0.1)]
                    .into_iter()
                    .collect(),
                duration: 3,
                conditions: EventConditions::at_round(1),
            })
            .unwrap();
        e.initialize().unwrap();
        let out = e.run_round(&DecisionSet::new()).unwrap();
        assert_eq!(out.round_results.revenue, Decimal::new(50_000, 0));
        assert_eq!(out.round_results.profit, Decimal::new(-30_000, 0));
        assert_eq!(out.ignored_impacts, vec!["demand".to_string()]);
        assert_eq!(out.game_state.events.len(), 1);
        assert_eq!(out.game_state.market.state.active_events, vec!["slump".to_string()]);
    }

    #[test]
    fn decision_event_follows_its_decision() {
        let mut e = engine(5);
        let conditions = EventConditions {
            decision: Some(DecisionKind::Hiring),
            ..EventConditions::default()
        };
        e.event_manager_mut()
            .add_custom_event(EventDefinition {
                id: "morale".into(),
                name: "Morale Boost".into(),
                description: String::new(),
                kind: EventKind::Decision,
                probability: 1.0,
                impact: [("customer_satisfaction".to_string(), 0.05)].into_iter().collect(),
                duration: 2,
                conditions,
            })
            .unwrap();
        e.initialize().unwrap();
        assert!(e.run_round(&DecisionSet::new()).unwrap().triggered_events.is_empty());
        let mut set = DecisionSet::new();
        set.insert("hiring".into(), params(&[("num_employees", 5.0)]));
        let out = e.run_round(&set).unwrap();
        assert_eq!(out.triggered_events.len(), 1);
        assert_eq!(out.event_impacts["customer_satisfaction"], 0.05);
    }

    #[test]
    fn same_seed_same_rounds() {
        let play = || {
            let mut e = SimulationEngine::new(config(8, 0.9)).unwrap();
            e.initialize().unwrap();
            (0..8)
                .map(|_| {
                    let out = e.run_round(&plan()).unwrap();
                    (
                        out.round_results,
                        out.event_impacts,
                        out.competitor_update,
                        out.game_state.kpis,
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn reinitialize_starts_over() {
        let mut e = engine(3);
        e.initialize().unwrap();
        let first = e.run_round(&plan()).unwrap();
        e.run_round(&plan()).unwrap();
        e.initialize().unwrap();
        assert_eq!(e.history().len(), 1);
        assert_eq!(e.round_manager().current_round(), 0);
        let again = e.run_round(&plan()).unwrap();
        assert_eq!(again.round_results, first.round_results);
        assert_eq!(again.competitor_update, first.competitor_update);
    }

    #[test]
    fn scenario_overrides_apply_at_start() {
        let mut e = engine(10);
        let scenario: Scenario = serde_json::from_value(json!({
            "name": "boom",
            "market": {"demand_level": 1800.0, "competition_intensity": 0.2},
            "starting": {
                "round_number": 4,
                "company": {"id": "acme", "name": "Acme", "market": {"market_share": 0.3}}
            }
        }))
        .unwrap();
        let s = e.initialize_with(&scenario).unwrap();
        assert_eq!(s.round_number, 4);
        assert_eq!(s.company.id, "acme");
        assert_eq!(s.company.market.market_share, 0.3);
        assert_eq!(s.market.state().demand_level, 1800.0);
        assert_eq!(e.run_round(&DecisionSet::new()).unwrap().round_number, 5);
    }

    #[test]
    fn restore_resumes_from_portable_state() {
        let mut e = engine(6);
        e.initialize().unwrap();
        e.run_round(&plan()).unwrap();
        e.run_round(&plan()).unwrap();
        let saved = e.current_state().unwrap().to_portable_form().unwrap();

        let mut other = engine(6);
        let s = other.restore(saved).unwrap();
        assert_eq!(s.round_number, 2);
        assert!(other.event_manager().active_events().is_empty());
        assert!(other.event_manager().history().is_empty());
        assert_eq!(other.history().len(), 1);
        assert_eq!(other.run_round(&plan()).unwrap().round_number, 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn rounds_preserve_company_invariants(seed in any::<u64>(),
                                              price in 1.0f64..1000.0,
                                              budget in 0.0f64..1e9,
                                              investment in 0.0f64..1e9) {
            let mut e = SimulationEngine::new(SimConfig {
                rng_seed: seed,
                max_rounds: 6,
                event_frequency: 1.0,
                ..SimConfig::default()
            }).unwrap();
            e.initialize().unwrap();
            let mut set = DecisionSet::new();
            set.insert("price_change".into(), params(&[("new_price", price)]));
            set.insert("marketing_campaign".into(), params(&[("budget", budget)]));
            set.insert("quality_improvement".into(), params(&[("investment", investment)]));
            for _ in 0..6 {
                let out = e.run_round(&set).unwrap();
                let c = &e.current_state().unwrap().company;
                prop_assert_eq!(c.financial.profit, c.financial.revenue - c.financial.costs);
                prop_assert!((0.0..=0.5).contains(&c.market.market_share));
                prop_assert!((0.0..=1.0).contains(&c.operations.customer_satisfaction));
                prop_assert!((0.0..=1.0).contains(&c.operations.utilization));
                prop_assert!((0.0..=1.0).contains(&out.round_results.market_share));
                prop_assert_eq!(out.game_state.kpis, c.kpis());
            }
        }
    }
}
