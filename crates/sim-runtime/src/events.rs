//! Event system: definitions, eligibility, triggering, expiry and impact
//! aggregation.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sim_core::{clamp_unit, DecisionKind, SimRng, ValidationError};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Signed per-metric deltas keyed by metric name.
pub type Impacts = BTreeMap<String, f64>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Eligible when conditions hold and a probability roll succeeds.
    Random,
    /// Eligible whenever conditions hold.
    Scheduled,
    /// Eligible when conditions hold and the named decision was applied.
    Decision,
}

/// Prerequisites for an event. Unrecognized keys are kept but never checked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionKind>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EventConditions {
    pub fn at_round(round: u32) -> Self {
        Self {
            round: Some(round),
            ..Self::default()
        }
    }

    pub fn is_met(&self, round: u32, applied: &[DecisionKind]) -> bool {
        if self.round.is_some_and(|r| round != r) {
            return false;
        }
        if self.min_round.is_some_and(|r| round < r) {
            return false;
        }
        if self.max_round.is_some_and(|r| round > r) {
            return false;
        }
        match self.decision {
            Some(kind) => applied.contains(&kind),
            None => true,
        }
    }
}

/// A kind of event that may occur during the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Chance per round for random events.
    #[serde(default)]
    pub probability: f64,
    pub impact: Impacts,
    /// Rounds the event stays active.
    pub duration: u32,
    #[serde(default)]
    pub conditions: EventConditions,
}

impl EventDefinition {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.probability.is_finite() {
            return Err(ValidationError::NonFinite("probability"));
        }
        if self.probability < 0.0 {
            return Err(ValidationError::Negative("probability"));
        }
        if self.impact.values().any(|v| !v.is_finite()) {
            return Err(ValidationError::NonFinite("impact"));
        }
        Ok(())
    }
}

/// A triggered event that has not yet expired.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub event: EventDefinition,
    pub triggered_round: u32,
    pub remaining_duration: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventHistoryEntry {
    pub event_id: String,
    pub triggered_round: u32,
    pub timestamp: DateTime<Utc>,
}

/// The built-in event catalog.
pub fn default_catalog() -> Vec<EventDefinition> {
    fn def(
        id: &str,
        name: &str,
        description: &str,
        kind: EventKind,
        probability: f64,
        impact: &[(&str, f64)],
        duration: u32,
        conditions: EventConditions,
    ) -> EventDefinition {
        EventDefinition {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind,
            probability,
            impact: impact.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
            duration,
            conditions,
        }
    }

    vec![
        def(
            "market_crash",
            "Market Crash",
            "Sudden market downturn affects all companies",
            EventKind::Random,
            0.1,
            &[("revenue", -0.3), ("market_share", -0.1)],
            2,
            EventConditions::default(),
        ),
        def(
            "tech_breakthrough",
            "Technology Breakthrough",
            "New technology increases efficiency",
            EventKind::Random,
            0.15,
            &[("efficiency", 0.2), ("costs", -0.1)],
            3,
            EventConditions::default(),
        ),
        def(
            "regulatory_change",
            "Regulatory Change",
            "New regulations increase compliance costs",
            EventKind::Scheduled,
            1.0,
            &[("costs", 0.15)],
            1,
            EventConditions::at_round(5),
        ),
        def(
            "economic_boom",
            "Economic Boom",
            "Strong economic growth boosts demand",
            EventKind::Random,
            0.2,
            &[("demand", 0.25), ("revenue", 0.15)],
            2,
            EventConditions::default(),
        ),
    ]
}

/// Owns event definitions, the active list and the trigger history.
#[derive(Clone, Debug)]
pub struct EventManager {
    definitions: BTreeMap<String, EventDefinition>,
    active: Vec<ActiveEvent>,
    history: Vec<EventHistoryEntry>,
    rng: SimRng,
    probability_scale: f64,
}

impl EventManager {
    pub fn new(rng: SimRng) -> Self {
        Self {
            definitions: default_catalog()
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
            active: Vec::new(),
            history: Vec::new(),
            rng,
            probability_scale: 1.0,
        }
    }

    /// Multiply random event probabilities by `scale` (results clamp to [0, 1]).
    pub fn with_probability_scale(mut self, scale: f64) -> Self {
        self.probability_scale = scale;
        self
    }

    pub fn reseed(&mut self, rng: SimRng) {
        self.rng = rng;
    }

    pub fn definitions(&self) -> impl Iterator<Item = &EventDefinition> {
        self.definitions.values()
    }

    pub fn definition(&self, id: &str) -> Option<&EventDefinition> {
        self.definitions.get(id)
    }

    /// Random events whose conditions hold and whose probability roll succeeds.
    ///
    /// Rolls once per eligible random definition, in id order.
    pub fn generate_random_events(&mut self, round: u32) -> Vec<EventDefinition> {
        let scale = self.probability_scale;
        let rng = &mut self.rng;
        self.definitions
            .values()
            .filter(|d| d.kind == EventKind::Random && d.conditions.is_met(round, &[]))
            .filter(|d| rng.gen::<f64>() < clamp_unit(d.probability * scale))
            .cloned()
            .collect()
    }

    /// Scheduled events whose conditions hold for `round`.
    pub fn process_scheduled_events(&self, round: u32) -> Vec<EventDefinition> {
        self.definitions
            .values()
            .filter(|d| d.kind == EventKind::Scheduled && d.conditions.is_met(round, &[]))
            .cloned()
            .collect()
    }

    /// Decision-triggered events made eligible by the decisions applied this round.
    pub fn decision_events(&self, round: u32, applied: &[DecisionKind]) -> Vec<EventDefinition> {
        self.definitions
            .values()
            .filter(|d| {
                d.kind == EventKind::Decision
                    && d.conditions.decision.is_some()
                    && d.conditions.is_met(round, applied)
            })
            .cloned()
            .collect()
    }

    /// Activate `event` and record it in the history.
    pub fn trigger_event(&mut self, event: &EventDefinition, round: u32) -> ActiveEvent {
        info!(event = %event.id, round, duration = event.duration, "event triggered");
        let active = ActiveEvent {
            event: event.clone(),
            triggered_round: round,
            remaining_duration: event.duration,
        };
        self.active.push(active.clone());
        self.history.push(EventHistoryEntry {
            event_id: event.id.clone(),
            triggered_round: round,
            timestamp: Utc::now(),
        });
        active
    }

    /// Count every active event down by one round; remove and return those
    /// that reach zero.
    pub fn process_active_events(&mut self) -> Vec<ActiveEvent> {
        let mut expired = Vec::new();
        let mut still_active = Vec::with_capacity(self.active.len());
        for mut ev in self.active.drain(..) {
            ev.remaining_duration = ev.remaining_duration.saturating_sub(1);
            if ev.remaining_duration == 0 {
                info!(event = %ev.event.id, "event expired");
                expired.push(ev);
            } else {
                still_active.push(ev);
            }
        }
        self.active = still_active;
        expired
    }

    /// Per-metric sum of the impacts of every active event.
    pub fn active_event_impacts(&self) -> Impacts {
        let mut total = Impacts::new();
        for ev in &self.active {
            for (metric, delta) in &ev.event.impact {
                *total.entry(metric.clone()).or_insert(0.0) += delta;
            }
        }
        debug!(?total, "combined event impacts");
        total
    }

    pub fn active_events(&self) -> &[ActiveEvent] {
        &self.active
    }

    pub fn history(&self) -> &[EventHistoryEntry] {
        &self.history
    }

    /// Add or replace a definition, returning the one it replaced.
    pub fn add_custom_event(
        &mut self,
        event: EventDefinition,
    ) -> Result<Option<EventDefinition>, ValidationError> {
        event.validate()?;
        Ok(self.definitions.insert(event.id.clone(), event))
    }

    pub fn remove_event(&mut self, id: &str) -> Option<EventDefinition> {
        self.definitions.remove(id)
    }

    /// Drop active events and history; definitions are kept.
    pub fn reset(&mut self) {
        self.active.clear();
        self.history.clear();
    }
}
