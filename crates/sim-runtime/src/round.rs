//! Round counter, decision processing and per-round result computation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::company::REFERENCE_PRICE;
use sim_core::{clamp_unit, money, Company, Decision, DecisionError, DecisionKind, DecisionSet};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::events::Impacts;

/// Revenue before decision effects.
pub const BASELINE_REVENUE: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
/// Costs booked in every round's baseline result.
pub const BASELINE_COSTS: Decimal = Decimal::from_parts(80_000, 0, 0, false, 0);

const MAX_MARKETING_UPLIFT: f64 = 0.5;
const MARKETING_UPLIFT_SCALE: f64 = 10_000.0;

/// What happened to one submitted decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Applied { decision: Decision },
    Invalid { reason: String },
    UnknownDecisionType,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDecisions {
    pub round: u32,
    pub decisions_processed: usize,
    pub outcomes: BTreeMap<String, DecisionOutcome>,
}

impl ProcessedDecisions {
    pub fn applied(&self) -> impl Iterator<Item = &Decision> {
        self.outcomes.values().filter_map(|o| match o {
            DecisionOutcome::Applied { decision } => Some(decision),
            _ => None,
        })
    }

    pub fn applied_kinds(&self) -> Vec<DecisionKind> {
        self.applied().map(Decision::kind).collect()
    }

    pub fn new_price(&self) -> Option<f64> {
        self.applied().find_map(|d| match d {
            Decision::PriceChange { new_price } => Some(*new_price),
            _ => None,
        })
    }

    pub fn marketing_budget(&self) -> Option<f64> {
        self.applied().find_map(|d| match d {
            Decision::MarketingCampaign { budget } => Some(*budget),
            _ => None,
        })
    }
}

/// Headline figures of one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundResults {
    pub round: u32,
    pub revenue: Decimal,
    pub costs: Decimal,
    pub profit: Decimal,
    pub market_share: f64,
    pub customer_satisfaction: f64,
    pub summary: String,
}

impl RoundResults {
    fn money_mut(&mut self, metric: RoundMetric) -> Option<&mut Decimal> {
        match metric {
            RoundMetric::Revenue => Some(&mut self.revenue),
            RoundMetric::Costs => Some(&mut self.costs),
            RoundMetric::Profit => Some(&mut self.profit),
            _ => None,
        }
    }

    fn ratio_mut(&mut self, metric: RoundMetric) -> Option<&mut f64> {
        match metric {
            RoundMetric::MarketShare => Some(&mut self.market_share),
            RoundMetric::CustomerSatisfaction => Some(&mut self.customer_satisfaction),
            _ => None,
        }
    }
}

/// Round result fields that event impacts may target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundMetric {
    Revenue,
    Costs,
    Profit,
    MarketShare,
    CustomerSatisfaction,
}

/// How an impact combines with a metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpactPolicy {
    /// `value *= 1 + impact`
    Multiplicative,
    /// `value = clamp(value + impact, 0, 1)`
    AdditiveUnit,
}

impl RoundMetric {
    /// Application order; profit follows revenue and costs.
    pub const ALL: [RoundMetric; 5] = [
        RoundMetric::Revenue,
        RoundMetric::Costs,
        RoundMetric::Profit,
        RoundMetric::MarketShare,
        RoundMetric::CustomerSatisfaction,
    ];

    pub fn key(self) -> &'static str {
        match self {
            RoundMetric::Revenue => "revenue",
            RoundMetric::Costs => "costs",
            RoundMetric::Profit => "profit",
            RoundMetric::MarketShare => "market_share",
            RoundMetric::CustomerSatisfaction => "customer_satisfaction",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn policy(self) -> ImpactPolicy {
        match self {
            RoundMetric::Revenue | RoundMetric::Costs | RoundMetric::Profit => {
                ImpactPolicy::Multiplicative
            }
            RoundMetric::MarketShare | RoundMetric::CustomerSatisfaction => {
                ImpactPolicy::AdditiveUnit
            }
        }
    }
}

/// Apply combined event impacts to round results.
///
/// Profit is recomputed from the impacted revenue and costs before its own
/// impact. Returns the impact keys that matched no round metric.
pub fn apply_event_impacts(results: &mut RoundResults, impacts: &Impacts) -> Vec<String> {
    for metric in RoundMetric::ALL {
        if metric == RoundMetric::Profit {
            results.profit = results.revenue.saturating_sub(results.costs);
        }
        let Some(&impact) = impacts.get(metric.key()) else {
            continue;
        };
        debug!(metric = metric.key(), impact, "applying event impact");
        match metric.policy() {
            ImpactPolicy::Multiplicative => {
                if let Some(value) = results.money_mut(metric) {
                    *value = value.saturating_mul(money(1.0 + impact));
                }
            }
            ImpactPolicy::AdditiveUnit => {
                if let Some(value) = results.ratio_mut(metric) {
                    *value = clamp_unit(*value + impact);
                }
            }
        }
    }

    let ignored: Vec<String> = impacts
        .keys()
        .filter(|k| RoundMetric::from_key(k).is_none())
        .cloned()
        .collect();
    for key in &ignored {
        warn!(metric = %key, "event impact has no round result to apply to");
    }
    ignored
}

/// Tracks the round counter and turns decisions into round results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundManager {
    current_round: u32,
    max_rounds: u32,
}

impl RoundManager {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            current_round: 0,
            max_rounds,
        }
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Move to the next round, never past `max_rounds`.
    pub fn advance_round(&mut self) -> u32 {
        if self.current_round < self.max_rounds {
            self.current_round += 1;
        }
        self.current_round
    }

    /// Continue from a saved round number.
    pub fn resume_at(&mut self, round: u32) {
        self.current_round = round.min(self.max_rounds);
    }

    pub fn is_simulation_over(&self) -> bool {
        self.current_round >= self.max_rounds
    }

    pub fn reset(&mut self) {
        self.current_round = 0;
    }

    /// Validate every submitted decision and apply the valid ones to `company`.
    ///
    /// Invalid and unknown decisions are reported, never fatal.
    pub fn process_decisions(&self, company: &mut Company, decisions: &DecisionSet) -> ProcessedDecisions {
        let round = self.current_round;
        let outcomes = decisions
            .iter()
            .map(|(kind, params)| {
                let outcome = match Decision::parse(kind, params) {
                    Ok(decision) => {
                        company.apply(decision.clone(), round);
                        DecisionOutcome::Applied { decision }
                    }
                    Err(DecisionError::UnknownKind(_)) => {
                        warn!(kind = %kind, "unknown decision type");
                        DecisionOutcome::UnknownDecisionType
                    }
                    Err(e) => {
                        warn!(kind = %kind, error = %e, "invalid decision");
                        DecisionOutcome::Invalid {
                            reason: e.to_string(),
                        }
                    }
                };
                (kind.clone(), outcome)
            })
            .collect();
        ProcessedDecisions {
            round,
            decisions_processed: decisions.len(),
            outcomes,
        }
    }

    /// Baseline results: revenue scaled by the pricing and marketing
    /// decisions, fixed costs, and the company's share and satisfaction.
    pub fn calculate_round_results(&self, company: &Company, processed: &ProcessedDecisions) -> RoundResults {
        let price_multiplier = processed
            .new_price()
            .map(|p| (p / REFERENCE_PRICE).clamp(0.5, 1.5))
            .unwrap_or(1.0);
        let marketing_uplift = processed
            .marketing_budget()
            .map(|b| (b / MARKETING_UPLIFT_SCALE).min(MAX_MARKETING_UPLIFT))
            .unwrap_or(0.0);

        let revenue = BASELINE_REVENUE
            .saturating_mul(money(price_multiplier))
            .saturating_mul(money(1.0 + marketing_uplift));
        let costs = BASELINE_COSTS;
        RoundResults {
            round: self.current_round,
            revenue,
            costs,
            profit: revenue.saturating_sub(costs),
            market_share: company.market.market_share,
            customer_satisfaction: company.operations.customer_satisfaction,
            summary: format!("Round {} completed", self.current_round),
        }
    }
}
