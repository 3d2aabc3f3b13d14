#![deny(warnings)]

//! Competitor AI: rival companies seeded from strategy archetypes that react
//! to the player's price and market share every round.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{clamp_unit, SimRng};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Aggregate market share split evenly among competitors at start.
pub const COMPETITOR_SHARE_POOL: f64 = 0.25;
/// Starting competitor price.
pub const STARTING_PRICE: f64 = 100.0;
/// Lowest price a competitor will charge.
pub const MIN_PRICE: f64 = 1.0;
pub const MIN_COMPETITOR_SHARE: f64 = 0.01;
pub const MAX_COMPETITOR_SHARE: f64 = 0.5;

const PARAM_PERTURBATION: f64 = 0.1;
const STARTING_QUALITY: f64 = 0.7;
const PRICE_GAP_THRESHOLD: f64 = 5.0;
const QUALITY_ROLL: f64 = 0.2;
const SHARE_DEFENSE_RATIO: f64 = 1.2;
const SHARE_PER_AGGRESSIVE_MOVE: f64 = 0.02;

/// Named strategy templates used to seed competitors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    CostLeader,
    QualityFocused,
    Balanced,
}

impl Archetype {
    /// Seeding order; competitor `i` uses `ALL[i % 3]`.
    pub const ALL: [Archetype; 3] = [
        Archetype::CostLeader,
        Archetype::QualityFocused,
        Archetype::Balanced,
    ];

    pub fn profile(self) -> StrategyProfile {
        let (aggressiveness, price_sensitivity, innovation_focus) = match self {
            Archetype::CostLeader => (0.8, 0.9, 0.3),
            Archetype::QualityFocused => (0.5, 0.6, 0.8),
            Archetype::Balanced => (0.6, 0.7, 0.5),
        };
        StrategyProfile {
            aggressiveness,
            price_sensitivity,
            innovation_focus,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Archetype::CostLeader => "cost_leader",
            Archetype::QualityFocused => "quality_focused",
            Archetype::Balanced => "balanced",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavioural parameters, each in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub aggressiveness: f64,
    pub price_sensitivity: f64,
    pub innovation_focus: f64,
}

impl StrategyProfile {
    fn perturbed(&self, rng: &mut SimRng) -> Self {
        let mut jitter = |v: f64| {
            clamp_unit(v + rng.gen_range(-PARAM_PERTURBATION..=PARAM_PERTURBATION))
        };
        Self {
            aggressiveness: jitter(self.aggressiveness),
            price_sensitivity: jitter(self.price_sensitivity),
            innovation_focus: jitter(self.innovation_focus),
        }
    }
}

/// What a competitor decided this round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAction {
    pub price_change: f64,
    pub quality_change: f64,
    pub aggressive_move: f64,
}

/// An AI-controlled rival.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: String,
    pub name: String,
    pub strategy: Archetype,
    pub profile: StrategyProfile,
    pub market_share: f64,
    pub price: f64,
    pub quality: f64,
    #[serde(default)]
    pub last_action: Option<CompetitorAction>,
}

impl Competitor {
    fn decide(&self, player_price: f64, player_share: f64, rng: &mut SimRng) -> CompetitorAction {
        let mut action = CompetitorAction::default();
        let p = &self.profile;

        // Reactions close part of the gap to the player's price.
        let gap = player_price - self.price;
        if gap.abs() > PRICE_GAP_THRESHOLD {
            if p.price_sensitivity > 0.7 {
                action.price_change = gap * 0.3 * p.aggressiveness;
            } else if self.strategy == Archetype::CostLeader {
                action.price_change = gap * 0.5;
            }
        }

        if p.innovation_focus > 0.6 && rng.gen::<f64>() < QUALITY_ROLL {
            action.quality_change = 0.05 * p.innovation_focus;
        }

        if player_share > self.market_share * SHARE_DEFENSE_RATIO {
            action.aggressive_move = 0.1 * p.aggressiveness;
        }
        action
    }

    fn apply(&mut self, action: &CompetitorAction) {
        let price = self.price + action.price_change;
        self.price = if price.is_finite() { price.max(MIN_PRICE) } else { STARTING_PRICE };
        self.quality = clamp_unit(self.quality + action.quality_change);
        self.market_share = (self.market_share + action.aggressive_move * SHARE_PER_AGGRESSIVE_MOVE)
            .clamp(MIN_COMPETITOR_SHARE, MAX_COMPETITOR_SHARE);
        self.last_action = Some(action.clone());
    }

    pub fn summary(&self) -> CompetitorSummary {
        CompetitorSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            strategy: self.strategy,
            market_share: self.market_share,
            price: self.price,
            quality: self.quality,
        }
    }
}

/// Market-wide signals derived from all competitor actions in a round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketImpacts {
    /// Sum of price cuts weighted by market share; negative when rivals raise prices.
    pub price_pressure: f64,
    /// Sum of quality changes weighted by innovation focus.
    pub quality_competition: f64,
    /// Sum of aggressive moves weighted by aggressiveness.
    pub market_share_shift: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorUpdate {
    pub actions: BTreeMap<String, CompetitorAction>,
    pub impacts: MarketImpacts,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSummary {
    pub id: String,
    pub name: String,
    pub strategy: Archetype,
    pub market_share: f64,
    pub price: f64,
    pub quality: f64,
}

/// Owns the competitors and the random stream driving their choices.
#[derive(Clone, Debug)]
pub struct CompetitorAi {
    competitors: Vec<Competitor>,
    rng: SimRng,
}

impl CompetitorAi {
    /// Seed `count` competitors, cycling through [`Archetype::ALL`].
    pub fn new(count: usize, mut rng: SimRng) -> Self {
        let share = if count > 0 {
            COMPETITOR_SHARE_POOL / count as f64
        } else {
            0.0
        };
        let competitors = (0..count)
            .map(|i| {
                let strategy = Archetype::ALL[i % Archetype::ALL.len()];
                let profile = strategy.profile().perturbed(&mut rng);
                let quality = clamp_unit(
                    STARTING_QUALITY + rng.gen_range(-PARAM_PERTURBATION..=PARAM_PERTURBATION),
                );
                Competitor {
                    id: format!("competitor_{}", i + 1),
                    name: format!("Competitor Company {}", i + 1),
                    strategy,
                    profile,
                    market_share: share,
                    price: STARTING_PRICE,
                    quality,
                    last_action: None,
                }
            })
            .collect();
        Self { competitors, rng }
    }

    /// Resume with previously saved competitors.
    pub fn from_competitors(competitors: Vec<Competitor>, rng: SimRng) -> Self {
        Self { competitors, rng }
    }

    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    /// Let every competitor react to the player, apply the reactions and
    /// return them with the aggregated market impacts.
    pub fn update_competitor_actions(&mut self, player_price: f64, player_share: f64) -> CompetitorUpdate {
        let mut update = CompetitorUpdate::default();
        for competitor in &mut self.competitors {
            let action = competitor.decide(player_price, player_share, &mut self.rng);
            let impacts = &mut update.impacts;
            impacts.price_pressure -= action.price_change * competitor.market_share;
            impacts.quality_competition += action.quality_change * competitor.profile.innovation_focus;
            impacts.market_share_shift += action.aggressive_move * competitor.profile.aggressiveness;
            debug!(competitor = %competitor.id, ?action, "competitor reacted");
            competitor.apply(&action);
            update.actions.insert(competitor.id.clone(), action);
        }
        update
    }

    pub fn prices(&self) -> Vec<f64> {
        self.competitors.iter().map(|c| c.price).collect()
    }

    /// Mean competitor price, or `None` without competitors.
    pub fn average_price(&self) -> Option<f64> {
        if self.competitors.is_empty() {
            return None;
        }
        Some(self.competitors.iter().map(|c| c.price).sum::<f64>() / self.competitors.len() as f64)
    }

    pub fn summaries(&self) -> Vec<CompetitorSummary> {
        self.competitors.iter().map(Competitor::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::seeded_rng;

    fn rival(strategy: Archetype, profile: StrategyProfile, share: f64) -> Competitor {
        Competitor {
            id: "c".into(),
            name: "C".into(),
            strategy,
            profile,
            market_share: share,
            price: 100.0,
            quality: 0.7,
            last_action: None,
        }
    }

    fn profile(aggressiveness: f64, price_sensitivity: f64, innovation_focus: f64) -> StrategyProfile {
        StrategyProfile {
            aggressiveness,
            price_sensitivity,
            innovation_focus,
        }
    }

    #[test]
    fn seeding_cycles_archetypes_and_splits_share() {
        let ai = CompetitorAi::new(4, seeded_rng(5));
        let c = ai.competitors();
        assert_eq!(c.len(), 4);
        assert_eq!(c[0].id, "competitor_1");
        assert_eq!(c[3].strategy, Archetype::CostLeader);
        assert_eq!(c[1].strategy, Archetype::QualityFocused);
        for comp in c {
            assert!((comp.market_share - 0.0625).abs() < 1e-12);
            assert_eq!(comp.price, STARTING_PRICE);
            assert!((0.6..=0.8).contains(&comp.quality));
            let base = comp.strategy.profile();
            assert!((comp.profile.aggressiveness - base.aggressiveness).abs() <= 0.1 + 1e-12);
            assert!((comp.profile.innovation_focus - base.innovation_focus).abs() <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn price_sensitive_rival_undercuts_proportionally() {
        let c = rival(Archetype::Balanced, profile(0.8, 0.9, 0.0), 0.3);
        let mut rng = seeded_rng(1);
        let a = c.decide(80.0, 0.1, &mut rng);
        // -20 * 0.3 * 0.8
        assert!((a.price_change + 4.8).abs() < 1e-12);
        let a = c.decide(120.0, 0.1, &mut rng);
        assert!((a.price_change - 4.8).abs() < 1e-12);
        let a = c.decide(103.0, 0.1, &mut rng);
        assert_eq!(a.price_change, 0.0);
    }

    #[test]
    fn seeded_rivals_react_by_sensitivity_then_archetype() {
        for seed in 0..5 {
            let mut ai = CompetitorAi::new(3, seeded_rng(seed));
            let update = ai.update_competitor_actions(80.0, 0.0);
            for c in ai.competitors() {
                let change = update.actions[&c.id].price_change;
                match c.strategy {
                    // Seeded sensitivity is at least 0.8: the proportional rule wins.
                    Archetype::CostLeader => {
                        assert!(c.profile.price_sensitivity > 0.7);
                        assert!((change + 6.0 * c.profile.aggressiveness).abs() < 1e-12);
                        assert!((-5.4..=-4.2).contains(&change));
                    }
                    // Seeded sensitivity is at most 0.7: no price reaction.
                    Archetype::QualityFocused => assert_eq!(change, 0.0),
                    Archetype::Balanced => {
                        let expected = if c.profile.price_sensitivity > 0.7 {
                            -6.0 * c.profile.aggressiveness
                        } else {
                            0.0
                        };
                        assert!((change - expected).abs() < 1e-12);
                    }
                }
                assert_eq!(update.actions[&c.id].aggressive_move, 0.0);
            }
        }
    }

    #[test]
    fn insensitive_cost_leader_matches_half_the_gap() {
        // Only reachable through a supplied competitor list.

        let c = rival(Archetype::CostLeader, profile(0.8, 0.65, 0.0), 0.3);
        let a = c.decide(80.0, 0.1, &mut seeded_rng(1));
        assert!((a.price_change + 10.0).abs() < 1e-12);
        let quality = rival(Archetype::QualityFocused, profile(0.8, 0.65, 0.0), 0.3);
        assert_eq!(quality.decide(80.0, 0.1, &mut seeded_rng(1)).price_change, 0.0);
    }

    #[test]
    fn defends_share_when_player_pulls_ahead() {
        let c = rival(Archetype::Balanced, profile(0.6, 0.5, 0.0), 0.1);
        let mut rng = seeded_rng(1);
        assert_eq!(c.decide(100.0, 0.11, &mut rng).aggressive_move, 0.0);
        let a = c.decide(100.0, 0.2, &mut rng);
        assert!((a.aggressive_move - 0.06).abs() < 1e-12);

        let mut ai = CompetitorAi::from_competitors(vec![c], seeded_rng(1));
        let update = ai.update_competitor_actions(100.0, 0.2);
        assert!((ai.competitors()[0].market_share - (0.1 + 0.06 * 0.02)).abs() < 1e-12);
        assert!((update.impacts.market_share_shift - 0.06 * 0.6).abs() < 1e-12);
        assert_eq!(update.impacts.price_pressure, 0.0);
    }

    #[test]
    fn innovation_gate_blocks_quality_moves() {
        let c = rival(Archetype::QualityFocused, profile(0.5, 0.5, 0.6), 0.1);
        let mut rng = seeded_rng(1);
        for _ in 0..50 {
            assert_eq!(c.decide(100.0, 0.0, &mut rng).quality_change, 0.0);
        }
        let c = rival(Archetype::QualityFocused, profile(0.5, 0.5, 0.9), 0.1);
        let moves = (0..200)
            .filter(|_| c.decide(100.0, 0.0, &mut rng).quality_change > 0.0)
            .count();
        assert!(moves > 0 && moves < 200);
    }

    #[test]
    fn price_pressure_is_share_weighted() {
        let a = rival(Archetype::Balanced, profile(0.5, 0.9, 0.0), 0.2);
        let mut b = rival(Archetype::Balanced, profile(1.0, 0.9, 0.0), 0.1);
        b.id = "d".into();
        let mut ai = CompetitorAi::from_competitors(vec![a, b], seeded_rng(2));
        let update = ai.update_competitor_actions(90.0, 0.0);
        // cuts of 1.5 and 3.0 weighted by 0.2 and 0.1
        assert!((update.impacts.price_pressure - 0.6).abs() < 1e-12);
        assert_eq!(update.actions.len(), 2);
        let prices = ai.prices();
        assert!((prices[0] - 98.5).abs() < 1e-9);
        assert!((prices[1] - 97.0).abs() < 1e-9);
        assert!(ai.competitors()[0].last_action.is_some());
    }

    #[test]
    fn same_seed_same_reactions() {
        let mut a = CompetitorAi::new(3, seeded_rng(42));
        let mut b = CompetitorAi::new(3, seeded_rng(42));
        for round in 0..10 {
            let price = 80.0 + round as f64 * 5.0;
            assert_eq!(
                a.update_competitor_actions(price, 0.2),
                b.update_competitor_actions(price, 0.2)
            );
        }
        assert_eq!(a.summaries(), b.summaries());
    }

    #[test]
    fn average_price_needs_competitors() {
        assert_eq!(CompetitorAi::new(0, seeded_rng(1)).average_price(), None);
        assert_eq!(CompetitorAi::new(2, seeded_rng(1)).average_price(), Some(100.0));
    }

    proptest! {
        #[test]
        fn competitor_state_stays_in_range(seed in any::<u64>(),
                                           prices in proptest::collection::vec(0.01f64..10_000.0, 1..30),
                                           share in 0.0f64..1.0) {
            let mut ai = CompetitorAi::new(3, seeded_rng(seed));
            for p in prices {
                ai.update_competitor_actions(p, share);
            }
            for c in ai.competitors() {
                prop_assert!(c.price >= MIN_PRICE);
                prop_assert!((0.0..=1.0).contains(&c.quality));
                prop_assert!((MIN_COMPETITOR_SHARE..=MAX_COMPETITOR_SHARE).contains(&c.market_share));
            }
        }
    }
}
