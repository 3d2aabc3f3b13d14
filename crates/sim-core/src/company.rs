//! The player-controlled company: attribute groups, cost model, decision
//! application and per-round state updates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::decision::{Decision, DecisionParams, DecisionRecord};
use crate::market::{DemandFactors, MarketConditions};
use crate::metrics::Kpis;
use crate::{clamp_unit, money, to_f64, PortableError};

/// Ceiling for the player's market share.
pub const MAX_MARKET_SHARE: f64 = 0.5;
/// Number of performance snapshots retained.
pub const PERFORMANCE_HISTORY_LEN: usize = 50;
/// Price corresponding to a price index of 1.0.
pub const REFERENCE_PRICE: f64 = 100.0;

const BRAND_PER_MARKETING_DOLLAR: f64 = 1.0 / 10_000.0;
const SHARE_PER_MARKETING_DOLLAR: f64 = 1.0 / 1_000_000.0;
const QUALITY_INVESTMENT_SCALE: f64 = 50_000.0;
const MAX_QUALITY_STEP: f64 = 0.1;

/// Financial attributes. `profit` is always derived from revenue and costs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialData {
    pub revenue: Decimal,
    pub costs: Decimal,
    pub profit: Decimal,
    pub cash: Decimal,
    pub cash_flow: Decimal,
    pub assets: Decimal,
    pub liabilities: Decimal,
}

/// Operational attributes; ratios live in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsData {
    /// Units per round (>= 0).
    pub capacity: f64,
    pub efficiency: f64,
    pub quality: f64,
    pub customer_satisfaction: f64,
    pub utilization: f64,
}

impl Default for OperationsData {
    fn default() -> Self {
        Self {
            capacity: 1000.0,
            efficiency: 0.8,
            quality: 0.75,
            customer_satisfaction: 0.7,
            utilization: 0.0,
        }
    }
}

/// Headcount and asset values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceData {
    pub employee_count: u32,
    pub equipment_value: Decimal,
    pub inventory_value: Decimal,
}

impl Default for ResourceData {
    fn default() -> Self {
        Self {
            employee_count: 100,
            equipment_value: Decimal::new(100_000, 0),
            inventory_value: Decimal::new(50_000, 0),
        }
    }
}

/// Position of the company in its market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketPosition {
    /// Share of market demand served, in [0, MAX_MARKET_SHARE].
    pub market_share: f64,
    pub brand_value: f64,
    /// Relative standing in [0, 1].
    pub competitive_position: f64,
}

impl Default for MarketPosition {
    fn default() -> Self {
        Self {
            market_share: 0.15,
            brand_value: 50.0,
            competitive_position: 0.5,
        }
    }
}

/// Per-round cost parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Operating cost per utilized unit of capacity.
    pub unit_operating_cost: f64,
    pub salary_per_employee: Decimal,
    /// Share of equipment value spent on maintenance.
    pub maintenance_rate: Decimal,
    /// Share of inventory value spent on holding it.
    pub holding_rate: Decimal,
    /// Share of assets written off against cash flow.
    pub depreciation_rate: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            unit_operating_cost: 50.0,
            salary_per_employee: Decimal::new(50_000, 0),
            maintenance_rate: Decimal::new(5, 2),
            holding_rate: Decimal::new(2, 2),
            depreciation_rate: Decimal::new(1, 1),
        }
    }
}

/// Point-in-time performance record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub revenue: Decimal,
    pub profit: Decimal,
    pub market_share: f64,
    pub customer_satisfaction: f64,
    pub efficiency: f64,
}

/// Metrics tracked in the performance history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    Revenue,
    Profit,
    MarketShare,
    CustomerSatisfaction,
    Efficiency,
}

impl PerformanceMetric {
    pub fn value(self, snap: &PerformanceSnapshot) -> f64 {
        match self {
            PerformanceMetric::Revenue => to_f64(snap.revenue),
            PerformanceMetric::Profit => to_f64(snap.profit),
            PerformanceMetric::MarketShare => snap.market_share,
            PerformanceMetric::CustomerSatisfaction => snap.customer_satisfaction,
            PerformanceMetric::Efficiency => snap.efficiency,
        }
    }
}

/// A business entity participating in the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub financial: FinancialData,
    #[serde(default)]
    pub operations: OperationsData,
    #[serde(default)]
    pub resources: ResourceData,
    #[serde(default)]
    pub market: MarketPosition,
    #[serde(default)]
    pub cost_model: CostModel,
    #[serde(default)]
    decision_log: Vec<DecisionRecord>,
    #[serde(default)]
    performance_history: VecDeque<PerformanceSnapshot>,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            financial: FinancialData::default(),
            operations: OperationsData::default(),
            resources: ResourceData::default(),
            market: MarketPosition::default(),
            cost_model: CostModel::default(),
            decision_log: Vec::new(),
            performance_history: VecDeque::new(),
        }
    }

    /// Revenue for the given market demand and unit price: `price * demand * share`.
    pub fn calculate_revenue(&self, demand: f64, price: f64) -> Decimal {
        money(price * demand * self.market.market_share)
    }

    /// Operating, staff, maintenance and inventory holding costs for one round.
    pub fn calculate_costs(&self) -> Decimal {
        let ops = &self.operations;
        let cm = &self.cost_model;
        let operational = money(ops.capacity * ops.utilization * cm.unit_operating_cost);
        let staff = Decimal::from(self.resources.employee_count).saturating_mul(cm.salary_per_employee);
        let maintenance = self.resources.equipment_value.saturating_mul(cm.maintenance_rate);
        let holding = self.resources.inventory_value.saturating_mul(cm.holding_rate);
        operational
            .saturating_add(staff)
            .saturating_add(maintenance)
            .saturating_add(holding)
    }

    /// Validate and apply a decision given in wire form.
    ///
    /// Returns `false` without touching any state when the kind is unknown or
    /// a required parameter is missing or invalid.
    pub fn apply_decision(&mut self, kind: &str, params: &DecisionParams, round: u32) -> bool {
        match Decision::parse(kind, params) {
            Ok(decision) => {
                self.apply(decision, round);
                true
            }
            Err(e) => {
                warn!(company = %self.id, error = %e, "decision rejected");
                false
            }
        }
    }

    /// Apply an already validated decision and append it to the decision log.
    pub fn apply(&mut self, decision: Decision, round: u32) {
        debug!(company = %self.id, ?decision, round, "applying decision");
        match &decision {
            // Price lives in the market; the company only logs the choice.
            Decision::PriceChange { .. } => {}
            Decision::CapacityExpansion { expansion_amount } => {
                self.operations.capacity = (self.operations.capacity + expansion_amount).min(f64::MAX);
            }
            Decision::MarketingCampaign { budget } => {
                self.market.brand_value =
                    (self.market.brand_value + budget * BRAND_PER_MARKETING_DOLLAR).min(f64::MAX);
                self.set_market_share(self.market.market_share + budget * SHARE_PER_MARKETING_DOLLAR);
            }
            Decision::QualityImprovement { investment } => {
                let step = (investment / QUALITY_INVESTMENT_SCALE).min(MAX_QUALITY_STEP);
                self.operations.quality = clamp_unit(self.operations.quality + step);
            }
            Decision::Hiring { num_employees } => {
                self.resources.employee_count =
                    self.resources.employee_count.saturating_add(*num_employees);
            }
            Decision::EquipmentPurchase { equipment_value } => {
                self.resources.equipment_value = self
                    .resources
                    .equipment_value
                    .saturating_add(money(*equipment_value));
            }
        }
        self.decision_log.push(DecisionRecord {
            round,
            decision,
            timestamp: Utc::now(),
        });
    }

    /// Set market share, clamped to [0, MAX_MARKET_SHARE].
    pub fn set_market_share(&mut self, share: f64) {
        self.market.market_share = if share.is_nan() {
            0.0
        } else {
            share.clamp(0.0, MAX_MARKET_SHARE)
        };
    }

    /// Recompute utilization, satisfaction and financials from market
    /// conditions, then record a performance snapshot.
    pub fn update_state(&mut self, conditions: &MarketConditions) {
        let demand = conditions.demand_level.max(0.0);
        let price = conditions.price_index * REFERENCE_PRICE;

        let required = demand * self.market.market_share;
        self.operations.utilization = if self.operations.capacity > 0.0 {
            clamp_unit(required / self.operations.capacity)
        } else {
            0.0
        };

        let price_factor = if conditions.market_price > 0.0 {
            1.0 - (price - conditions.market_price).abs() / conditions.market_price
        } else {
            0.0
        };
        self.operations.customer_satisfaction =
            clamp_unit((self.operations.quality + price_factor) / 2.0);

        let revenue = self.calculate_revenue(demand, price);
        let costs = self.calculate_costs();
        self.update_financials(revenue, costs);
        self.record_performance();
    }

    /// Set revenue and costs, deriving profit, cash flow and cash.
    pub fn update_financials(&mut self, revenue: Decimal, costs: Decimal) {
        let depreciation = self.cost_model.depreciation_rate;
        let f = &mut self.financial;
        f.revenue = revenue;
        f.costs = costs;
        f.profit = revenue.saturating_sub(costs);
        f.cash_flow = f.profit.saturating_sub(f.assets.saturating_mul(depreciation));
        f.cash = f.cash.saturating_add(f.cash_flow);
    }

    fn record_performance(&mut self) {
        self.performance_history.push_back(PerformanceSnapshot {
            timestamp: Utc::now(),
            revenue: self.financial.revenue,
            profit: self.financial.profit,
            market_share: self.market.market_share,
            customer_satisfaction: self.operations.customer_satisfaction,
            efficiency: self.operations.efficiency,
        });
        while self.performance_history.len() > PERFORMANCE_HISTORY_LEN {
            self.performance_history.pop_front();
        }
    }

    /// Current KPIs, derived from raw state on every call.
    pub fn kpis(&self) -> Kpis {
        let f = &self.financial;
        let ratio = |num: Decimal, den: Decimal| -> f64 {
            if den > Decimal::ZERO {
                num.checked_div(den).map(to_f64).unwrap_or(0.0)
            } else {
                0.0
            }
        };
        Kpis {
            revenue: to_f64(f.revenue),
            profit_margin: ratio(f.profit, f.revenue),
            market_share: self.market.market_share,
            roi: ratio(f.profit, f.assets),
            customer_satisfaction: self.operations.customer_satisfaction,
            operational_efficiency: self.operations.efficiency,
            capacity_utilization: self.operations.utilization,
            brand_value: self.market.brand_value,
        }
    }

    pub fn demand_factors(&self) -> DemandFactors {
        DemandFactors {
            quality: self.operations.quality,
            brand_value: self.market.brand_value,
            customer_satisfaction: self.operations.customer_satisfaction,
        }
    }

    pub fn decision_log(&self) -> &[DecisionRecord] {
        &self.decision_log
    }

    /// The last `n` decisions, oldest first.
    pub fn recent_decisions(&self, n: usize) -> &[DecisionRecord] {
        let start = self.decision_log.len().saturating_sub(n);
        &self.decision_log[start..]
    }

    pub fn performance_history(&self) -> &VecDeque<PerformanceSnapshot> {
        &self.performance_history
    }

    /// Values of `metric` over the last `periods` snapshots, oldest first.
    pub fn performance_trend(&self, metric: PerformanceMetric, periods: usize) -> Vec<f64> {
        let skip = self.performance_history.len().saturating_sub(periods);
        self.performance_history
            .iter()
            .skip(skip)
            .map(|s| metric.value(s))
            .collect()
    }

    /// Re-establish range invariants on data that came from outside.
    pub fn normalize(&mut self) {
        self.set_market_share(self.market.market_share);
        self.market.competitive_position = clamp_unit(self.market.competitive_position);
        let ops = &mut self.operations;
        ops.capacity = if ops.capacity.is_nan() { 0.0 } else { ops.capacity.max(0.0) };
        ops.efficiency = clamp_unit(ops.efficiency);
        ops.quality = clamp_unit(ops.quality);
        ops.customer_satisfaction = clamp_unit(ops.customer_satisfaction);
        ops.utilization = clamp_unit(ops.utilization);
        self.financial.profit = self.financial.revenue.saturating_sub(self.financial.costs);
        while self.performance_history.len() > PERFORMANCE_HISTORY_LEN {
            self.performance_history.pop_front();
        }
    }

    pub fn to_portable_form(&self) -> Result<Value, PortableError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_portable_form(value: Value) -> Result<Self, PortableError> {
        let mut company: Company = serde_json::from_value(value)?;
        company.normalize();
        Ok(company)
    }
}
