//! KPI projection and lookup of raw company metrics by name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::company::{Company, FinancialData, MarketPosition, OperationsData, ResourceData};
use crate::to_f64;

/// Key performance indicators derived from a company.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub revenue: f64,
    pub profit_margin: f64,
    pub market_share: f64,
    pub roi: f64,
    pub customer_satisfaction: f64,
    pub operational_efficiency: f64,
    pub capacity_utilization: f64,
    pub brand_value: f64,
}

impl Kpis {
    pub const NAMES: [&'static str; 8] = [
        "revenue",
        "profit_margin",
        "market_share",
        "roi",
        "customer_satisfaction",
        "operational_efficiency",
        "capacity_utilization",
        "brand_value",
    ];

    pub fn get(&self, name: &str) -> Option<f64> {
        let v = match name {
            "revenue" => self.revenue,
            "profit_margin" => self.profit_margin,
            "market_share" => self.market_share,
            "roi" => self.roi,
            "customer_satisfaction" => self.customer_satisfaction,
            "operational_efficiency" => self.operational_efficiency,
            "capacity_utilization" => self.capacity_utilization,
            "brand_value" => self.brand_value,
            _ => return None,
        };
        Some(v)
    }

    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        Self::NAMES
            .into_iter()
            .filter_map(|n| self.get(n).map(|v| (n, v)))
            .collect()
    }
}

/// Attribute groups of a company, in lookup order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Financial,
    Operations,
    Resources,
    Market,
}

impl MetricCategory {
    pub const LOOKUP_ORDER: [MetricCategory; 4] = [
        MetricCategory::Financial,
        MetricCategory::Operations,
        MetricCategory::Resources,
        MetricCategory::Market,
    ];
}

/// Borrowed view of one attribute group.
#[derive(Clone, Copy, Debug)]
pub enum CategoryRecord<'a> {
    Financial(&'a FinancialData),
    Operations(&'a OperationsData),
    Resources(&'a ResourceData),
    Market(&'a MarketPosition),
}

impl CategoryRecord<'_> {
    pub fn metric(&self, name: &str) -> Option<f64> {
        match self {
            CategoryRecord::Financial(f) => f.metric(name),
            CategoryRecord::Operations(o) => o.metric(name),
            CategoryRecord::Resources(r) => r.metric(name),
            CategoryRecord::Market(m) => m.metric(name),
        }
    }
}

impl FinancialData {
    pub fn metric(&self, name: &str) -> Option<f64> {
        let v = match name {
            "revenue" => self.revenue,
            "costs" => self.costs,
            "profit" => self.profit,
            "cash" => self.cash,
            "cash_flow" => self.cash_flow,
            "assets" => self.assets,
            "liabilities" => self.liabilities,
            _ => return None,
        };
        Some(to_f64(v))
    }
}

impl OperationsData {
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "capacity" => Some(self.capacity),
            "efficiency" => Some(self.efficiency),
            "quality" => Some(self.quality),
            "customer_satisfaction" => Some(self.customer_satisfaction),
            "utilization" => Some(self.utilization),
            _ => None,
        }
    }
}

impl ResourceData {
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "employee_count" | "employees" => Some(f64::from(self.employee_count)),
            "equipment_value" | "equipment" => Some(to_f64(self.equipment_value)),
            "inventory_value" | "inventory" => Some(to_f64(self.inventory_value)),
            _ => None,
        }
    }
}

impl MarketPosition {
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "market_share" => Some(self.market_share),
            "brand_value" => Some(self.brand_value),
            "competitive_position" => Some(self.competitive_position),
            _ => None,
        }
    }
}

impl Company {
    pub fn category(&self, category: MetricCategory) -> CategoryRecord<'_> {
        match category {
            MetricCategory::Financial => CategoryRecord::Financial(&self.financial),
            MetricCategory::Operations => CategoryRecord::Operations(&self.operations),
            MetricCategory::Resources => CategoryRecord::Resources(&self.resources),
            MetricCategory::Market => CategoryRecord::Market(&self.market),
        }
    }

    /// Find a metric by name, searching categories in [`MetricCategory::LOOKUP_ORDER`].
    pub fn find_metric(&self, name: &str) -> Option<(MetricCategory, f64)> {
        MetricCategory::LOOKUP_ORDER
            .into_iter()
            .find_map(|c| self.category(c).metric(name).map(|v| (c, v)))
    }
}
