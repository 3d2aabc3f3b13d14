//! Player decisions: the closed set of kinds, their typed parameters and the
//! parsing step that turns the wire form (kind string + parameter map) into a
//! [`Decision`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw parameters of one decision as received from a front end.
pub type DecisionParams = BTreeMap<String, Value>;

/// Decisions for a round keyed by kind string.
pub type DecisionSet = BTreeMap<String, DecisionParams>;

/// Build a parameter map from numeric pairs.
pub fn params(pairs: &[(&str, f64)]) -> DecisionParams {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
        .collect()
}

/// The decision kinds a company accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    PriceChange,
    CapacityExpansion,
    MarketingCampaign,
    QualityImprovement,
    Hiring,
    EquipmentPurchase,
}

impl DecisionKind {
    pub const ALL: [DecisionKind; 6] = [
        DecisionKind::PriceChange,
        DecisionKind::CapacityExpansion,
        DecisionKind::MarketingCampaign,
        DecisionKind::QualityImprovement,
        DecisionKind::Hiring,
        DecisionKind::EquipmentPurchase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionKind::PriceChange => "price_change",
            DecisionKind::CapacityExpansion => "capacity_expansion",
            DecisionKind::MarketingCampaign => "marketing_campaign",
            DecisionKind::QualityImprovement => "quality_improvement",
            DecisionKind::Hiring => "hiring",
            DecisionKind::EquipmentPurchase => "equipment_purchase",
        }
    }

    /// Name of the single parameter this kind requires.
    pub fn required_param(self) -> &'static str {
        match self {
            DecisionKind::PriceChange => "new_price",
            DecisionKind::CapacityExpansion => "expansion_amount",
            DecisionKind::MarketingCampaign => "budget",
            DecisionKind::QualityImprovement => "investment",
            DecisionKind::Hiring => "num_employees",
            DecisionKind::EquipmentPurchase => "equipment_value",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionKind {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecisionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DecisionError::UnknownKind(s.to_string()))
    }
}

/// Why a decision could not be accepted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecisionError {
    #[error("unknown decision type: {0}")]
    UnknownKind(String),
    #[error("{kind} requires parameter {param}")]
    MissingParam {
        kind: DecisionKind,
        param: &'static str,
    },
    #[error("{kind} parameter {param} is invalid")]
    InvalidParam {
        kind: DecisionKind,
        param: &'static str,
    },
}

/// A validated decision carrying its own parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    PriceChange { new_price: f64 },
    CapacityExpansion { expansion_amount: f64 },
    MarketingCampaign { budget: f64 },
    QualityImprovement { investment: f64 },
    Hiring { num_employees: u32 },
    EquipmentPurchase { equipment_value: f64 },
}

impl Decision {
    /// Parse the wire form of a decision.
    ///
    /// Amounts must be finite and non-negative; a new price must be strictly
    /// positive and a head count must be a whole number fitting `u32`.
    pub fn parse(kind: &str, params: &DecisionParams) -> Result<Self, DecisionError> {
        let kind: DecisionKind = kind.parse()?;
        let amount = required_amount(kind, params)?;
        let decision = match kind {
            DecisionKind::PriceChange => {
                if amount <= 0.0 {
                    return Err(DecisionError::InvalidParam {
                        kind,
                        param: kind.required_param(),
                    });
                }
                Decision::PriceChange { new_price: amount }
            }
            DecisionKind::CapacityExpansion => Decision::CapacityExpansion {
                expansion_amount: amount,
            },
            DecisionKind::MarketingCampaign => Decision::MarketingCampaign { budget: amount },
            DecisionKind::QualityImprovement => Decision::QualityImprovement { investment: amount },
            DecisionKind::Hiring => {
                if amount.fract() != 0.0 || amount > f64::from(u32::MAX) {
                    return Err(DecisionError::InvalidParam {
                        kind,
                        param: kind.required_param(),
                    });
                }
                Decision::Hiring {
                    num_employees: amount as u32,
                }
            }
            DecisionKind::EquipmentPurchase => Decision::EquipmentPurchase {
                equipment_value: amount,
            },
        };
        Ok(decision)
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::PriceChange { .. } => DecisionKind::PriceChange,
            Decision::CapacityExpansion { .. } => DecisionKind::CapacityExpansion,
            Decision::MarketingCampaign { .. } => DecisionKind::MarketingCampaign,
            Decision::QualityImprovement { .. } => DecisionKind::QualityImprovement,
            Decision::Hiring { .. } => DecisionKind::Hiring,
            Decision::EquipmentPurchase { .. } => DecisionKind::EquipmentPurchase,
        }
    }
}

fn required_amount(kind: DecisionKind, params: &DecisionParams) -> Result<f64, DecisionError> {
    let param = kind.required_param();
    let value = params
        .get(param)
        .ok_or(DecisionError::MissingParam { kind, param })?;
    match value.as_f64() {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DecisionError::InvalidParam { kind, param }),
    }
}

/// Entry of the append-only decision log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub round: u32,
    pub decision: Decision,
    pub timestamp: DateTime<Utc>,
}
