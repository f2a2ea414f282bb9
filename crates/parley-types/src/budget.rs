//! Response boost multipliers and the point cost table for sends.
//!
//! Every send costs a fixed base amount plus an extra cost looked up by the
//! selected boost multiplier. Regenerations are not charged.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// User-selected amplification factor for response generation.
///
/// Serialized as its numeric factor (`1.0`, `1.5`, `3.0`, `5.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum BoostMultiplier {
    #[default]
    Standard,
    Boost1_5,
    Boost3,
    Boost5,
}

impl BoostMultiplier {
    pub const ALL: [BoostMultiplier; 4] = [
        BoostMultiplier::Standard,
        BoostMultiplier::Boost1_5,
        BoostMultiplier::Boost3,
        BoostMultiplier::Boost5,
    ];

    pub fn factor(self) -> f64 {
        match self {
            BoostMultiplier::Standard => 1.0,
            BoostMultiplier::Boost1_5 => 1.5,
            BoostMultiplier::Boost3 => 3.0,
            BoostMultiplier::Boost5 => 5.0,
        }
    }

    pub fn is_boosted(self) -> bool {
        self != BoostMultiplier::Standard
    }
}

impl TryFrom<f64> for BoostMultiplier {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        BoostMultiplier::ALL
            .into_iter()
            .find(|b| (b.factor() - value).abs() < 1e-6)
            .ok_or_else(|| format!("unsupported boost multiplier: {value}"))
    }
}

impl From<BoostMultiplier> for f64 {
    fn from(value: BoostMultiplier) -> Self {
        value.factor()
    }
}

impl fmt::Display for BoostMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}x", self.factor())
    }
}

impl FromStr for BoostMultiplier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches(['x', 'X']);
        let value: f64 = trimmed
            .parse()
            .map_err(|_| format!("invalid boost multiplier: '{s}'"))?;
        BoostMultiplier::try_from(value)
    }
}

/// Extra point cost for one boost multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostCost {
    pub multiplier: BoostMultiplier,
    pub extra_cost: u32,
}

/// Point pricing for sends.
///
/// Total cost of a send = `base_cost` + the extra cost of the selected
/// multiplier. Multipliers missing from `boost` cost nothing extra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostTable {
    #[serde(default = "default_base_cost")]
    pub base_cost: u32,

    #[serde(default = "default_boost_costs")]
    pub boost: Vec<BoostCost>,
}

fn default_base_cost() -> u32 {
    1
}

fn default_boost_costs() -> Vec<BoostCost> {
    vec![
        BoostCost {
            multiplier: BoostMultiplier::Boost1_5,
            extra_cost: 1,
        },
        BoostCost {
            multiplier: BoostMultiplier::Boost3,
            extra_cost: 2,
        },
        BoostCost {
            multiplier: BoostMultiplier::Boost5,
            extra_cost: 4,
        },
    ]
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            base_cost: default_base_cost(),
            boost: default_boost_costs(),
        }
    }
}

impl CostTable {
    /// Extra cost for the given multiplier (0 when not listed).
    pub fn extra_cost(&self, boost: BoostMultiplier) -> u32 {
        self.boost
            .iter()
            .find(|c| c.multiplier == boost)
            .map_or(0, |c| c.extra_cost)
    }

    /// Total points charged for one send with the given multiplier.
    pub fn total_cost(&self, boost: BoostMultiplier) -> u32 {
        self.base_cost.saturating_add(self.extra_cost(boost))
    }
}
