use std::fmt;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::AgentCategory;
use crate::error::{AuctionError, Result};
use crate::types::{CategoryIndex, Multiplicity, Value};

// === PROCUREMENT SETS ===

/// Agents that trade together in one deal, tagged with the category each came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ProcurementSet {
    pub members: Vec<(CategoryIndex, Value)>,
}

impl ProcurementSet {
    pub fn gain_from_trade(&self) -> Value {
        self.members.iter().map(|(_, v)| v).sum()
    }

    pub fn values(&self) -> Vec<Value> {
        self.members.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn from_group(index: CategoryIndex, values: &[Value]) -> Self {
        Self {
            members: values.iter().map(|v| (index, *v)).collect(),
        }
    }

    pub(crate) fn joined(mut self, other: &ProcurementSet) -> Self {
        self.members.extend_from_slice(&other.members);
        self
    }
}

// === MARKET ===

/// Ordered categories addressed by index. `Clone` is a deep copy, so an auction can
/// prune its own copy while the caller's market stays intact.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Market {
    pub categories: Vec<AgentCategory>,
}

/// Result of the exhaustive single-recipe benchmark.
#[derive(Debug, Clone)]
pub struct MarketTrade {
    /// Procurement sets in ascending order of gain from trade.
    pub sets: Vec<ProcurementSet>,
    pub remaining: Market,
}

impl MarketTrade {
    pub fn gain_from_trade(&self) -> Value {
        self.sets.iter().map(ProcurementSet::gain_from_trade).sum()
    }
}

impl Market {
    pub fn new(categories: Vec<AgentCategory>) -> Self {
        Self { categories }
    }

    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: IntoIterator<Item = Value>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, values)| AgentCategory::new(name, values))
                .collect(),
        )
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn category(&self, index: CategoryIndex) -> Result<&AgentCategory> {
        self.categories
            .get(index)
            .ok_or(AuctionError::UnknownCategory {
                index,
                num_categories: self.categories.len(),
            })
    }

    pub fn category_mut(&mut self, index: CategoryIndex) -> Result<&mut AgentCategory> {
        let num_categories = self.categories.len();
        self.categories
            .get_mut(index)
            .ok_or(AuctionError::UnknownCategory {
                index,
                num_categories,
            })
    }

    pub fn size_of_smallest_category(&self) -> usize {
        self.categories
            .iter()
            .map(AgentCategory::size)
            .min()
            .unwrap_or(0)
    }

    pub fn append_trader(&mut self, index: CategoryIndex, value: Value) -> Result<()> {
        self.category_mut(index)?.append(value);
        Ok(())
    }

    /// Add one agent to every category.
    pub fn append_procurement_set(&mut self, values: &[Value]) -> Result<()> {
        if values.len() != self.categories.len() {
            return Err(AuctionError::RecipeLengthMismatch {
                expected: self.categories.len(),
                actual: values.len(),
            });
        }
        for (category, value) in self.categories.iter_mut().zip(values) {
            category.append(*value);
        }
        Ok(())
    }

    /// Welfare-maximizing trade for a single recipe: repeatedly match the strongest
    /// remaining agents while their combined value is non-negative.
    ///
    /// Only used as a benchmark; the auction never calls it.
    pub fn optimal_trade(&self, recipe: &[Multiplicity]) -> Result<MarketTrade> {
        if recipe.len() != self.categories.len() {
            return Err(AuctionError::RecipeLengthMismatch {
                expected: self.categories.len(),
                actual: recipe.len(),
            });
        }
        let mut remaining = self.clone();
        let mut sets = Vec::new();
        loop {
            let feasible = recipe.iter().enumerate().all(|(i, &count)| {
                remaining.categories[i].size() >= count as usize
            });
            if !feasible || recipe.iter().all(|&count| count == 0) {
                break;
            }
            let set = ProcurementSet {
                members: recipe
                    .iter()
                    .enumerate()
                    .flat_map(|(i, &count)| {
                        remaining.categories[i]
                            .highest_agent_values(count as usize)
                            .into_iter()
                            .map(move |v| (i, v))
                    })
                    .collect(),
            };
            if set.gain_from_trade() < 0.0 {
                break;
            }
            for (i, &count) in recipe.iter().enumerate() {
                remaining.categories[i].remove_highest_agents(count as usize)?;
            }
            sets.push(set);
        }
        sets.sort_by(|a, b| a.gain_from_trade().total_cmp(&b.gain_from_trade()));
        Ok(MarketTrade { sets, remaining })
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Traders: [")?;
        for (i, category) in self.categories.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", category)?;
        }
        write!(f, "]")
    }
}
