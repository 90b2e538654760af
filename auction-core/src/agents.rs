use std::collections::VecDeque;
use std::fmt;

use rand::Rng;

use crate::error::{AuctionError, Result};
use crate::types::Value;

// === AGENT CATEGORY ===

/// One side of the market, e.g. "buyer" or "seller": a multiset of single-parameter
/// agents kept sorted by value, highest first.
///
/// Both extremes are reachable in O(1): the auction prunes the weakest agent, and the
/// optimal-trade benchmark takes the strongest.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentCategory {
    pub name: String,
    values: VecDeque<Value>,
}

impl AgentCategory {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        let mut values: Vec<Value> = values.into_iter().collect();
        values.sort_by(|a, b| b.total_cmp(a));
        Self {
            name: name.into(),
            values: values.into(),
        }
    }

    /// A category of `num_agents` values drawn uniformly from `[min_value, max_value]`.
    pub fn uniformly_random<R: Rng + ?Sized>(
        name: impl Into<String>,
        num_agents: usize,
        min_value: Value,
        max_value: Value,
        rng: &mut R,
    ) -> Self {
        let values: Vec<Value> = (0..num_agents)
            .map(|_| rng.random_range(min_value..=max_value))
            .collect();
        Self::new(name, values)
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in descending order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = Value> + '_ {
        self.values.iter().copied()
    }

    /// Add one agent, keeping the descending order.
    pub fn append(&mut self, value: Value) {
        let pos = self.values.partition_point(|v| v.total_cmp(&value).is_ge());
        self.values.insert(pos, value);
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.append(value);
        }
    }

    pub fn highest_agent_value(&self) -> Result<Value> {
        self.values.front().copied().ok_or_else(|| self.empty())
    }

    pub fn lowest_agent_value(&self) -> Result<Value> {
        self.values.back().copied().ok_or_else(|| self.empty())
    }

    /// The `count` highest values, fewer if the category is smaller.
    pub fn highest_agent_values(&self, count: usize) -> Vec<Value> {
        self.values.iter().take(count).copied().collect()
    }

    pub fn remove_highest_agent(&mut self) -> Result<Value> {
        self.values.pop_front().ok_or_else(|| self.empty())
    }

    pub fn remove_lowest_agent(&mut self) -> Result<Value> {
        self.values.pop_back().ok_or_else(|| self.empty())
    }

    /// Remove the `count` highest agents. Fails without mutating if fewer remain.
    pub fn remove_highest_agents(&mut self, count: usize) -> Result<Vec<Value>> {
        if count > self.values.len() {
            return Err(self.empty());
        }
        Ok(self.values.drain(..count).collect())
    }

    fn empty(&self) -> AuctionError {
        AuctionError::EmptyCategory {
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [", self.name)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", value)?;
        }
        write!(f, "]")
    }
}
