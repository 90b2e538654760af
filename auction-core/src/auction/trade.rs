use std::fmt;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::Result;
use crate::market::{Market, ProcurementSet};
use crate::recipe::{DealExplanation, OptimalTrade, RecipeTree};
use crate::types::{Price, Value};

/// How the ascending loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub enum AuctionOutcome {
    /// Supply along the recipe tree ran out before prices balanced.
    NoTrade,
    /// The common recipe price-sum reached zero.
    TerminatedAtZero,
}

/// Final state of a budget-balanced ascending auction.
///
/// The agents left in `remaining_market` are the ones still competing at the final
/// prices; the highest of them trade, as many as the recipe tree can deliver.
#[derive(Debug, Clone)]
pub struct Trade {
    remaining_market: Market,
    recipe_tree: RecipeTree,
    prices: Vec<Option<Price>>,
    explained: DealExplanation,
    deals: Vec<ProcurementSet>,
    optimal: OptimalTrade,
    outcome: AuctionOutcome,
    ticks: usize,
}

impl Trade {
    pub(crate) fn new(
        remaining_market: Market,
        recipe_tree: RecipeTree,
        prices: Vec<Option<Price>>,
        optimal: OptimalTrade,
        outcome: AuctionOutcome,
        ticks: usize,
    ) -> Result<Self> {
        let explained = recipe_tree.num_of_deals_explained(&remaining_market, &prices)?;
        let mut deals = recipe_tree.combined_values(&remaining_market)?;
        deals.truncate(explained.num_of_deals);
        Ok(Self {
            remaining_market,
            recipe_tree,
            prices,
            explained,
            deals,
            optimal,
            outcome,
            ticks,
        })
    }

    pub fn num_of_deals(&self) -> usize {
        self.explained.num_of_deals
    }

    pub fn min_num_of_deals(&self) -> usize {
        self.explained.kmin
    }

    pub fn max_num_of_deals(&self) -> usize {
        self.explained.kmax
    }

    /// Final price per category; `None` for categories outside every recipe.
    pub fn prices(&self) -> &[Option<Price>] {
        &self.prices
    }

    pub fn explanation(&self) -> &str {
        &self.explained.explanation
    }

    pub fn outcome(&self) -> AuctionOutcome {
        self.outcome
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn remaining_market(&self) -> &Market {
        &self.remaining_market
    }

    pub fn recipe_tree(&self) -> &RecipeTree {
        &self.recipe_tree
    }

    /// Procurement sets that trade at the final prices, strongest first.
    pub fn deals(&self) -> &[ProcurementSet] {
        &self.deals
    }

    /// Welfare-optimal benchmark, computed on the market before any pruning.
    pub fn optimal_trade(&self) -> &OptimalTrade {
        &self.optimal
    }

    pub fn optimal_trade_gft(&self) -> Value {
        self.optimal.gain_from_trade
    }

    /// Realized gain from trade. Including the auctioneer this is the total value of all
    /// trading agents; without it, each agent's value net of the price it pays.
    pub fn gain_from_trade(&self, including_auctioneer: bool) -> Value {
        self.deals
            .iter()
            .flat_map(|set| set.members.iter())
            .map(|&(index, value)| {
                if including_auctioneer {
                    value
                } else {
                    value - self.prices[index].unwrap_or(0.0)
                }
            })
            .sum()
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num_of_deals() == 0 {
            return write!(f, "No trade");
        }
        write!(f, "{}", self.explanation().trim_end())
    }
}
