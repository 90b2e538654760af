use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::auction::{AscendingAuction, Trade};
use crate::error::Result;
use crate::market::Market;
use crate::recipe::{RecipeDefinition, RecipeTree};
use crate::types::{MAX_VALUE, Multiplicity, Value, ZERO_SUM_TOLERANCE};

// === AUCTION PARAMETERS ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct AuctionConfig {
    /// Upper bound on any agent's absolute value; prices start below its negation.
    pub max_value: Value,
    /// Price-sums within this distance of zero count as zero.
    pub zero_tolerance: f64,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            max_value: MAX_VALUE,
            zero_tolerance: ZERO_SUM_TOLERANCE,
        }
    }
}

// === SCENARIOS ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub values: Vec<Value>,
}

/// A complete auction input: who is in the market, which recipes they can form,
/// and how the auction is tuned.
///
/// ```json
/// {
///   "categories": [
///     {"name": "buyer", "values": [9, 8]},
///     {"name": "seller", "values": [-4]}
///   ],
///   "recipe": [0, [1, null]]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub categories: Vec<CategoryConfig>,
    pub recipe: RecipeDefinition,
    /// Only read for the nested list form; node-form recipes carry their own counts.
    #[serde(default)]
    pub multiplicities: Option<Vec<Multiplicity>>,
    #[serde(default)]
    pub auction: AuctionConfig,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn market(&self) -> Market {
        Market::from_pairs(
            self.categories
                .iter()
                .map(|c| (c.name.clone(), c.values.iter().copied())),
        )
    }

    pub fn recipe_tree(&self, market: &Market) -> Result<RecipeTree> {
        RecipeTree::from_definition(market, &self.recipe, self.multiplicities.as_deref())
    }

    pub fn run(&self) -> Result<Trade> {
        let market = self.market();
        let tree = self.recipe_tree(&market)?;
        AscendingAuction::new(self.auction).run(&market, &tree)
    }
}
