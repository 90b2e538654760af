use std::fmt;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::{AuctionError, Result};
use crate::types::{CategoryIndex, Price, Recipe, ZERO_SUM_TOLERANCE};

// === PRICE CLOCKS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub enum PriceStatus {
    /// Every raised price reached its target, or stopped where a recipe sum met the others.
    StoppedAtAgentValue,
    /// The common price-sum reached zero; the auction is over.
    StoppedAtZeroSum,
}

/// Request to raise one category's clock towards `target_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceIncrease {
    pub category_index: CategoryIndex,
    pub target_price: Price,
    pub label: String,
}

impl PriceIncrease {
    pub fn new(category_index: CategoryIndex, target_price: Price, label: impl Into<String>) -> Self {
        Self {
            category_index,
            target_price,
            label: label.into(),
        }
    }
}

/// One ascending price per category, shared by a family of recipes whose weighted
/// price-sums move in lockstep.
///
/// A raise is applied to all requested categories at once. Each touched recipe's sum
/// goes up by the smallest increase any of them asked for, capped where the first one
/// reaches zero; categories in recipes that asked for more are held back to that step.
#[derive(Debug, Clone)]
pub struct SimultaneousAscendingPriceVectors {
    recipes: Vec<Recipe>,
    prices: Vec<Price>,
    status: Option<PriceStatus>,
    zero_tolerance: f64,
}

impl SimultaneousAscendingPriceVectors {
    pub fn new(recipes: Vec<Recipe>, initial_prices: Vec<Price>) -> Result<Self> {
        let num_categories = recipes.first().ok_or(AuctionError::EmptyRecipeFamily)?.len();
        if let Some(recipe) = recipes.iter().find(|r| r.len() != num_categories) {
            return Err(AuctionError::RecipeLengthMismatch {
                expected: num_categories,
                actual: recipe.len(),
            });
        }
        if initial_prices.len() != num_categories {
            return Err(AuctionError::RecipeLengthMismatch {
                expected: num_categories,
                actual: initial_prices.len(),
            });
        }
        Ok(Self {
            recipes,
            prices: initial_prices,
            status: None,
            zero_tolerance: ZERO_SUM_TOLERANCE,
        })
    }

    /// Every category starts at the same price.
    pub fn uniform(recipes: Vec<Recipe>, initial_price: Price) -> Result<Self> {
        let num_categories = recipes.first().map_or(0, Vec::len);
        Self::new(recipes, vec![initial_price; num_categories])
    }

    pub fn with_zero_tolerance(mut self, tolerance: f64) -> Self {
        self.zero_tolerance = tolerance;
        self
    }

    pub fn num_categories(&self) -> usize {
        self.prices.len()
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Status of the latest [`increase_prices`](Self::increase_prices) call.
    pub fn status(&self) -> Option<PriceStatus> {
        self.status
    }

    /// Weighted price-sum of the recipe at `recipe_index`.
    pub fn price_sum(&self, recipe_index: usize) -> Option<Price> {
        self.recipes.get(recipe_index).map(|r| self.sum_of(r))
    }

    /// Current price of every category used by some recipe, `None` for the rest.
    pub fn map_category_index_to_price(&self) -> Vec<Option<Price>> {
        self.prices
            .iter()
            .enumerate()
            .map(|(i, &p)| self.recipes.iter().any(|r| r[i] > 0).then_some(p))
            .collect()
    }

    fn sum_of(&self, recipe: &Recipe) -> Price {
        recipe
            .iter()
            .zip(&self.prices)
            .map(|(&count, price)| count as f64 * price)
            .sum()
    }

    /// Smallest raise of `index` that lifts every recipe containing it to a zero sum.
    fn raise_to_zero_sum(&self, index: CategoryIndex) -> Price {
        self.recipes
            .iter()
            .filter(|r| r[index] > 0)
            .map(|r| -self.sum_of(r) / r[index] as f64)
            .fold(0.0, f64::max)
    }

    /// Raise the named clocks together. Targets below the current price are ignored;
    /// repeated categories keep their highest target. An infinite target asks for as
    /// much as the recipes allow before reaching zero.
    pub fn increase_prices(&mut self, increases: &[PriceIncrease]) -> Result<PriceStatus> {
        let num_categories = self.prices.len();
        // (category, requested raise, target)
        let mut raises: Vec<(CategoryIndex, Price, Price)> = Vec::with_capacity(increases.len());
        for inc in increases {
            if inc.category_index >= num_categories {
                return Err(AuctionError::UnknownCategory {
                    index: inc.category_index,
                    num_categories,
                });
            }
            let delta = if inc.target_price == Price::INFINITY {
                self.raise_to_zero_sum(inc.category_index)
            } else {
                (inc.target_price - self.prices[inc.category_index]).max(0.0)
            };
            match raises.iter_mut().find(|(i, _, _)| *i == inc.category_index) {
                Some(existing) => {
                    existing.1 = existing.1.max(delta);
                    existing.2 = existing.2.max(inc.target_price);
                }
                None => raises.push((inc.category_index, delta, inc.target_price)),
            }
        }

        // (old sum, requested increase) of each recipe containing a raised category
        let touched: Vec<Option<(Price, Price)>> = self
            .recipes
            .iter()
            .map(|recipe| {
                if !raises.iter().any(|&(i, _, _)| recipe[i] > 0) {
                    return None;
                }
                let added: Price = raises.iter().map(|&(i, d, _)| recipe[i] as f64 * d).sum();
                Some((self.sum_of(recipe), added))
            })
            .collect();

        // Every touched recipe rises by the same step, and none past zero.
        let room = touched
            .iter()
            .flatten()
            .map(|&(old, _)| -old)
            .fold(Price::INFINITY, f64::min)
            .max(0.0);
        let step = touched
            .iter()
            .flatten()
            .map(|&(_, added)| added)
            .fold(Price::INFINITY, f64::min);
        let reaches_zero = step.is_finite() && step >= room - self.zero_tolerance;
        let allowed = if reaches_zero { room } else { step };

        for &(index, delta, target) in &raises {
            let raise = self
                .recipes
                .iter()
                .zip(&touched)
                .filter(|(recipe, _)| recipe[index] > 0)
                .filter_map(|(recipe, t)| t.map(|sums| (recipe, sums)))
                .map(|(recipe, (_, added))| {
                    if added <= allowed {
                        return delta;
                    }
                    let raised_here = raises.iter().filter(|&&(i, _, _)| recipe[i] > 0).count();
                    if raised_here == 1 {
                        allowed / recipe[index] as f64
                    } else {
                        delta * (allowed / added).clamp(0.0, 1.0)
                    }
                })
                .fold(delta, f64::min);
            if raise >= delta && target.is_finite() {
                self.prices[index] = self.prices[index].max(target);
            } else {
                self.prices[index] += raise;
            }

            #[cfg(feature = "instrument")]
            {
                let label = increases
                    .iter()
                    .find(|inc| inc.category_index == index)
                    .map_or("", |inc| inc.label.as_str());
                tracing::info!(
                    target: "price_increase",
                    category_index = index as u64,
                    label = label,
                    requested = delta,
                    raise = raise,
                    price = self.prices[index],
                );
            }
        }

        let status = if reaches_zero {
            PriceStatus::StoppedAtZeroSum
        } else {
            PriceStatus::StoppedAtAgentValue
        };
        self.status = Some(status);
        Ok(status)
    }
}

impl fmt::Display for SimultaneousAscendingPriceVectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.prices)?;
        match self.status {
            Some(status) => write!(f, " {:?}", status),
            None => write!(f, " None"),
        }
    }
}
