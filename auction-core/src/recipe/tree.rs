use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::AgentCategory;
use crate::error::{AuctionError, Result};
use crate::market::{Market, ProcurementSet};
use crate::types::{CategoryIndex, Multiplicity, Price, Recipe, Value};

use super::explain::{DealCount, DealExplanation};
use super::spec::{RecipeDefinition, RecipeNodeSpec, RecipeSpec};

// === TREE STRUCTURE ===

/// One category in a recipe tree. A node exclusively owns its children; a node with
/// no children is a leaf and closes one recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeNode {
    pub category_index: CategoryIndex,
    pub multiplicity: Multiplicity,
    pub children: Vec<RecipeNode>,
}

/// Recipes sharing common prefixes, stored as a tree over category indices.
///
/// Every root-to-leaf path is one recipe. The tree holds no agents: each query takes
/// the market it should look at, so the auction can keep asking about its pruned copy.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeTree {
    root: RecipeNode,
    num_categories: usize,
}

/// Result of [`RecipeTree::optimal_trade`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct OptimalTrade {
    pub sets: Vec<ProcurementSet>,
    pub count: usize,
    pub gain_from_trade: Value,
}

/// Result of [`RecipeTree::largest_categories`].
#[derive(Debug, Clone, PartialEq)]
pub struct LargestCategories {
    pub largest_size: f64,
    /// Effective size of the node where the selection started, i.e. the deliverable
    /// volume the auction is still competing for.
    pub combined_size: f64,
    /// Exactly one category on every root-to-leaf path.
    pub categories: Vec<CategoryIndex>,
}

impl RecipeTree {
    /// Build from the nested list form. `multiplicities` defaults to one agent per category.
    pub fn new(
        market: &Market,
        spec: &RecipeSpec,
        multiplicities: Option<&[Multiplicity]>,
    ) -> Result<Self> {
        let num_categories = market.num_categories();
        let multiplicities = match multiplicities {
            Some(m) if m.len() != num_categories => {
                return Err(AuctionError::MultiplicityLengthMismatch {
                    expected: num_categories,
                    actual: m.len(),
                });
            }
            Some(m) => m.to_vec(),
            None => vec![1; num_categories],
        };
        if let Some(index) = multiplicities.iter().position(|&m| m == 0) {
            return Err(AuctionError::InvalidMultiplicity(index));
        }

        let top = match spec {
            RecipeSpec::Nested(items) => items,
            other => {
                return Err(AuctionError::MalformedRecipeSpecification(format!(
                    "expected a list, got {}",
                    other
                )));
            }
        };
        let mut roots = parse_level(top, num_categories, &multiplicities)?;
        if roots.len() != 1 {
            return Err(AuctionError::MalformedRecipeSpecification(format!(
                "expected a single root, got {}",
                roots.len()
            )));
        }
        Ok(Self {
            root: roots.remove(0),
            num_categories,
        })
    }

    /// Build from the explicit node form, taking each node's own count as its multiplicity.
    pub fn from_nodes(market: &Market, spec: &RecipeNodeSpec) -> Result<Self> {
        let num_categories = market.num_categories();
        Ok(Self {
            root: node_from_spec(spec, num_categories)?,
            num_categories,
        })
    }

    pub fn from_definition(
        market: &Market,
        definition: &RecipeDefinition,
        multiplicities: Option<&[Multiplicity]>,
    ) -> Result<Self> {
        match definition {
            RecipeDefinition::Nested(spec) => Self::new(market, spec, multiplicities),
            RecipeDefinition::Node(spec) => Self::from_nodes(market, spec),
        }
    }

    pub fn root(&self) -> &RecipeNode {
        &self.root
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    // === PATHS AND RECIPES ===

    /// Root-to-leaf paths, depth first, in specification order.
    pub fn paths_to_leaf(&self) -> Vec<Vec<CategoryIndex>> {
        let mut paths = Vec::new();
        self.root.collect_paths(&mut Vec::new(), &mut paths);
        paths
    }

    pub fn path_names(&self, market: &Market) -> Result<Vec<Vec<String>>> {
        let categories = self.categories(market)?;
        Ok(self
            .paths_to_leaf()
            .into_iter()
            .map(|path| path.into_iter().map(|i| categories[i].name.clone()).collect())
            .collect())
    }

    /// Full-length recipe vector with the multiplicity of every visited category.
    pub fn recipe_from_path(
        path: &[CategoryIndex],
        num_categories: usize,
        multiplicities: Option<&[Multiplicity]>,
    ) -> Result<Recipe> {
        if let Some(m) = multiplicities.filter(|m| m.len() != num_categories) {
            return Err(AuctionError::MultiplicityLengthMismatch {
                expected: num_categories,
                actual: m.len(),
            });
        }
        let mut recipe = vec![0; num_categories];
        for &index in path {
            if index >= num_categories {
                return Err(AuctionError::UnknownCategory {
                    index,
                    num_categories,
                });
            }
            recipe[index] = multiplicities.map_or(1, |m| m[index]);
        }
        Ok(recipe)
    }

    pub fn recipes(&self) -> Vec<Recipe> {
        let mut recipes = Vec::new();
        self.root
            .collect_recipes(&mut vec![0; self.num_categories], &mut recipes);
        recipes
    }

    // === MATCHING ===

    /// Best procurement sets the tree can assemble, in descending order of gain.
    pub fn combined_values(&self, market: &Market) -> Result<Vec<ProcurementSet>> {
        Ok(self.root.combined_values(self.categories(market)?))
    }

    pub fn optimal_trade(&self, market: &Market) -> Result<OptimalTrade> {
        let sets: Vec<ProcurementSet> = self
            .combined_values(market)?
            .into_iter()
            .filter(|set| set.gain_from_trade() >= 0.0)
            .collect();
        let gain_from_trade = sets.iter().map(ProcurementSet::gain_from_trade).sum();
        Ok(OptimalTrade {
            count: sets.len(),
            sets,
            gain_from_trade,
        })
    }

    pub fn optimal_trade_gft(&self, market: &Market) -> Result<Value> {
        Ok(self.optimal_trade(market)?.gain_from_trade)
    }

    // === DEAL COUNTING ===

    /// Deals the tree can deliver with every agent currently in the market.
    pub fn num_of_deals(&self, market: &Market) -> Result<usize> {
        Ok(self.root.num_of_deals(self.categories(market)?))
    }

    /// Per-node deal counts, kept for explanation and the [kmin, kmax] bounds.
    pub fn deal_count(&self, market: &Market) -> Result<DealCount> {
        Ok(self.root.deal_count(self.categories(market)?))
    }

    pub fn num_of_deals_explained(
        &self,
        market: &Market,
        prices: &[Option<Price>],
    ) -> Result<DealExplanation> {
        let count = self.deal_count(market)?;
        Ok(DealExplanation {
            num_of_deals: count.deals,
            explanation: count.explain(prices),
            kmin: count.kmin,
            kmax: count.kmax,
        })
    }

    // === PRICE-RAISE SELECTION ===

    /// The categories whose prices the auction raises next: one per root-to-leaf path,
    /// chosen where supply is most abundant.
    pub fn largest_categories(&self, market: &Market) -> Result<LargestCategories> {
        Ok(self.root.largest_categories(self.categories(market)?))
    }

    /// Starting prices under which every recipe's weighted price-sum equals
    /// `-max_value` times the heaviest recipe weight.
    ///
    /// Inner nodes start at `-max_value`; each leaf takes up whatever its path still needs.
    /// A category appearing in several nodes keeps the price of its first visit.
    pub fn initial_prices(&self, max_value: Value) -> Vec<Price> {
        let heaviest = self
            .recipes()
            .iter()
            .map(|r| r.iter().sum::<Multiplicity>())
            .max()
            .unwrap_or(0);
        let target_sum = -max_value * heaviest as f64;
        let mut prices: Vec<Option<Price>> = vec![None; self.num_categories];
        self.root
            .assign_initial_prices(max_value, target_sum, 0.0, &mut prices);
        prices
            .into_iter()
            .map(|p| p.unwrap_or(-max_value))
            .collect()
    }

    fn categories<'a>(&self, market: &'a Market) -> Result<&'a [AgentCategory]> {
        if market.num_categories() != self.num_categories {
            return Err(AuctionError::CategoryCountMismatch {
                tree: self.num_categories,
                market: market.num_categories(),
            });
        }
        Ok(&market.categories)
    }
}

// === CONSTRUCTION ===

fn parse_level(
    items: &[RecipeSpec],
    num_categories: usize,
    multiplicities: &[Multiplicity],
) -> Result<Vec<RecipeNode>> {
    if items.len() % 2 != 0 {
        return Err(AuctionError::MalformedRecipeSpecification(format!(
            "odd-length level {}",
            RecipeSpec::Nested(items.to_vec())
        )));
    }
    items
        .chunks_exact(2)
        .map(|pair| {
            let category_index = match pair[0] {
                RecipeSpec::Index(i) if i < num_categories => i,
                RecipeSpec::Index(index) => {
                    return Err(AuctionError::UnknownCategory {
                        index,
                        num_categories,
                    });
                }
                ref other => {
                    return Err(AuctionError::MalformedRecipeSpecification(format!(
                        "expected a category index, got {}",
                        other
                    )));
                }
            };
            let children = match &pair[1] {
                RecipeSpec::End => Vec::new(),
                RecipeSpec::Nested(inner) => parse_level(inner, num_categories, multiplicities)?,
                RecipeSpec::Index(i) => {
                    return Err(AuctionError::MalformedRecipeSpecification(format!(
                        "expected children of category {} but got index {}",
                        category_index, i
                    )));
                }
            };
            Ok(RecipeNode {
                category_index,
                multiplicity: multiplicities[category_index],
                children,
            })
        })
        .collect()
}

fn node_from_spec(spec: &RecipeNodeSpec, num_categories: usize) -> Result<RecipeNode> {
    if spec.index >= num_categories {
        return Err(AuctionError::UnknownCategory {
            index: spec.index,
            num_categories,
        });
    }
    if spec.count == 0 {
        return Err(AuctionError::InvalidMultiplicity(spec.index));
    }
    Ok(RecipeNode {
        category_index: spec.index,
        multiplicity: spec.count,
        children: spec
            .children
            .iter()
            .map(|child| node_from_spec(child, num_categories))
            .collect::<Result<_>>()?,
    })
}

// === NODE RECURSIONS ===

impl RecipeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn collect_paths(&self, prefix: &mut Vec<CategoryIndex>, paths: &mut Vec<Vec<CategoryIndex>>) {
        prefix.push(self.category_index);
        if self.is_leaf() {
            paths.push(prefix.clone());
        }
        for child in &self.children {
            child.collect_paths(prefix, paths);
        }
        prefix.pop();
    }

    fn collect_recipes(&self, current: &mut Recipe, recipes: &mut Vec<Recipe>) {
        let saved = current[self.category_index];
        current[self.category_index] = self.multiplicity;
        if self.is_leaf() {
            recipes.push(current.clone());
        }
        for child in &self.children {
            child.collect_recipes(current, recipes);
        }
        current[self.category_index] = saved;
    }

    fn effective_size(&self, categories: &[AgentCategory]) -> f64 {
        categories[self.category_index].size() as f64 / self.multiplicity as f64
    }

    fn own_deals(&self, categories: &[AgentCategory]) -> usize {
        categories[self.category_index].size() / self.multiplicity as usize
    }

    /// Own agents grouped `multiplicity` at a time, strongest first; a short final group is dropped.
    fn combined_values(&self, categories: &[AgentCategory]) -> Vec<ProcurementSet> {
        let values: Vec<Value> = categories[self.category_index].values().collect();
        let own = values
            .chunks_exact(self.multiplicity as usize)
            .map(|group| ProcurementSet::from_group(self.category_index, group));
        if self.is_leaf() {
            return own.collect();
        }
        let mut below: Vec<ProcurementSet> = self
            .children
            .iter()
            .flat_map(|child| child.combined_values(categories))
            .collect();
        below.sort_by(|a, b| b.gain_from_trade().total_cmp(&a.gain_from_trade()));
        own.zip(below.iter())
            .map(|(group, child)| group.joined(child))
            .collect()
    }

    fn num_of_deals(&self, categories: &[AgentCategory]) -> usize {
        let own = self.own_deals(categories);
        if self.is_leaf() {
            return own;
        }
        let below: usize = self
            .children
            .iter()
            .map(|child| child.num_of_deals(categories))
            .sum();
        own.min(below)
    }

    fn deal_count(&self, categories: &[AgentCategory]) -> DealCount {
        let category = &categories[self.category_index];
        let own_deals = self.own_deals(categories);
        let children: Vec<DealCount> = self
            .children
            .iter()
            .map(|child| child.deal_count(categories))
            .collect();
        let children_deals: usize = children.iter().map(|c| c.deals).sum();
        let (deals, kmin, kmax) = if children.is_empty() {
            (own_deals, own_deals, own_deals)
        } else {
            let kmin = children
                .iter()
                .map(|c| c.kmin)
                .filter(|&k| k > 0)
                .min()
                .unwrap_or(0);
            let kmax = children.iter().map(|c| c.kmax).max().unwrap_or(0);
            (own_deals.min(children_deals), kmin, kmax)
        };
        DealCount {
            category_index: self.category_index,
            name: category.name.clone(),
            size: category.size(),
            multiplicity: self.multiplicity,
            own_deals,
            children_deals,
            deals,
            kmin,
            kmax,
            children,
        }
    }

    fn largest_categories(&self, categories: &[AgentCategory]) -> LargestCategories {
        let own = self.effective_size(categories);
        let children_combined: f64 = self
            .children
            .iter()
            .map(|child| child.effective_size(categories).ceil())
            .sum();
        // Ties go to the children.
        if self.is_leaf() || own > children_combined {
            return LargestCategories {
                largest_size: own,
                combined_size: own,
                categories: vec![self.category_index],
            };
        }
        let mut largest_size: f64 = 0.0;
        let mut selected = Vec::new();
        for child in &self.children {
            let below = child.largest_categories(categories);
            largest_size = largest_size.max(below.largest_size);
            selected.extend(below.categories);
        }
        LargestCategories {
            largest_size,
            combined_size: own,
            categories: selected,
        }
    }

    fn assign_initial_prices(
        &self,
        max_value: Value,
        target_sum: Price,
        weight_above: f64,
        prices: &mut [Option<Price>],
    ) {
        let multiplicity = self.multiplicity as f64;
        if self.is_leaf() {
            let price = (target_sum + max_value * weight_above) / multiplicity;
            prices[self.category_index].get_or_insert(price);
            return;
        }
        prices[self.category_index].get_or_insert(-max_value);
        for child in &self.children {
            child.assign_initial_prices(max_value, target_sum, weight_above + multiplicity, prices);
        }
    }
}
