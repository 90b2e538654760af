use crate::config::AuctionConfig;
use crate::error::Result;
use crate::market::Market;
use crate::prices::{PriceIncrease, PriceStatus, SimultaneousAscendingPriceVectors};
use crate::recipe::{RecipeSpec, RecipeTree};
use crate::types::{Multiplicity, Price};

use super::trade::{AuctionOutcome, Trade};

// === ASCENDING AUCTION ===

/// Multi-clock, strongly budget-balanced ascending auction over a recipe tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct AscendingAuction {
    pub config: AuctionConfig,
}

impl AscendingAuction {
    pub fn new(config: AuctionConfig) -> Self {
        Self { config }
    }

    /// Run the auction on a private copy of `market`; the caller's market is left as is.
    ///
    /// Each tick raises the price of the most abundant category on every recipe path
    /// towards its weakest remaining agent, then drops every agent priced out. The loop
    /// ends when the recipe tree can no longer deliver a deal, or when the common
    /// recipe price-sum reaches zero.
    pub fn run(&self, market: &Market, tree: &RecipeTree) -> Result<Trade> {
        let optimal = tree.optimal_trade(market)?;
        let mut remaining = market.clone();
        let mut prices = SimultaneousAscendingPriceVectors::new(
            tree.recipes(),
            tree.initial_prices(self.config.max_value),
        )?
        .with_zero_tolerance(self.config.zero_tolerance);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "auction_start",
            num_categories = market.num_categories() as u64,
            num_recipes = prices.recipes().len() as u64,
            optimal_count = optimal.count as u64,
            optimal_gft = optimal.gain_from_trade,
        );

        let mut tick = 0;
        let outcome = loop {
            tick += 1;
            let largest = tree.largest_categories(&remaining)?;

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "auction_tick",
                tick = tick as u64,
                largest_size = largest.largest_size,
                combined_size = largest.combined_size,
                num_selected = largest.categories.len() as u64,
            );

            if largest.combined_size == 0.0 {
                break AuctionOutcome::NoTrade;
            }

            let increases = largest
                .categories
                .iter()
                .map(|&index| {
                    let category = remaining.category(index)?;
                    let target = if category.is_empty() {
                        Price::INFINITY
                    } else {
                        category.lowest_agent_value()?
                    };
                    Ok(PriceIncrease::new(index, target, category.name.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            if prices.increase_prices(&increases)? == PriceStatus::StoppedAtZeroSum {
                break AuctionOutcome::TerminatedAtZero;
            }

            for (index, price) in prices.map_category_index_to_price().into_iter().enumerate() {
                let Some(price) = price else { continue };
                let category = remaining.category_mut(index)?;
                if category.is_empty() || category.lowest_agent_value()? > price {
                    continue;
                }
                let _removed = category.remove_lowest_agent()?;

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "agent_removed",
                    tick = tick as u64,
                    category_index = index as u64,
                    value = _removed,
                    price = price,
                    remaining = category.size() as u64,
                );
            }
        };

        let final_prices = prices.map_category_index_to_price();
        let trade = Trade::new(remaining, tree.clone(), final_prices, optimal, outcome, tick)?;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "auction_end",
            ticks = tick as u64,
            outcome = ?outcome,
            num_of_deals = trade.num_of_deals() as u64,
            kmin = trade.min_num_of_deals() as u64,
            kmax = trade.max_num_of_deals() as u64,
            gft = trade.gain_from_trade(true),
            optimal_gft = trade.optimal_trade_gft(),
        );

        Ok(trade)
    }
}

/// Run the auction with default parameters on the nested list form of a recipe tree.
pub fn budget_balanced_ascending_auction(
    market: &Market,
    recipe: &RecipeSpec,
    multiplicities: Option<&[Multiplicity]>,
) -> Result<Trade> {
    let tree = RecipeTree::new(market, recipe, multiplicities)?;
    AscendingAuction::default().run(market, &tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe_spec;

    fn buyer_seller(buyers: &[f64], sellers: &[f64]) -> Market {
        Market::from_pairs([("buyer", buyers.to_vec()), ("seller", sellers.to_vec())])
    }

    #[test]
    fn caller_market_is_not_pruned() {
        let market = buyer_seller(&[9.0, 8.0], &[-4.0, -3.0]);
        let before = market.clone();
        budget_balanced_ascending_auction(&market, &recipe_spec![0, [1, None]], None).unwrap();
        assert_eq!(market, before);
    }

    #[test]
    fn empty_seller_side_means_no_trade() {
        let market = buyer_seller(&[9.0], &[]);
        let trade = budget_balanced_ascending_auction(&market, &recipe_spec![0, [1, None]], None).unwrap();
        assert_eq!(trade.num_of_deals(), 0);
        assert_eq!(trade.to_string(), "No trade");
    }

    #[test]
    fn empty_market_stops_on_first_tick() {
        let market = buyer_seller(&[], &[]);
        let trade = budget_balanced_ascending_auction(&market, &recipe_spec![0, [1, None]], None).unwrap();
        assert_eq!(trade.outcome(), AuctionOutcome::NoTrade);
        assert_eq!(trade.ticks(), 1);
    }

    #[test]
    fn final_prices_balance_the_budget() {
        let market = buyer_seller(&[9.0, 8.0, 7.0], &[-1.0, -2.0, -3.0, -4.0]);
        let trade = budget_balanced_ascending_auction(&market, &recipe_spec![0, [1, None]], None).unwrap();
        assert_eq!(trade.outcome(), AuctionOutcome::TerminatedAtZero);
        let sum: f64 = trade.prices().iter().flatten().sum();
        assert!(sum.abs() < 1e-6, "price sum {}", sum);
    }

    #[test]
    fn custom_config_is_used() {
        let market = buyer_seller(&[9.0, 8.0], &[-4.0]);
        let tree = RecipeTree::new(&market, &recipe_spec![0, [1, None]], None).unwrap();
        let auction = AscendingAuction::new(AuctionConfig {
            max_value: 1000.0,
            ..AuctionConfig::default()
        });
        let trade = auction.run(&market, &tree).unwrap();
        assert_eq!(trade.num_of_deals(), 1);
        assert_eq!(trade.prices(), &[Some(8.0), Some(-8.0)]);
    }
}
