//! Randomized checks of auction invariants over seeded markets.

use auction_core::{
    AgentCategory, AscendingAuction, AuctionOutcome, Market, RecipeSpec, RecipeTree,
    budget_balanced_ascending_auction, recipe_spec,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// === TEST FIXTURES ===

const SEEDS: u64 = 200;

fn random_market(rng: &mut StdRng, names: &[&str], max_agents: usize) -> Market {
    let categories = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let n = rng.random_range(0..=max_agents);
            if i == 0 {
                AgentCategory::uniformly_random(*name, n, 1.0, 100.0, rng)
            } else {
                AgentCategory::uniformly_random(*name, n, -50.0, -1.0, rng)
            }
        })
        .collect();
    Market::new(categories)
}

fn total_agents(market: &Market) -> usize {
    market.categories.iter().map(AgentCategory::size).sum()
}

fn supply_chain() -> RecipeSpec {
    recipe_spec![0, [1, None, 2, [3, None]]]
}

fn chain(depth: usize) -> RecipeSpec {
    let mut spec = RecipeSpec::End;
    for index in (1..depth).rev() {
        spec = RecipeSpec::Nested(vec![RecipeSpec::Index(index), spec]);
    }
    RecipeSpec::Nested(vec![RecipeSpec::Index(0), spec])
}

// === SINGLE RECIPE ===

#[test]
fn two_sided_auction_loses_at_most_one_deal() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let market = random_market(&mut rng, &["buyer", "seller"], 8);
        let trade = budget_balanced_ascending_auction(&market, &recipe_spec![0, [1, None]], None).unwrap();
        let optimal = trade.optimal_trade().count;
        assert!(
            trade.num_of_deals() <= optimal && trade.num_of_deals() + 1 >= optimal,
            "seed {}: {} deals, optimal {}",
            seed,
            trade.num_of_deals(),
            optimal
        );
        assert!(trade.gain_from_trade(false) >= -1e-9, "seed {}", seed);
    }
}

#[test]
fn chain_auction_loses_at_most_one_deal() {
    let names = ["buyer", "seller", "mediator", "broker"];
    for depth in 2..=4 {
        for multiplicities in [vec![1; depth], [1, 2, 1, 2][..depth].to_vec()] {
            for seed in 0..SEEDS {
                let mut rng = StdRng::seed_from_u64(seed);
                let market = random_market(&mut rng, &names[..depth], 9);
                let trade =
                    budget_balanced_ascending_auction(&market, &chain(depth), Some(&multiplicities[..]))
                        .unwrap();
                let optimal = trade.optimal_trade().count;
                assert!(
                    trade.num_of_deals() <= optimal && trade.num_of_deals() + 1 >= optimal,
                    "depth {} multiplicities {:?} seed {}: {} deals, optimal {}",
                    depth,
                    multiplicities,
                    seed,
                    trade.num_of_deals(),
                    optimal
                );
            }
        }
    }
}

#[test]
fn single_path_recipe_is_all_ones() {
    for depth in 1..6 {
        let spec = chain(depth);
        let market = Market::from_pairs((0..depth).map(|i| (format!("c{}", i), vec![1.0])));
        let tree = RecipeTree::new(&market, &spec, None).unwrap();
        assert_eq!(tree.recipes(), vec![vec![1; depth]]);
        assert_eq!(tree.paths_to_leaf(), vec![(0..depth).collect::<Vec<_>>()]);
    }
}

// === SEVERAL RECIPES ===

#[test]
fn random_supply_chains_terminate_and_balance() {
    for (seed, multiplicities) in (0..SEEDS).zip([None, Some([1, 2, 1, 2])].into_iter().cycle()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let market = random_market(&mut rng, &["buyer", "seller", "A", "B"], 9);
        let tree = RecipeTree::new(&market, &supply_chain(), multiplicities.as_ref().map(|m| &m[..]))
            .unwrap();
        let trade = AscendingAuction::default().run(&market, &tree).unwrap();

        assert!(trade.num_of_deals() <= trade.optimal_trade().count, "seed {}", seed);
        assert!(trade.ticks() <= total_agents(&market) + 2, "seed {}: {} ticks", seed, trade.ticks());
        if trade.outcome() == AuctionOutcome::TerminatedAtZero {
            for recipe in tree.recipes() {
                let sum: f64 = recipe
                    .iter()
                    .zip(trade.prices())
                    .map(|(&r, p)| r as f64 * p.unwrap_or(0.0))
                    .sum();
                assert!(sum.abs() < 1e-6, "seed {}: recipe {:?} sums to {}", seed, recipe, sum);
            }
        }
    }
}

#[test]
fn removing_largest_categories_reaches_zero() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut market = random_market(&mut rng, &["buyer", "seller", "A", "B"], 6);
        let tree = RecipeTree::new(&market, &supply_chain(), None).unwrap();
        let mut rounds = 0;
        loop {
            let largest = tree.largest_categories(&market).unwrap();
            if largest.combined_size == 0.0 {
                break;
            }
            for index in largest.categories {
                let category = market.category_mut(index).unwrap();
                if !category.is_empty() {
                    category.remove_lowest_agent().unwrap();
                }
            }
            rounds += 1;
            assert!(rounds <= 4 * 6, "seed {}: no progress", seed);
        }
    }
}

#[test]
fn sibling_order_does_not_change_matching() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let market = random_market(&mut rng, &["buyer", "seller", "A", "B"], 6);
        let forward = RecipeTree::new(&market, &supply_chain(), None).unwrap();
        let swapped =
            RecipeTree::new(&market, &recipe_spec![0, [2, [3, None], 1, None]], None).unwrap();

        let gains = |tree: &RecipeTree| -> Vec<f64> {
            tree.combined_values(&market)
                .unwrap()
                .iter()
                .map(|set| set.gain_from_trade())
                .collect()
        };
        let (a, b) = (gains(&forward), gains(&swapped));
        assert_eq!(a.len(), b.len(), "seed {}", seed);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9, "seed {}: {:?} vs {:?}", seed, a, b);
        }
        assert_eq!(
            forward.num_of_deals(&market).unwrap(),
            swapped.num_of_deals(&market).unwrap()
        );
    }
}
