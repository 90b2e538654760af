#![cfg(feature = "instrument")]
//! Checks the auction's trace events against the trade it reports.

use auction_core::instrument::capture;
use auction_core::{AscendingAuction, AuctionOutcome, Market, RecipeTree, recipe_spec};
use polars::prelude::*;

// === TEST FIXTURES ===

fn supply_chain() -> (Market, RecipeTree) {
    let market = Market::from_pairs([
        ("buyer", vec![60.0, 40.0, 20.0, -30.0]),
        ("seller", vec![-10.0, -30.0, -50.0]),
        ("producerA", vec![-1.0, -3.0, -5.0]),
        ("producerB", vec![-2.0, -4.0, -6.0, -8.0]),
    ]);
    let tree = RecipeTree::new(
        &market,
        &recipe_spec![0, [1, None, 2, [3, None]]],
        Some(&[1, 2, 1, 2]),
    )
    .unwrap();
    (market, tree)
}

fn col_f64(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn agent_count(market: &Market) -> usize {
    market.categories.iter().map(|c| c.size()).sum()
}

// === TRACE CONSISTENCY ===

#[test]
fn one_tick_row_per_round() {
    let (market, tree) = supply_chain();
    let (trade, trace) = capture(|| AscendingAuction::default().run(&market, &tree));
    let trade = trade.unwrap();

    assert_eq!(trace.row_count("auction_start"), 1);
    assert_eq!(trace.row_count("auction_end"), 1);
    assert_eq!(trace.row_count("auction_tick"), trade.ticks());
    assert!(trace.row_count("price_increase") >= trade.ticks() - 1);

    let end = trace.table("auction_end").unwrap();
    assert_eq!(end.u64_column("num_of_deals"), Some(&[trade.num_of_deals() as u64][..]));
    assert_eq!(end.str_column("outcome").map(|c| c[0].as_str()), Some("TerminatedAtZero"));
    assert_eq!(trade.outcome(), AuctionOutcome::TerminatedAtZero);
}

#[test]
fn removed_agents_account_for_the_pruned_market() {
    let (market, tree) = supply_chain();
    let (trade, trace) = capture(|| AscendingAuction::default().run(&market, &tree));
    let trade = trade.unwrap();

    let removed = trace.row_count("agent_removed");
    assert_eq!(removed + agent_count(trade.remaining_market()), agent_count(&market));

    let dfs = trace.to_dataframes();
    let df = dfs.get("agent_removed").expect("agent_removed dataframe");
    assert_eq!(df.height(), removed);
    for (value, price) in col_f64(df, "value").into_iter().zip(col_f64(df, "price")) {
        assert!(value <= price, "agent at {} removed above price {}", value, price);
    }
}

#[test]
fn price_increases_never_go_down() {
    let (market, tree) = supply_chain();
    let (_, trace) = capture(|| AscendingAuction::default().run(&market, &tree));
    let dfs = trace.to_dataframes();
    let df = dfs.get("price_increase").expect("price_increase dataframe");
    for raise in col_f64(df, "raise") {
        assert!(raise >= 0.0);
    }
    let labels = trace.table("price_increase").unwrap().str_column("label").unwrap();
    assert!(labels.iter().all(|l| ["buyer", "seller", "producerA", "producerB"].contains(&l.as_str())));
}

#[test]
fn no_trade_run_still_reports_its_end() {
    let market = Market::from_pairs([("buyer", vec![9.0]), ("seller", vec![-4.0])]);
    let tree = RecipeTree::new(&market, &recipe_spec![0, [1, None]], None).unwrap();
    let (trade, trace) = capture(|| AscendingAuction::default().run(&market, &tree));
    assert_eq!(trade.unwrap().num_of_deals(), 0);
    assert_eq!(trace.row_count("auction_end"), 1);
    let end = trace.table("auction_end").unwrap();
    assert_eq!(end.u64_column("num_of_deals"), Some(&[0][..]));
}
