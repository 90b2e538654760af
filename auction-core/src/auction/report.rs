use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::Scenario;
use crate::error::Result;
use crate::types::{Price, Recipe, Value};

use super::trade::{AuctionOutcome, Trade};

/// Flat summary of one auction run, shaped for the browser calculator.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct AuctionReport {
    pub market: String,
    pub recipes: Vec<Recipe>,
    pub paths: Vec<Vec<String>>,
    pub outcome: AuctionOutcome,
    pub ticks: usize,
    pub num_of_deals: usize,
    pub min_num_of_deals: usize,
    pub max_num_of_deals: usize,
    pub prices: Vec<Option<Price>>,
    pub explanation: String,
    pub summary: String,
    pub gain_from_trade: Value,
    pub traders_gain_from_trade: Value,
    pub optimal_num_of_deals: usize,
    pub optimal_gain_from_trade: Value,
}

impl AuctionReport {
    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        let market = scenario.market();
        let trade = scenario.run()?;
        Ok(Self {
            market: market.to_string(),
            recipes: trade.recipe_tree().recipes(),
            paths: trade.recipe_tree().path_names(&market)?,
            ..Self::from_trade(&trade)
        })
    }

    fn from_trade(trade: &Trade) -> Self {
        Self {
            market: String::new(),
            recipes: Vec::new(),
            paths: Vec::new(),
            outcome: trade.outcome(),
            ticks: trade.ticks(),
            num_of_deals: trade.num_of_deals(),
            min_num_of_deals: trade.min_num_of_deals(),
            max_num_of_deals: trade.max_num_of_deals(),
            prices: trade.prices().to_vec(),
            explanation: trade.explanation().to_string(),
            summary: trade.to_string(),
            gain_from_trade: trade.gain_from_trade(true),
            traders_gain_from_trade: trade.gain_from_trade(false),
            optimal_num_of_deals: trade.optimal_trade().count,
            optimal_gain_from_trade: trade.optimal_trade_gft(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_for_single_deal() {
        let scenario = Scenario::from_json(
            r#"{
                "categories": [
                    {"name": "buyer", "values": [9, 8]},
                    {"name": "seller", "values": [-4]}
                ],
                "recipe": [0, [1, null]]
            }"#,
        )
        .unwrap();
        let report = AuctionReport::from_scenario(&scenario).unwrap();
        assert_eq!(report.market, "Traders: [buyer: [9.0, 8.0], seller: [-4.0]]");
        assert_eq!(report.recipes, vec![vec![1, 1]]);
        assert_eq!(report.paths, vec![vec!["buyer".to_string(), "seller".to_string()]]);
        assert_eq!(report.outcome, AuctionOutcome::TerminatedAtZero);
        assert_eq!(report.num_of_deals, 1);
        assert_eq!(report.prices, vec![Some(8.0), Some(-8.0)]);
        assert!((report.gain_from_trade - 5.0).abs() < 1e-9);
        assert!((report.traders_gain_from_trade - 5.0).abs() < 1e-9);
        assert_eq!(report.optimal_num_of_deals, 1);
        assert!(report.summary.ends_with("1 deals overall"));
    }
}
