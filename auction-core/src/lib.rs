//! Strongly budget-balanced ascending auctions for multi-lateral markets.
//!
//! A [`Market`] holds categories of single-parameter agents (buyers, sellers,
//! producers, ...). A [`RecipeTree`] says which combinations of categories make one
//! deal. [`AscendingAuction`] raises one price clock per category until either supply
//! runs out or the recipe price-sums reach zero, and reports the resulting [`Trade`].

use wasm_bindgen::prelude::*;

pub mod agents;
pub mod auction;
pub mod config;
pub mod error;
pub mod market;
pub mod prices;
pub mod recipe;
pub mod types;

pub use agents::*;
pub use auction::*;
pub use config::*;
pub use error::AuctionError;
pub use market::*;
pub use prices::*;
pub use recipe::*;
pub use types::*;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Auction calculator
// ============================================================================

/// Run a scenario given as a JS object with the same shape as the JSON form of [`Scenario`].
#[wasm_bindgen]
pub fn run_auction(scenario: JsValue) -> Result<AuctionReport, JsError> {
    // Better panic messages in browser console
    console_error_panic_hook::set_once();

    let scenario: Scenario =
        serde_wasm_bindgen::from_value(scenario).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(AuctionReport::from_scenario(&scenario)?)
}

#[wasm_bindgen]
pub fn run_auction_json(json: &str) -> Result<AuctionReport, JsError> {
    console_error_panic_hook::set_once();

    let scenario = Scenario::from_json(json)?;
    Ok(AuctionReport::from_scenario(&scenario)?)
}
