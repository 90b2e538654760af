use std::fmt::Write;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::{CategoryIndex, Multiplicity, Price};

/// Deliverable deals at one node of a recipe tree, with the same for its subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct DealCount {
    pub category_index: CategoryIndex,
    pub name: String,
    /// Agents currently in the category.
    pub size: usize,
    pub multiplicity: Multiplicity,
    /// Deals this category alone could supply.
    pub own_deals: usize,
    /// Sum of the children's deliverable deals; zero at a leaf.
    pub children_deals: usize,
    pub deals: usize,
    pub kmin: usize,
    pub kmax: usize,
    pub children: Vec<DealCount>,
}

/// Outcome of [`RecipeTree::num_of_deals_explained`](super::RecipeTree::num_of_deals_explained).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct DealExplanation {
    pub num_of_deals: usize,
    pub explanation: String,
    pub kmin: usize,
    pub kmax: usize,
}

impl DealCount {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Line-per-node account of where the deal count comes from, children first,
    /// ending with the overall total.
    pub fn explain(&self, prices: &[Option<Price>]) -> String {
        let mut out = String::new();
        self.explain_into(prices, &mut out);
        let _ = writeln!(out, "{} deals overall", self.deals);
        out
    }

    fn explain_into(&self, prices: &[Option<Price>], out: &mut String) {
        let price = prices.get(self.category_index).copied().flatten();
        if self.is_leaf() {
            let _ = write!(out, "{}: {} potential deals", self.name, self.deals);
            finish_line(out, price);
            return;
        }
        for child in &self.children {
            child.explain_into(prices, out);
        }
        if self.deals == self.own_deals {
            let _ = write!(out, "{}: all {} traders selected", self.name, self.size);
        } else {
            let _ = write!(
                out,
                "{}: {} out of {} traders selected",
                self.name,
                self.deals * self.multiplicity as usize,
                self.size
            );
        }
        finish_line(out, price);

        let names = self
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        if self.deals == self.children_deals {
            let _ = writeln!(out, "{}: all {} deals selected", names, self.children_deals);
        } else {
            let _ = writeln!(
                out,
                "{}: {} out of {} deals selected",
                names, self.deals, self.children_deals
            );
        }
    }
}

fn finish_line(out: &mut String, price: Option<Price>) {
    match price {
        Some(p) => {
            let _ = writeln!(out, ", price={:?}", p);
        }
        None => out.push('\n'),
    }
}
