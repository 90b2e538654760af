use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CategoryIndex, Multiplicity};

// === NESTED LIST FORM ===

/// Alternating `[index, children, index, children, ...]` description of a recipe tree,
/// where `children` is either another such list or `None` for a leaf.
///
/// In JSON this is written exactly like the list it models: `[0, [1, null, 2, [3, null]]]`.
/// In Rust, use [`recipe_spec!`](crate::recipe_spec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeSpec {
    Index(CategoryIndex),
    Nested(Vec<RecipeSpec>),
    End,
}

impl fmt::Display for RecipeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeSpec::Index(i) => write!(f, "{}", i),
            RecipeSpec::End => write!(f, "None"),
            RecipeSpec::Nested(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Builds a [`RecipeSpec`] from list syntax.
///
/// ```
/// use auction_core::recipe_spec;
/// let spec = recipe_spec![0, [1, None, 2, [3, None]]];
/// assert_eq!(spec.to_string(), "[0, [1, None, 2, [3, None]]]");
/// ```
#[macro_export]
macro_rules! recipe_spec {
    (@item None) => {
        $crate::recipe::RecipeSpec::End
    };
    (@item [$($inner:tt),* $(,)?]) => {
        $crate::recipe::RecipeSpec::Nested(vec![$($crate::recipe_spec!(@item $inner)),*])
    };
    (@item $index:expr) => {
        $crate::recipe::RecipeSpec::Index($index)
    };
    ($($item:tt),* $(,)?) => {
        $crate::recipe::RecipeSpec::Nested(vec![$($crate::recipe_spec!(@item $item)),*])
    };
}

// === NODE FORM ===

fn one() -> Multiplicity {
    1
}

/// Explicit node description: `{"index": 0, "count": 1, "children": [...]}`.
/// `count` is the number of agents of this category each deal needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeNodeSpec {
    pub index: CategoryIndex,
    #[serde(default = "one")]
    pub count: Multiplicity,
    #[serde(default)]
    pub children: Vec<RecipeNodeSpec>,
}

impl RecipeNodeSpec {
    pub fn leaf(index: CategoryIndex, count: Multiplicity) -> Self {
        Self {
            index,
            count,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: RecipeNodeSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Categories that appear with different counts in different nodes.
    ///
    /// Such a tree prices the category inconsistently; the auction does not reject it.
    pub fn inconsistent_categories(&self) -> Vec<CategoryIndex> {
        let mut seen: BTreeMap<CategoryIndex, (Multiplicity, bool)> = BTreeMap::new();
        self.collect_counts(&mut seen);
        seen.into_iter()
            .filter(|(_, (_, conflict))| *conflict)
            .map(|(index, _)| index)
            .collect()
    }

    fn collect_counts(&self, seen: &mut BTreeMap<CategoryIndex, (Multiplicity, bool)>) {
        let entry = seen.entry(self.index).or_insert((self.count, false));
        if entry.0 != self.count {
            entry.1 = true;
        }
        for child in &self.children {
            child.collect_counts(seen);
        }
    }
}

/// Either accepted shape, as found in scenario files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeDefinition {
    Nested(RecipeSpec),
    Node(RecipeNodeSpec),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_builds_nested_lists() {
        let spec = recipe_spec![0, [1, None, 2, [3, None]]];
        assert_eq!(
            spec,
            RecipeSpec::Nested(vec![
                RecipeSpec::Index(0),
                RecipeSpec::Nested(vec![
                    RecipeSpec::Index(1),
                    RecipeSpec::End,
                    RecipeSpec::Index(2),
                    RecipeSpec::Nested(vec![RecipeSpec::Index(3), RecipeSpec::End]),
                ]),
            ])
        );
    }

    #[test]
    fn nested_list_parses_from_json() {
        let spec: RecipeSpec = serde_json::from_str("[0, [1, null, 2, [3, null]]]").unwrap();
        assert_eq!(spec, recipe_spec![0, [1, None, 2, [3, None]]]);
        assert_eq!(spec.to_string(), "[0, [1, None, 2, [3, None]]]");
    }

    #[test]
    fn definition_accepts_both_shapes() {
        let nested: RecipeDefinition = serde_json::from_str("[0, [1, null]]").unwrap();
        assert_eq!(nested, RecipeDefinition::Nested(recipe_spec![0, [1, None]]));

        let node: RecipeDefinition =
            serde_json::from_str(r#"{"index": 0, "children": [{"index": 1, "count": 2}]}"#).unwrap();
        assert_eq!(
            node,
            RecipeDefinition::Node(RecipeNodeSpec::leaf(0, 1).with_child(RecipeNodeSpec::leaf(1, 2)))
        );
    }

    #[test]
    fn inconsistent_counts_are_reported() {
        let tree = RecipeNodeSpec::leaf(0, 1)
            .with_child(RecipeNodeSpec::leaf(1, 2))
            .with_child(RecipeNodeSpec::leaf(2, 1).with_child(RecipeNodeSpec::leaf(1, 1)));
        assert_eq!(tree.inconsistent_categories(), vec![1]);

        let consistent = RecipeNodeSpec::leaf(0, 1).with_child(RecipeNodeSpec::leaf(1, 2));
        assert!(consistent.inconsistent_categories().is_empty());
    }
}
