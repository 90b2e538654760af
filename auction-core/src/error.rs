use crate::types::CategoryIndex;

pub type Result<T> = std::result::Result<T, AuctionError>;

#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("category '{name}' has no agents")]
    EmptyCategory { name: String },

    #[error("malformed recipe specification: {0}")]
    MalformedRecipeSpecification(String),

    #[error("recipe refers to category {index} but the market has {num_categories} categories")]
    UnknownCategory {
        index: CategoryIndex,
        num_categories: usize,
    },

    #[error("expected {expected} multiplicities, got {actual}")]
    MultiplicityLengthMismatch { expected: usize, actual: usize },

    #[error("multiplicity of category {0} must be positive")]
    InvalidMultiplicity(CategoryIndex),

    #[error("expected {expected} entries, got {actual}")]
    RecipeLengthMismatch { expected: usize, actual: usize },

    #[error("no recipes to price")]
    EmptyRecipeFamily,

    #[error("recipe tree spans {tree} categories but the market has {market}")]
    CategoryCountMismatch { tree: usize, market: usize },

    #[error("invalid scenario: {0}")]
    InvalidScenario(#[from] serde_json::Error),
}
