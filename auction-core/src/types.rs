// === CORE TYPES ===

/// Position of a category inside a [`Market`](crate::Market).
pub type CategoryIndex = usize;
/// Signed valuation of a single agent. Buyers are positive, sellers and producers negative.
pub type Value = f64;
pub type Price = f64;
/// Agents of one category consumed by a single procurement set.
pub type Multiplicity = u32;
/// One multiplicity per category; zero marks a category outside the recipe.
pub type Recipe = Vec<Multiplicity>;

/// Sentinel larger than any valuation. Initial prices start at its negation.
pub const MAX_VALUE: Value = 100_000_000.0;

/// Price-sums closer to zero than this count as zero.
pub const ZERO_SUM_TOLERANCE: f64 = 1e-11;
