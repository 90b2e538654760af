pub mod explain;
pub mod spec;
pub mod tree;

pub use explain::*;
pub use spec::*;
pub use tree::*;
