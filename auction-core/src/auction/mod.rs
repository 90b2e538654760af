pub mod engine;
pub mod report;
pub mod trade;

pub use engine::*;
pub use report::*;
pub use trade::*;
