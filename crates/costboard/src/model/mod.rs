//! Pricing domain types: providers, token counts, cost rows and benchmarks.

pub mod input;
pub mod types;

pub use input::*;
pub use types::*;
