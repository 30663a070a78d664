//! API request handlers

pub mod analysis;
pub mod health;

pub use analysis::{analyze, token_usage};
pub use health::health;
