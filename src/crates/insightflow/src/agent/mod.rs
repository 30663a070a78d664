//! Agent adapters
//!
//! One adapter type serves every specialist role; the role selects prompt,
//! model and sampling defaults.

pub mod adapter;
pub mod config;
pub mod parser;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AgentAdapter, AgentReply, MAX_HISTORY_EXCHANGES};
pub use config::{AgentConfig, AgentOverrides, AgentRole};
pub use retry::{classify_error, retry_with_backoff, ErrorClass, RetryConfig};
