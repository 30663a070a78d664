//! Configuration module for insightflow
//!
//! TOML configuration for the server binary: bind address, model endpoint,
//! token budget, retry policy, workflow limits, QA thresholds and per-role
//! agent overrides.

pub mod server;

pub use server::{
    AppConfig, BudgetSection, ConfigError, LlmSection, QaSection, ServerSection, WorkflowSection,
    CONFIG_FILE_NAME,
};
