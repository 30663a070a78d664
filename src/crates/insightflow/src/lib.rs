//! # insightflow
//!
//! Multi-agent orchestration for tabular data analysis. A supervisor runs
//! four language-model specialists in a fixed order over one dataset and one
//! question, under a shared daily token budget:
//!
//! 1. **Data Analyst**: summary statistics, missing values, correlations and
//!    model-written insights
//! 2. **Visualizer**: Plotly chart payloads plus chart recommendations
//! 3. **Narrator**: executive summary, findings, implications, recommendations
//!    and next steps
//! 4. **QA Reviewer**: scored quality checks and improvement suggestions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use insightflow::{Supervisor, SupervisorConfig, TokenBudgetTracker};
//! use llm::{OpenAiClient, RemoteLlmConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = OpenAiClient::new(RemoteLlmConfig::from_env(
//!     "OPENAI_API_KEY",
//!     "https://api.openai.com/v1",
//!     "gpt-3.5-turbo",
//! )?)?;
//! let tracker = TokenBudgetTracker::new(10_000);
//! let supervisor = Supervisor::new(Arc::new(client), tracker, SupervisorConfig::default());
//!
//! let dataset = serde_json::json!([{"region": "north", "sales": 10}, {"region": "south", "sales": 7}]);
//! let result = supervisor.run("Which region sells more?", &dataset).await?;
//! println!("{}", result.narrative.executive_summary);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod api;
pub mod budget;
pub mod config;
pub mod dataset;
pub mod error;
pub mod specialists;
pub mod supervisor;

pub use agent::{AgentAdapter, AgentConfig, AgentReply, AgentRole, RetryConfig};
pub use budget::{TokenBudget, TokenBudgetTracker, DEFAULT_DAILY_LIMIT};
pub use config::AppConfig;
pub use dataset::TabularDataset;
pub use error::{ErrorKind, InsightError, Result};
pub use supervisor::{Supervisor, SupervisorConfig, WorkflowFailure, WorkflowResult, WorkflowStage};

/// Version string for the insightflow crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Get the version of this crate
pub fn version() -> &'static str {
    VERSION
}
