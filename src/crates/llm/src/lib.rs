//! Chat model abstraction and providers for insightflow.
//!
//! The crate defines the [`ChatModel`] trait that the orchestration layer
//! programs against, plus a remote provider for OpenAI-compatible endpoints.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::{ChatModel, ChatRequest, Message, OpenAiClient, RemoteLlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "OPENAI_API_KEY",
//!         "https://api.openai.com/v1",
//!         "gpt-3.5-turbo",
//!     )?;
//!     let client = OpenAiClient::new(config)?;
//!
//!     let request = ChatRequest::new(vec![
//!         Message::system("You are a data analyst."),
//!         Message::user("Summarize the attached statistics."),
//!     ])
//!     .with_temperature(0.3);
//!
//!     let response = client.chat(request).await?;
//!     println!("Response: {}", response.text());
//!
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod messages;
pub mod remote;

// Re-export commonly used types
pub use chat::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use messages::{Message, MessageRole};
pub use remote::OpenAiClient;
