//! Remote chat model providers.
//!
//! Providers here call hosted APIs and need an API key. The OpenAI client also
//! covers gateways and self-hosted servers that expose the same schema.

pub mod openai;

pub use openai::OpenAiClient;
