//! LLM clients for llmgate.
//!
//! Provider transports (OpenAI protocol, Anthropic Messages), the
//! configured [`LlmClient`] and the [`ClientFactory`] that builds clients
//! from resolved backend configuration.

pub use claude::Claude;
pub use client::{Backend, BackendKind, ClientOptions, LlmClient};
pub use factory::ClientFactory;
pub use openai::{OpenAI, Target};
pub use provider::Provider;
pub use reqwest::Client;

pub mod claude;
pub mod client;
pub mod factory;
mod http;
pub mod openai;
mod provider;
