//! Claude (Anthropic) LLM provider.
//!
//! Implements the Anthropic Messages API, which differs from the OpenAI
//! chat completions format in message structure and streaming events.

use crate::http::Transport;
use anyhow::Result;
use reqwest::Client;
pub use request::Body;

mod provider;
mod request;
mod stream;

/// The Anthropic Messages API endpoint.
pub const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

/// The Anthropic API version header value.
const API_VERSION: &str = "2023-06-01";

/// The Claude LLM provider.
#[derive(Clone)]
pub struct Claude {
    transport: Transport,
    /// Messages API endpoint URL.
    endpoint: String,
}

impl Claude {
    /// Create a provider targeting the Anthropic API.
    pub fn anthropic(client: Client, key: &str) -> Result<Self> {
        Self::custom(client, key, ENDPOINT)
    }

    /// Create a provider targeting a custom Anthropic-compatible base URL.
    ///
    /// `base` may be the full messages endpoint, a `/v1` base or a bare
    /// origin.
    pub fn custom(client: Client, key: &str, base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/');
        let endpoint = if base.ends_with("/messages") {
            base.to_owned()
        } else if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        };

        let mut transport = Transport::new(client);
        transport.insert("x-api-key", key)?;
        transport.insert("anthropic-version", API_VERSION)?;
        Ok(Self {
            transport,
            endpoint,
        })
    }

    /// The messages endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
