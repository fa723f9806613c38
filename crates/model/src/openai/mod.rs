//! OpenAI-protocol provider.
//!
//! Covers the first-party OpenAI API, Azure-hosted deployments and any
//! service exposing the OpenAI chat and text completion endpoints, such
//! as the gateway's own OpenAI-compatible API.

use crate::http::Transport;
use anyhow::Result;
use gcore::Mode;
use reqwest::Client;
pub use request::Body;

mod provider;
mod request;

/// Base URL of the first-party OpenAI API.
pub const API_BASE: &str = "https://api.openai.com/v1";

/// Where requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `{base}/chat/completions` and `{base}/completions`.
    Base(String),
    /// An Azure deployment, addressed by name and API version.
    Azure {
        base: String,
        deployment: String,
        api_version: String,
    },
}

impl Target {
    /// Endpoint URL for requests sent as `mode`.
    pub fn endpoint(&self, mode: Mode) -> String {
        let path = match mode {
            Mode::Chat => "chat/completions",
            Mode::Completion => "completions",
        };
        match self {
            Self::Base(base) => format!("{}/{path}", base.trim_end_matches('/')),
            Self::Azure {
                base,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{deployment}/{path}?api-version={api_version}",
                base.trim_end_matches('/')
            ),
        }
    }
}

/// An OpenAI-protocol LLM provider.
#[derive(Clone)]
pub struct OpenAI {
    transport: Transport,
    target: Target,
}

impl OpenAI {
    /// Provider targeting the first-party OpenAI API.
    pub fn api(client: Client, key: &str) -> Result<Self> {
        Self::compatible(client, key, API_BASE)
    }

    /// Provider targeting any OpenAI-compatible base URL (ending in `/v1`
    /// or equivalent).
    pub fn compatible(client: Client, key: &str, base: &str) -> Result<Self> {
        Ok(Self {
            transport: Transport::bearer(client, key)?,
            target: Target::Base(base.to_owned()),
        })
    }

    /// Provider targeting an Azure OpenAI deployment.
    pub fn azure(
        client: Client,
        key: &str,
        base: &str,
        deployment: &str,
        api_version: &str,
    ) -> Result<Self> {
        let mut transport = Transport::new(client);
        transport.insert("api-key", key)?;
        Ok(Self {
            transport,
            target: Target::Azure {
                base: base.to_owned(),
                deployment: deployment.to_owned(),
                api_version: api_version.to_owned(),
            },
        })
    }

    /// The request target.
    pub fn target(&self) -> &Target {
        &self.target
    }
}
