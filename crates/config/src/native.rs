//! Providers the client factory talks to directly.
//!
//! Native providers are selected by exact model name, never by looking the
//! name up in the online catalog.

use crate::NativeModel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A natively supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeProvider {
    /// Azure-hosted OpenAI deployment.
    #[serde(rename = "Azure-OpenAI")]
    AzureOpenAI,
    /// First-party OpenAI API.
    #[serde(rename = "OpenAI")]
    OpenAI,
    /// Anthropic API.
    #[serde(rename = "Anthropic")]
    Anthropic,
}

impl NativeProvider {
    /// Every native provider.
    pub const ALL: [Self; 3] = [Self::AzureOpenAI, Self::OpenAI, Self::Anthropic];

    /// Match a model name against the native table. Exact, case-sensitive.
    pub fn from_model_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.model_name() == name)
    }

    /// The model name that selects this provider.
    pub fn model_name(self) -> &'static str {
        match self {
            Self::AzureOpenAI => "Azure-OpenAI",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Settings that must be present to construct a client.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::AzureOpenAI => &["api_key", "api_base_url", "api_version", "deployment_name"],
            Self::OpenAI => &["api_key"],
            Self::Anthropic => &["api_key"],
        }
    }

    /// Required settings that `model` leaves empty.
    pub fn missing_fields(self, model: &NativeModel) -> Vec<&'static str> {
        self.required_fields()
            .iter()
            .copied()
            .filter(|field| {
                let value = match *field {
                    "api_key" => &model.api_key,
                    "api_base_url" => &model.api_base_url,
                    "api_version" => &model.api_version,
                    "deployment_name" => &model.deployment_name,
                    _ => return false,
                };
                value.as_deref().is_none_or(|v| v.trim().is_empty())
            })
            .collect()
    }
}

impl fmt::Display for NativeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}
