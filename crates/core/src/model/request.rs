//! Provider-neutral request type.

use crate::model::Message;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Which client shape a request targets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Chat completions (`messages` in, assistant message out).
    #[default]
    Chat,
    /// Text completions (`prompt` in, text out).
    Completion,
}

/// Request input, either a conversation or a raw prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// A chat conversation.
    Messages(Vec<Message>),
    /// A single text prompt.
    Prompt(String),
}

impl Input {
    /// View the input as chat messages. A prompt becomes one user message.
    pub fn to_messages(&self) -> Vec<Message> {
        match self {
            Self::Messages(messages) => messages.clone(),
            Self::Prompt(prompt) => vec![Message::user(prompt.clone())],
        }
    }

    /// View the input as a single prompt. Messages are joined by newlines.
    pub fn to_prompt(&self) -> String {
        match self {
            Self::Prompt(prompt) => prompt.clone(),
            Self::Messages(messages) => messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A completion request.
///
/// Contains everything a provider needs to make one LLM call. Provider
/// implementations convert this into their wire format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Request {
    /// The model to use.
    pub model: CompactString,

    /// Client shape the request is sent as.
    #[serde(default)]
    pub mode: Mode,

    /// Conversation or prompt.
    pub input: Input,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Echo the prompt back in completion mode.
    #[serde(default)]
    pub echo: bool,
}

impl Request {
    /// Create a chat request for the given model.
    pub fn chat(model: impl Into<CompactString>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            mode: Mode::Chat,
            input: Input::Messages(messages),
            temperature: None,
            max_tokens: None,
            echo: false,
        }
    }

    /// Create a completion request for the given model.
    pub fn completion(model: impl Into<CompactString>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            mode: Mode::Completion,
            input: Input::Prompt(prompt.into()),
            temperature: None,
            max_tokens: None,
            echo: false,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the completion-mode echo flag.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}
