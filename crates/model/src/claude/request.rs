//! Request body for the Anthropic Messages API.

use compact_str::CompactString;
use gcore::{Message, Request, Role};
use serde::Serialize;

/// Default generation budget; the API requires one.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// The request body for the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct Body {
    /// The model identifier.
    pub model: CompactString,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// System prompt (top-level, not in messages array).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// User and assistant turns.
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Body {
    /// Enable streaming for the request.
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }
}

impl From<&Request> for Body {
    fn from(request: &Request) -> Self {
        let mut system: Option<String> = None;
        let mut messages = Vec::new();
        for message in request.input.to_messages() {
            if message.role == Role::System {
                match &mut system {
                    Some(prompt) => {
                        prompt.push('\n');
                        prompt.push_str(&message.content);
                    }
                    None => system = Some(message.content),
                }
            } else {
                messages.push(message);
            }
        }

        Self {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            stream: false,
            temperature: request.temperature,
        }
    }
}
