//! Wire types for the OpenAI chat and text completion endpoints.

use compact_str::CompactString;
use gcore::{
    Choice, CompletionMeta, Delta, FinishReason, Message, Mode, Request, Response, Role,
    StreamChoice, StreamChunk, Usage,
};
use serde::{Deserialize, Serialize};

/// Request body shared by both endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Body {
    /// The model identifier.
    pub model: CompactString,
    /// Conversation, chat mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    /// Prompt, completion mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Echo the prompt back, completion mode only.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub echo: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl Body {
    /// Enable streaming.
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }
}

impl From<&Request> for Body {
    fn from(request: &Request) -> Self {
        let (messages, prompt, echo) = match request.mode {
            Mode::Chat => (Some(request.input.to_messages()), None, false),
            Mode::Completion => (None, Some(request.input.to_prompt()), request.echo),
        };
        Self {
            model: request.model.clone(),
            messages,
            prompt,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            echo,
            stream: false,
        }
    }
}

/// Text completion response, also used for its stream chunks.
#[derive(Debug, Deserialize)]
pub(crate) struct TextResponse {
    #[serde(flatten)]
    meta: CompletionMeta,
    #[serde(default)]
    choices: Vec<TextChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct TextChoice {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    text: String,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

impl From<TextResponse> for Response {
    fn from(raw: TextResponse) -> Self {
        Self {
            meta: raw.meta,
            choices: raw
                .choices
                .into_iter()
                .map(|choice| Choice {
                    index: choice.index,
                    message: Delta {
                        role: Some(Role::Assistant),
                        content: Some(choice.text),
                    },
                    finish_reason: choice.finish_reason,
                })
                .collect(),
            usage: raw.usage,
        }
    }
}

impl From<TextResponse> for StreamChunk {
    fn from(raw: TextResponse) -> Self {
        Self {
            meta: raw.meta,
            choices: raw
                .choices
                .into_iter()
                .map(|choice| StreamChoice {
                    index: choice.index,
                    delta: Delta {
                        role: None,
                        content: Some(choice.text),
                    },
                    finish_reason: choice.finish_reason,
                })
                .collect(),
            usage: raw.usage,
        }
    }
}
