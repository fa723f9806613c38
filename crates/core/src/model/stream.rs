//! Streaming response types

use crate::model::{Choice, CompletionMeta, Delta, FinishReason, Response, Role, Usage};
use serde::{Deserialize, Serialize};

/// A streaming completion chunk
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamChunk {
    /// Completion metadata
    #[serde(flatten)]
    pub meta: CompletionMeta,

    /// The list of completion choices (with delta content)
    #[serde(default)]
    pub choices: Vec<StreamChoice>,

    /// Token usage statistics (only in final chunk)
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// Build a chunk carrying a single content delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![StreamChoice {
                delta: Delta {
                    content: Some(content.into()),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// Get the content of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// Get the reason the model stopped generating
    pub fn reason(&self) -> Option<&FinishReason> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_ref())
    }
}

/// A completion choice in a streaming response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamChoice {
    /// The index of this choice in the list
    #[serde(default)]
    pub index: u32,

    /// The delta content for this chunk
    #[serde(default)]
    pub delta: Delta,

    /// The reason the model stopped generating
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Folds a chunk stream into one `Response`.
///
/// Only the first choice is accumulated; metadata is taken from the first
/// chunk that carries an id, usage and finish reason from the last chunk
/// that carries them.
#[derive(Debug, Default)]
pub struct Aggregate {
    meta: CompletionMeta,
    content: String,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

impl Aggregate {
    /// Add a chunk to the aggregate.
    pub fn push(&mut self, chunk: &StreamChunk) {
        if self.meta.id.is_empty() && !chunk.meta.id.is_empty() {
            self.meta = chunk.meta.clone();
        }
        if let Some(content) = chunk.content() {
            self.content.push_str(content);
        }
        if let Some(reason) = chunk.reason() {
            self.finish_reason = Some(*reason);
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
    }

    /// Content accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Finish aggregation and produce the response.
    pub fn finish(self) -> Response {
        Response {
            meta: self.meta,
            choices: vec![Choice {
                index: 0,
                message: Delta {
                    role: Some(Role::Assistant),
                    content: Some(self.content),
                },
                finish_reason: self.finish_reason,
            }],
            usage: self.usage,
        }
    }
}
