//! SSE event parsing for the Anthropic streaming Messages API.
//!
//! Anthropic streaming events differ from OpenAI's format:
//! `message_start` carries the metadata, `content_block_delta` the text,
//! `message_delta` the stop reason and usage.

use super::provider::finish_reason;
use compact_str::CompactString;
use gcore::{CompletionMeta, Delta, StreamChoice, StreamChunk, Usage};
use serde::Deserialize;

/// A raw SSE event from the Anthropic streaming API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Initial message metadata.
    #[serde(rename = "message_start")]
    MessageStart { message: MessageMeta },
    /// Begin a content block.
    #[serde(rename = "content_block_start")]
    ContentBlockStart { content_block: ContentBlock },
    /// Incremental content within a block.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: BlockDelta },
    /// Final message delta (stop reason + usage).
    #[serde(rename = "message_delta")]
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<MessageDeltaUsage>,
    },
    /// Server-side failure mid-stream.
    #[serde(rename = "error")]
    Error { error: ErrorBody },
    /// Block stops, message stop, pings and anything newer.
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Deserialize)]
pub struct MessageMeta {
    pub id: CompactString,
    pub model: CompactString,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum BlockDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<CompactString>,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaUsage {
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl Event {
    /// Convert this event to a `StreamChunk`.
    ///
    /// `Ok(None)` for events that carry no output; `Err` for error events.
    pub fn into_chunk(self) -> anyhow::Result<Option<StreamChunk>> {
        let chunk = match self {
            Self::MessageStart { message } => Some(StreamChunk {
                meta: CompletionMeta {
                    id: message.id,
                    object: "chat.completion.chunk".into(),
                    model: message.model,
                    ..Default::default()
                },
                ..Default::default()
            }),
            Self::ContentBlockStart {
                content_block: ContentBlock::Text { text },
            } if !text.is_empty() => Some(StreamChunk::text(text)),
            Self::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
            } => Some(StreamChunk::text(text)),
            Self::MessageDelta { delta, usage } => Some(StreamChunk {
                choices: vec![StreamChoice {
                    delta: Delta::default(),
                    finish_reason: delta.stop_reason.as_deref().map(finish_reason),
                    ..Default::default()
                }],
                usage: usage.map(|usage| Usage {
                    prompt_tokens: 0,
                    completion_tokens: usage.output_tokens,
                    total_tokens: usage.output_tokens,
                }),
                ..Default::default()
            }),
            Self::Error { error } => anyhow::bail!("anthropic {}: {}", error.kind, error.message),
            Self::ContentBlockStart { .. } | Self::ContentBlockDelta { .. } | Self::Ignored => {
                None
            }
        };
        Ok(chunk)
    }
}
