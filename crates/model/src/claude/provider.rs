//! Model implementation for the Claude (Anthropic) provider.

use super::{Body, Claude, stream::Event};
use anyhow::Result;
use async_stream::try_stream;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use gcore::{
    Choice, CompletionMeta, Delta, FinishReason, Model, Request, Response, Role, StreamChunk,
    Usage,
};
use serde::Deserialize;

/// Raw Anthropic non-streaming response.
#[derive(Deserialize)]
struct AnthropicResponse {
    id: CompactString,
    model: CompactString,
    content: Vec<ContentBlock>,
    stop_reason: Option<CompactString>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl Model for Claude {
    async fn send(&self, request: &Request) -> Result<Response> {
        let body = Body::from(request);
        let raw: AnthropicResponse = self.transport.send(&self.endpoint, &body).await?;
        Ok(to_response(raw))
    }

    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamChunk>> + Send {
        let body = Body::from(&request).stream();
        let transport = self.transport.clone();
        let endpoint = self.endpoint.clone();
        try_stream! {
            let mut events = std::pin::pin!(transport.stream_sse::<Event>(&endpoint, &body));
            while let Some(event) = events.next().await {
                if let Some(chunk) = event?.into_chunk()? {
                    yield chunk;
                }
            }
        }
    }
}

/// Map an Anthropic stop reason.
pub(super) fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        _ => FinishReason::Other,
    }
}

/// Convert an Anthropic response to the unified `Response` format.
fn to_response(raw: AnthropicResponse) -> Response {
    let content = raw
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    Response {
        meta: CompletionMeta {
            id: raw.id,
            object: "chat.completion".into(),
            model: raw.model,
            ..Default::default()
        },
        choices: vec![Choice {
            index: 0,
            message: Delta {
                role: Some(Role::Assistant),
                content: Some(content),
            },
            finish_reason: raw.stop_reason.as_deref().map(finish_reason),
        }],
        usage: Some(Usage {
            prompt_tokens: raw.usage.input_tokens,
            completion_tokens: raw.usage.output_tokens,
            total_tokens: raw.usage.input_tokens + raw.usage.output_tokens,
        }),
    }
}
