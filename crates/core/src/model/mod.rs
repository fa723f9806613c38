//! Unified LLM interface types and traits.
//!
//! Provides the shared types used across all providers:
//! `Message`, `Request`, `Response`, `StreamChunk`, and the `Model` trait.

use anyhow::Result;
use futures_core::Stream;
pub use message::{Message, Role};
pub use request::{Input, Mode, Request};
pub use response::{Choice, CompletionMeta, Delta, FinishReason, Response, Usage};
pub use stream::{Aggregate, StreamChoice, StreamChunk};

mod message;
mod request;
mod response;
mod stream;

/// Unified LLM provider trait.
///
/// Implemented by every concrete transport (OpenAI-compatible, Azure,
/// Anthropic) and by the `Provider` enum that dispatches over them.
/// Constructors are inherent methods on each provider and never called
/// polymorphically.
pub trait Model: Sized + Clone {
    /// Send a request and wait for the complete response.
    fn send(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;

    /// Send a request and stream the response chunks.
    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamChunk>> + Send;
}
