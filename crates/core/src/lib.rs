//! Core types for the llmgate backend-resolution layer.
//!
//! Provides the provider-neutral LLM types shared by every transport:
//! `Message`, `Request`, `Response`, `StreamChunk`, the `Model` trait and
//! the `Callback` token handler.

pub use callback::Callback;
pub use model::{
    Aggregate, Choice, CompletionMeta, Delta, FinishReason, Input, Message, Mode, Model, Request,
    Response, Role, StreamChoice, StreamChunk, Usage,
};

mod callback;
pub mod model;
