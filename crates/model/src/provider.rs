//! Unified `Provider` enum with enum dispatch over concrete backends.

use crate::{claude::Claude, openai::OpenAI};
use anyhow::Result;
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use gcore::{Mode, Model, Request, Response, StreamChunk};

/// Unified LLM provider enum.
///
/// The factory constructs the appropriate variant from the resolved
/// backend; clients are monomorphized on `Provider`.
#[derive(Clone)]
pub enum Provider {
    /// OpenAI protocol (OpenAI, Azure, gateway and online workers).
    OpenAI(OpenAI),
    /// Anthropic Messages API.
    Claude(Claude),
}

impl Provider {
    /// Endpoint a request sent as `mode` goes to.
    pub fn endpoint(&self, mode: Mode) -> String {
        match self {
            Self::OpenAI(p) => p.target().endpoint(mode),
            Self::Claude(p) => p.endpoint().to_owned(),
        }
    }
}

impl Model for Provider {
    async fn send(&self, request: &Request) -> Result<Response> {
        match self {
            Self::OpenAI(p) => p.send(request).await,
            Self::Claude(p) => p.send(request).await,
        }
    }

    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamChunk>> + Send {
        let this = self.clone();
        try_stream! {
            match this {
                Provider::OpenAI(p) => {
                    let mut stream = std::pin::pin!(p.stream(request));
                    while let Some(chunk) = stream.next().await {
                        yield chunk?;
                    }
                }
                Provider::Claude(p) => {
                    let mut stream = std::pin::pin!(p.stream(request));
                    while let Some(chunk) = stream.next().await {
                        yield chunk?;
                    }
                }
            }
        }
    }
}
