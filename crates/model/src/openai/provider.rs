//! Model implementation for the OpenAI-protocol provider.

use super::{Body, OpenAI, request::TextResponse};
use anyhow::Result;
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use gcore::{Mode, Model, Request, Response, StreamChunk};

impl Model for OpenAI {
    async fn send(&self, request: &Request) -> Result<Response> {
        let endpoint = self.target.endpoint(request.mode);
        let body = Body::from(request);
        match request.mode {
            Mode::Chat => self.transport.send(&endpoint, &body).await,
            Mode::Completion => self
                .transport
                .send::<TextResponse>(&endpoint, &body)
                .await
                .map(Into::into),
        }
    }

    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamChunk>> + Send {
        let endpoint = self.target.endpoint(request.mode);
        let body = Body::from(&request).stream();
        let transport = self.transport.clone();
        try_stream! {
            match request.mode {
                Mode::Chat => {
                    let mut events = std::pin::pin!(transport.stream_sse::<StreamChunk>(&endpoint, &body));
                    while let Some(chunk) = events.next().await {
                        yield chunk?;
                    }
                }
                Mode::Completion => {
                    let mut events = std::pin::pin!(transport.stream_sse::<TextResponse>(&endpoint, &body));
                    while let Some(chunk) = events.next().await {
                        yield StreamChunk::from(chunk?);
                    }
                }
            }
        }
    }
}
