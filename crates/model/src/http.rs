//! Shared HTTP transport for every provider.
//!
//! `Transport` wraps a `reqwest::Client` with pre-built headers. Providers
//! choose the endpoint per request, since chat and completion calls go to
//! different paths.

use anyhow::{Result, bail};
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{
    Client, Method,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};

/// HTTP client plus the headers every request carries.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    headers: HeaderMap,
}

impl Transport {
    /// Transport with JSON headers and no authentication.
    pub fn new(client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self { client, headers }
    }

    /// Transport authenticating with a Bearer token.
    pub fn bearer(client: Client, key: &str) -> Result<Self> {
        let mut transport = Self::new(client);
        transport.insert(header::AUTHORIZATION.as_str(), &format!("Bearer {key}"))?;
        Ok(transport)
    }

    /// Add a header to every request.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<()> {
        self.headers
            .insert(name.parse::<HeaderName>()?, value.parse::<HeaderValue>()?);
        Ok(())
    }

    /// The headers every request carries.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// POST `body` and deserialize the JSON response.
    pub async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T> {
        tracing::trace!("request to {endpoint}: {}", serde_json::to_string(body)?);
        let response = self
            .client
            .request(Method::POST, endpoint)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::trace!("response: {text}");
        if !status.is_success() {
            bail!("{endpoint} returned {status}: {text}");
        }
        serde_json::from_str(&text).map_err(Into::into)
    }

    /// POST `body` and stream the Server-Sent Events payloads.
    ///
    /// Each `data:` payload is deserialized as `T`. The `[DONE]` sentinel
    /// ends nothing by itself and is skipped; payloads that fail to parse
    /// are logged and skipped.
    pub fn stream_sse<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        body: &(impl Serialize + Sync),
    ) -> impl Stream<Item = Result<T>> + Send {
        if let Ok(body) = serde_json::to_string(body) {
            tracing::trace!("request to {endpoint}: {body}");
        }
        let endpoint = endpoint.to_owned();
        let request = self
            .client
            .request(Method::POST, &endpoint)
            .headers(self.headers.clone())
            .json(body);

        try_stream! {
            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                let mut bytes = response.bytes_stream();
                let mut buf = SseBuffer::default();
                while let Some(next) = bytes.next().await {
                    for block in buf.push(&next?) {
                        if let Some(event) = parse_block::<T>(&block) {
                            yield event;
                        }
                    }
                }
                if let Some(event) = parse_block::<T>(&buf.finish()) {
                    yield event;
                }
            } else {
                let text = response.text().await.unwrap_or_default();
                Err::<(), _>(anyhow::anyhow!("{endpoint} returned {status}: {text}"))?;
            }
        }
    }
}

/// Raw SSE body bytes, cut into blocks at blank lines.
///
/// Bytes are decoded only once a block is complete, so a character split
/// across network chunks arrives intact.
#[derive(Default)]
struct SseBuffer {
    buf: Vec<u8>,
}

impl SseBuffer {
    /// Append `bytes` and take every block they complete.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut blocks = Vec::new();
        while let Some((line_end, sep)) = blank_line(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..line_end + sep).collect();
            blocks.push(String::from_utf8_lossy(&block[..=line_end]).into_owned());
        }
        blocks
    }

    /// Whatever trails the last blank line.
    fn finish(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

/// Position of the first `\n` followed by an empty line, and the length of
/// the separator starting there.
fn blank_line(buf: &[u8]) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(pos) = buf[from..].iter().position(|&b| b == b'\n') {
        let at = from + pos;
        match buf.get(at + 1) {
            Some(b'\n') => return Some((at, 2)),
            Some(b'\r') if buf.get(at + 2) == Some(&b'\n') => return Some((at, 3)),
            _ => from = at + 1,
        }
    }
    None
}

/// Parse one SSE block, joining multi-line `data:` fields.
fn parse_block<T: DeserializeOwned>(block: &str) -> Option<T> {
    let data = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|d| d.strip_prefix(' ').unwrap_or(d))
        .collect::<Vec<_>>()
        .join("\n");
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    tracing::trace!("event: {data}");
    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("failed to parse event: {e}, data: {data}");
            None
        }
    }
}
