//! Configured LLM clients.
//!
//! An [`LlmClient`] pairs a provider with the backend it was resolved to
//! and the per-client options. Invocations run the registered callbacks
//! and, when streaming, fold the chunks into one response.

use crate::provider::Provider;
use anyhow::Result;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use gcore::{Aggregate, Callback, Input, Message, Mode, Model, Request, Response, StreamChunk};
use std::{fmt, sync::Arc, time::Duration};

/// Per-client options.
#[derive(Clone)]
pub struct ClientOptions {
    /// Sampling temperature, provider default when unset.
    pub temperature: Option<f32>,
    /// Generation budget, provider default when unset.
    pub max_tokens: Option<u32>,
    /// Stream tokens through the callbacks.
    pub streaming: bool,
    /// Token handlers.
    pub callbacks: Vec<Arc<dyn Callback>>,
    /// Chat or text completion.
    pub mode: Mode,
    /// Echo the prompt in completion mode.
    pub echo: bool,
    /// Log every request at info level.
    pub verbose: bool,
    /// Request timeout, the network default when unset.
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            streaming: true,
            callbacks: Vec::new(),
            mode: Mode::Chat,
            echo: false,
            verbose: false,
            timeout: None,
        }
    }
}

impl ClientOptions {
    /// Chat-mode options.
    pub fn chat() -> Self {
        Self::default()
    }

    /// Completion-mode options.
    pub fn completion() -> Self {
        Self {
            mode: Mode::Completion,
            ..Self::default()
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Register a token handler.
    pub fn callback(mut self, callback: impl Callback + 'static) -> Self {
        self.callbacks.push(Arc::new(callback));
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("streaming", &self.streaming)
            .field("callbacks", &self.callbacks.len())
            .field("mode", &self.mode)
            .field("echo", &self.echo)
            .field("verbose", &self.verbose)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Kind of backend a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The gateway's OpenAI-compatible API or an online worker's base URL.
    OpenAICompatible,
    /// Azure OpenAI deployment.
    AzureOpenAI,
    /// First-party OpenAI API.
    OpenAI,
    /// Anthropic API.
    Anthropic,
}

/// Where a client was resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub kind: BackendKind,
    /// Model name sent on the wire.
    pub model: CompactString,
    /// Endpoint for the client's mode.
    pub endpoint: String,
    /// Per-entry proxy merged into the client's policy.
    pub proxy: Option<String>,
}

/// A configured LLM client.
#[derive(Clone)]
pub struct LlmClient {
    provider: Provider,
    backend: Backend,
    options: ClientOptions,
}

impl LlmClient {
    pub(crate) fn new(provider: Provider, backend: Backend, options: ClientOptions) -> Self {
        Self {
            provider,
            backend,
            options,
        }
    }

    /// The resolved backend.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn mode(&self) -> Mode {
        self.options.mode
    }

    /// Build the request this client sends for `input`.
    pub fn request(&self, input: Input) -> Request {
        Request {
            model: self.backend.model.clone(),
            mode: self.options.mode,
            input,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            echo: self.options.echo && self.options.mode == Mode::Completion,
        }
    }

    /// Send a single prompt.
    pub async fn invoke(&self, prompt: &str) -> Result<Response> {
        self.run(self.request(Input::Prompt(prompt.to_owned())))
            .await
    }

    /// Send a conversation.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<Response> {
        self.run(self.request(Input::Messages(messages))).await
    }

    /// Stream the chunks of a conversation. Callbacks are not invoked.
    pub fn stream(
        &self,
        messages: Vec<Message>,
    ) -> impl Stream<Item = Result<StreamChunk>> + Send + '_ {
        self.provider.stream(self.request(Input::Messages(messages)))
    }

    async fn run(&self, request: Request) -> Result<Response> {
        for callback in &self.options.callbacks {
            callback.on_start(&request.model);
        }
        if self.options.verbose {
            tracing::info!(
                "{:?} request to {}: {:?}",
                request.mode,
                self.backend.endpoint,
                request.input
            );
        }

        let result = if self.options.streaming {
            self.collect(request).await
        } else {
            self.provider.send(&request).await
        };

        match &result {
            Ok(response) => {
                for callback in &self.options.callbacks {
                    callback.on_end(response);
                }
            }
            Err(e) => {
                tracing::warn!("request to {} failed: {e}", self.backend.endpoint);
                for callback in &self.options.callbacks {
                    callback.on_error(e);
                }
            }
        }
        result
    }

    async fn collect(&self, request: Request) -> Result<Response> {
        let mut stream = std::pin::pin!(self.provider.stream(request));
        let mut aggregate = Aggregate::default();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(token) = chunk.content().filter(|token| !token.is_empty()) {
                for callback in &self.options.callbacks {
                    callback.on_token(token);
                }
            }
            aggregate.push(&chunk);
        }
        Ok(aggregate.finish())
    }
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("backend", &self.backend)
            .field("options", &self.options)
            .finish()
    }
}
