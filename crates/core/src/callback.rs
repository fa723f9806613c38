//! Token-level callbacks for streaming invocations.

use crate::Response;

/// Receives events while a client invocation is in flight.
///
/// Handlers are shared across tasks, so implementations must be
/// `Send + Sync`. Every method except `on_token` has an empty default.
pub trait Callback: Send + Sync {
    /// Called once before the request is sent.
    fn on_start(&self, _model: &str) {}

    /// Called for every non-empty content delta.
    fn on_token(&self, token: &str);

    /// Called once with the final (aggregated) response.
    fn on_end(&self, _response: &Response) {}

    /// Called when the invocation fails.
    fn on_error(&self, _error: &anyhow::Error) {}
}

impl<F> Callback for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_token(&self, token: &str) {
        self(token)
    }
}
