//! HTTP clients that follow a [`ProxyPolicy`].

use crate::proxy::ProxyPolicy;
use anyhow::{Context, Result};
use reqwest::{Client, Proxy};
use std::time::Duration;

/// Build a client that routes every request by `policy`.
///
/// System proxy detection is disabled; the policy is the only source of
/// proxies. `timeout` bounds connecting and each read, not the whole
/// request, so long streams are not cut off.
pub fn client(policy: &ProxyPolicy, timeout: Duration) -> Result<Client> {
    let builder = Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout);
    let builder = if policy.has_proxies() {
        let policy = policy.clone();
        builder.proxy(Proxy::custom(move |url| {
            policy.route(url).proxy_url().cloned()
        }))
    } else {
        builder.no_proxy()
    };
    builder.build().context("failed to build HTTP client")
}
