//! Client construction from resolved backend configuration.
//!
//! Names matching a native provider (`Azure-OpenAI`, `OpenAI`,
//! `Anthropic`) are built from `ModelConfig.NativeModel.<name>` without
//! consulting the worker resolver. Every other name resolves through the
//! worker configuration and talks the OpenAI protocol, to the online
//! entry's base URL or the gateway's OpenAI-compatible API.

use crate::{
    claude::Claude,
    client::{Backend, BackendKind, ClientOptions, LlmClient},
    openai::{self, OpenAI},
    provider::Provider,
};
use anyhow::{Context, Result, bail};
use gconfig::{ConfigStore, NativeProvider};
use reqwest::Client;
use resolver::{
    DeviceProbe, EndpointRole, NetworkDefaults, ProxyOverride, Resolver, SystemProbe, address,
    proxy, worker,
};
use std::time::Duration;

/// Key sent to backends that do not check one.
pub const PLACEHOLDER_KEY: &str = "EMPTY";

/// Model used by the OpenAI native provider when the entry names none.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Model used by the Anthropic native provider when the entry names none.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

/// Builds [`LlmClient`]s for model names.
///
/// Construction never performs network I/O. Clients share one HTTP client
/// unless their entry carries its own proxy or the options ask for a
/// different timeout.
#[derive(Clone)]
pub struct ClientFactory<S, P = SystemProbe> {
    resolver: Resolver<S, P>,
    network: NetworkDefaults,
    client: Client,
}

impl<S: ConfigStore> ClientFactory<S> {
    /// Factory over the process-wide network defaults, or defaults derived
    /// from the environment and the document when none are installed.
    pub fn from_installed(resolver: Resolver<S>) -> Result<Self> {
        let network = match proxy::installed() {
            Some(defaults) => defaults.clone(),
            None => resolver.network_defaults(None)?,
        };
        Self::new(resolver, network)
    }
}

impl<S: ConfigStore, P: DeviceProbe> ClientFactory<S, P> {
    /// Factory with explicit network defaults.
    pub fn new(resolver: Resolver<S, P>, network: NetworkDefaults) -> Result<Self> {
        let client = network.client()?;
        Ok(Self {
            resolver,
            network,
            client,
        })
    }

    pub fn resolver(&self) -> &Resolver<S, P> {
        &self.resolver
    }

    pub fn network(&self) -> &NetworkDefaults {
        &self.network
    }

    /// Build a client for `name`.
    pub fn build_client(&self, name: &str, options: ClientOptions) -> Result<LlmClient> {
        match NativeProvider::from_model_name(name) {
            Some(provider) => self.native(provider, options),
            None => self.worker(name, options),
        }
    }

    fn native(&self, provider: NativeProvider, options: ClientOptions) -> Result<LlmClient> {
        let doc = self.resolver.document();
        let Some(entry) = doc.models.native.get(provider.model_name()) else {
            bail!("{provider} is not configured, add ModelConfig.NativeModel.{provider}");
        };
        let missing = provider.missing_fields(entry);
        if !missing.is_empty() {
            bail!("{provider} is missing {}", missing.join(", "));
        }

        let proxy = present(&entry.api_proxy);
        let client = self.http_client(proxy, options.timeout)?;
        let key = present(&entry.api_key).unwrap_or_default();
        let (kind, model, provider) = match provider {
            NativeProvider::AzureOpenAI => {
                let deployment = required(&entry.deployment_name)?;
                let model = present(&entry.model_name).unwrap_or(deployment);
                let azure = OpenAI::azure(
                    client,
                    key,
                    required(&entry.api_base_url)?,
                    deployment,
                    required(&entry.api_version)?,
                )?;
                (BackendKind::AzureOpenAI, model, Provider::OpenAI(azure))
            }
            NativeProvider::OpenAI => {
                let base = present(&entry.api_base_url).unwrap_or(openai::API_BASE);
                let model = present(&entry.model_name).unwrap_or(DEFAULT_OPENAI_MODEL);
                let openai = OpenAI::compatible(client, key, base)?;
                (BackendKind::OpenAI, model, Provider::OpenAI(openai))
            }
            NativeProvider::Anthropic => {
                let model = present(&entry.model_name).unwrap_or(DEFAULT_ANTHROPIC_MODEL);
                let claude = match present(&entry.api_base_url) {
                    Some(base) => Claude::custom(client, key, base)?,
                    None => Claude::anthropic(client, key)?,
                };
                (BackendKind::Anthropic, model, Provider::Claude(claude))
            }
        };

        tracing::debug!("built {kind:?} client for native model {model}");
        Ok(self.finish(kind, model, proxy, provider, options))
    }

    fn worker(&self, name: &str, options: ClientOptions) -> Result<LlmClient> {
        // Worker entry and gateway address come from the same document.
        let doc = self.resolver.document();
        let config = worker::resolve_worker(&doc, name, self.resolver.probe());
        let online = config.online();
        let base = match online.and_then(|online| present(&online.api_base_url)) {
            Some(base) => base.to_owned(),
            None => address::url(&doc, EndpointRole::OpenAIApi, None)
                .context("no OpenAI-compatible API address is configured")?,
        };
        let key = online
            .and_then(|online| present(&online.api_key))
            .unwrap_or(PLACEHOLDER_KEY);
        let proxy = online.and_then(|online| present(&online.proxy));

        let client = self.http_client(proxy, options.timeout)?;
        let provider = Provider::OpenAI(OpenAI::compatible(client, key, &base)?);
        tracing::debug!("built client for {name} at {base}");
        Ok(self.finish(BackendKind::OpenAICompatible, name, proxy, provider, options))
    }

    fn finish(
        &self,
        kind: BackendKind,
        model: &str,
        proxy: Option<&str>,
        provider: Provider,
        options: ClientOptions,
    ) -> LlmClient {
        let backend = Backend {
            kind,
            model: model.into(),
            endpoint: provider.endpoint(options.mode),
            proxy: proxy.map(ToOwned::to_owned),
        };
        LlmClient::new(provider, backend, options)
    }

    /// The shared client, or a dedicated one for a per-entry proxy or a
    /// non-default timeout.
    fn http_client(&self, proxy: Option<&str>, timeout: Option<Duration>) -> Result<Client> {
        if proxy.is_none() && timeout.is_none_or(|timeout| timeout == self.network.timeout) {
            return Ok(self.client.clone());
        }
        let mut network = match proxy {
            Some(proxy) => self.network.with_override(&ProxyOverride::from(proxy))?,
            None => self.network.clone(),
        };
        if let Some(timeout) = timeout {
            network.timeout = timeout;
        }
        network.client()
    }
}

/// A non-blank setting.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// A setting `missing_fields` already checked.
fn required(value: &Option<String>) -> Result<&str> {
    present(value).context("required native setting is empty")
}
