//! Resolution inspection commands: address, worker, transcription, proxy.

use anyhow::{Context, Result};
use clap::Args;
use gconfig::FileStore;
use resolver::{EndpointRole, ProxyOverride, Resolver};

/// Print the address of a gateway role.
#[derive(Args, Debug)]
pub struct Address {
    /// `controller`, `model_worker` or `openai_api` (fastchat_* aliases
    /// accepted).
    pub role: EndpointRole,

    /// Model whose worker override applies (model_worker only).
    #[arg(long)]
    pub model: Option<String>,
}

impl Address {
    pub fn run(self, resolver: &Resolver<FileStore>) -> Result<()> {
        let url = resolver
            .url(self.role, self.model.as_deref())
            .with_context(|| format!("no address configured for {}", self.role))?;
        println!("{url}");
        Ok(())
    }
}

/// Print the resolved worker configuration of a model.
#[derive(Args, Debug)]
pub struct Worker {
    /// Model name; empty for the server defaults.
    #[arg(default_value = "")]
    pub name: String,
}

impl Worker {
    pub fn run(self, resolver: &Resolver<FileStore>) -> Result<()> {
        let config = resolver.worker(&self.name);
        println!("{}", serde_json::to_string_pretty(&config)?);
        Ok(())
    }
}

/// Print the resolved voice-to-text configuration of a model.
#[derive(Args, Debug)]
pub struct Transcription {
    /// Model name; empty for the server defaults.
    #[arg(default_value = "")]
    pub name: String,
}

impl Transcription {
    pub fn run(self, resolver: &Resolver<FileStore>) -> Result<()> {
        let config = resolver.transcription(&self.name);
        println!("{}", serde_json::to_string_pretty(&config)?);
        Ok(())
    }
}

/// Print the effective proxy policy.
#[derive(Args, Debug)]
pub struct Proxy {
    /// Explicit proxy applied to every scheme, as a per-entry proxy would.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Show how this URL would be routed.
    #[arg(long)]
    pub route: Option<String>,
}

impl Proxy {
    pub fn run(self, resolver: &Resolver<FileStore>) -> Result<()> {
        let policy = resolver.proxy_policy(self.proxy.map(ProxyOverride::from))?;
        if let Some(url) = self.route {
            println!("{url} -> {}", policy.route_str(&url)?);
            return Ok(());
        }
        print!("{policy}");
        println!("NO_PROXY={}", policy.no_proxy());
        Ok(())
    }
}
