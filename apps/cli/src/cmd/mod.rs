//! CLI argument parsing and subcommand dispatch.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gconfig::FileStore;
use resolver::Resolver;
use std::path::PathBuf;

pub use catalog::{Models, Validate};
pub use init::Init;
pub use invoke::Invoke;
pub use resolve::{Address, Proxy, Transcription, Worker};

mod catalog;
mod init;
mod invoke;
mod resolve;

/// Backend resolution for the llmgate LLM gateway.
#[derive(Parser, Debug)]
#[command(name = "llmgate", about = "Backend resolution for the llmgate LLM gateway")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Gateway document (defaults to the platform config dir).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter gateway document.
    Init(Init),
    /// Print the address of a gateway role.
    Address(Address),
    /// Print the resolved worker configuration of a model.
    Worker(Worker),
    /// Print the resolved voice-to-text configuration of a model.
    Transcription(Transcription),
    /// Print the effective proxy policy.
    Proxy(Proxy),
    /// List configured models.
    Models(Models),
    /// Validate the gateway document.
    Validate(Validate),
    /// Build a client for a model and send one prompt.
    Invoke(Invoke),
}

impl Cli {
    /// Run the selected subcommand.
    pub async fn run(self) -> Result<()> {
        let path = self.config_path()?;
        match self.command {
            Command::Init(cmd) => cmd.run(&path),
            Command::Validate(cmd) => cmd.run(&path),
            Command::Address(cmd) => cmd.run(&open(&path)?),
            Command::Worker(cmd) => cmd.run(&open(&path)?),
            Command::Transcription(cmd) => cmd.run(&open(&path)?),
            Command::Proxy(cmd) => cmd.run(&open(&path)?),
            Command::Models(cmd) => cmd.run(&open(&path)?),
            Command::Invoke(cmd) => cmd.run(open(&path)?).await,
        }
    }

    /// The `--config` path or the default document location.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => gconfig::default_config_path().context("no config directory on this platform"),
        }
    }
}

/// Open the document at `path` as a resolver.
fn open(path: &std::path::Path) -> Result<Resolver<FileStore>> {
    let store = FileStore::open(path)
        .with_context(|| format!("run `llmgate init` to create {}", path.display()))?;
    Ok(Resolver::new(store))
}
