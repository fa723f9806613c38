//! One-shot invocation command.

use anyhow::Result;
use clap::Args;
use gconfig::FileStore;
use model::{ClientFactory, ClientOptions};
use resolver::Resolver;
use std::io::Write;

/// Build a client for a model and send one prompt.
#[derive(Args, Debug)]
pub struct Invoke {
    /// Model name.
    pub model: String,

    /// Prompt text.
    pub prompt: String,

    /// Use the text completion endpoint instead of chat.
    #[arg(long)]
    pub completion: bool,

    /// Echo the prompt (completion only).
    #[arg(long)]
    pub echo: bool,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Generation budget.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Wait for the whole response instead of streaming tokens.
    #[arg(long)]
    pub no_stream: bool,
}

impl Invoke {
    pub async fn run(self, resolver: Resolver<FileStore>) -> Result<()> {
        let mut options = if self.completion {
            ClientOptions::completion().echo(self.echo)
        } else {
            ClientOptions::chat()
        };
        options = options.streaming(!self.no_stream).verbose(true);
        if let Some(temperature) = self.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.max_tokens(max_tokens);
        }
        if !self.no_stream {
            options = options.callback(|token: &str| {
                print!("{token}");
                let _ = std::io::stdout().flush();
            });
        }

        let factory = ClientFactory::from_installed(resolver)?;
        let client = factory.build_client(&self.model, options)?;
        tracing::debug!("invoking {:?}", client.backend());
        let response = client.invoke(&self.prompt).await?;
        if self.no_stream {
            println!("{}", response.content().unwrap_or_default());
        } else {
            println!();
        }
        Ok(())
    }
}
