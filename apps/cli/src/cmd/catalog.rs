//! Catalog commands: models, validate.

use anyhow::Result;
use clap::Args;
use gconfig::{FileStore, GatewayDocument};
use resolver::Resolver;
use std::path::Path;

/// List configured models.
#[derive(Args, Debug)]
pub struct Models {
    /// List embedding models instead of LLMs.
    #[arg(long)]
    pub embed: bool,
}

impl Models {
    pub fn run(self, resolver: &Resolver<FileStore>) -> Result<()> {
        let doc = resolver.document();
        if self.embed {
            print_names("embedding", &doc.list_embed_models());
            print_names("online", &doc.list_online_embed_models());
            return Ok(());
        }

        let listing = doc.list_llm_models();
        print_names("local", &listing.local);
        print_names("online", &listing.online);
        print_names("worker", &listing.worker);
        let native: Vec<_> = doc.models.native.keys().cloned().collect();
        print_names("native", &native);
        Ok(())
    }
}

fn print_names(label: &str, names: &[impl AsRef<str>]) {
    if names.is_empty() {
        println!("{label}: (none)");
        return;
    }
    println!("{label}:");
    for name in names {
        println!("  {}", name.as_ref());
    }
}

/// Validate the gateway document.
#[derive(Args, Debug)]
pub struct Validate;

impl Validate {
    pub fn run(self, path: &Path) -> Result<()> {
        GatewayDocument::load(path)?.validate()?;
        println!("{} is valid", path.display());
        Ok(())
    }
}
