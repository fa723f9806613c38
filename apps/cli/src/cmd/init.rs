//! Starter document command.

use anyhow::{Result, bail};
use clap::Args;
use gconfig::GatewayDocument;
use std::path::Path;

/// Write a starter gateway document.
#[derive(Args, Debug)]
pub struct Init {
    /// Overwrite an existing document.
    #[arg(long)]
    pub force: bool,
}

impl Init {
    pub fn run(self, path: &Path) -> Result<()> {
        if path.exists() && !self.force {
            bail!("{} already exists, pass --force to overwrite", path.display());
        }
        GatewayDocument::write_scaffold(path)?;
        println!("Wrote {}", path.display());
        Ok(())
    }
}
