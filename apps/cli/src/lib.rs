//! llmgate CLI: inspect how the gateway document resolves into addresses,
//! worker configurations, proxy policies and clients.

pub use cmd::{Cli, Command};

pub mod cmd;
