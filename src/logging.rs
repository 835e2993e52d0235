//! Diagnostic logging for the command-line tools.
//!
//! Logs go to stderr so that stdout carries nothing but oracle output.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a stderr subscriber. `RUST_LOG` takes precedence; otherwise
/// each `-v` raises the level from `warn` through `info` and `debug` to
/// `trace`.
pub fn init(verbosity: u8) -> Result<()> {
  let level = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

  fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init()
    .map_err(|err| anyhow::anyhow!(err))
    .context("failed to install tracing subscriber")
}
