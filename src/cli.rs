//! CLI definitions for cdpconsole.

use std::path::PathBuf;

use clap::Parser;

use cdpconsole_config::SessionConfig;

/// Stream console output of a Chrome DevTools Protocol target.
#[derive(Parser, Debug)]
#[command(name = "cdpconsole")]
#[command(about = "Stream console output from a Chrome DevTools Protocol target")]
#[command(version)]
pub(crate) struct Cli {
    /// WebSocket debugger URL, e.g. ws://127.0.0.1:9222/devtools/page/<id>
    pub url: String,

    /// Configuration file path [default: ~/.cdpconsole/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Property-fetch depth for object arguments
    #[arg(long)]
    pub depth: Option<u32>,

    /// Timeout of each property fetch, in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub fetch_timeout_ms: Option<u64>,

    /// WebSocket connect timeout, in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout_secs: Option<u64>,
}

impl Cli {
    /// Apply command-line overrides on top of the configured values.
    pub fn apply_overrides(&self, session: &mut SessionConfig) {
        if let Some(depth) = self.depth {
            session.max_depth = depth;
        }
        if let Some(ms) = self.fetch_timeout_ms {
            session.fetch_timeout_ms = ms;
        }
        if let Some(secs) = self.connect_timeout_secs {
            session.connect_timeout_secs = secs;
        }
    }
}
