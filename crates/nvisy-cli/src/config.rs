//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── stream: StreamConfig   # Token, endpoint, account, key
//! ├── swift: SwiftConfig     # HTTP timeout, user agent
//! ├── memory: bool           # Dry run against an in-memory store
//! └── command: Command       # cat | put | append | stat | rm
//! ```
//!
//! Credentials can be provided via CLI arguments or environment variables.
//!
//! # Example
//!
//! ```bash
//! NVISY_STREAM_TOKEN=... NVISY_STREAM_ENDPOINT=https://swift/v1/AUTH_x \
//!     nvisy cat swift://docs/readme.txt
//!
//! echo hello | nvisy --memory put swift://docs/hello.txt
//! ```

use std::process;

use clap::Parser;
use nvisy_stream::config::StreamConfig;
use nvisy_swift::SwiftConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::command::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "nvisy")]
#[command(about = "File-style access to container/object storage")]
#[command(version)]
pub struct Cli {
    /// Session credentials.
    #[clap(flatten)]
    pub stream: StreamConfig,

    /// Swift HTTP client configuration.
    #[clap(flatten)]
    pub swift: SwiftConfig,

    /// Run against a throwaway in-memory store instead of a remote endpoint.
    #[arg(long, global = true)]
    pub memory: bool,

    /// Operation to perform.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    ///
    /// Logs go to stderr so that object content on stdout stays clean.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            stream = ?self.stream,
            swift_timeout_secs = self.swift.timeout,
            memory = self.memory,
            command = self.command.name(),
            "Configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_subcommand() {
        let cli = Cli::try_parse_from([
            "nvisy",
            "--token",
            "t",
            "--endpoint",
            "https://swift.example.com/v1/AUTH_test",
            "cat",
            "swift://docs/a.txt",
        ])
        .unwrap();

        assert_eq!(cli.stream.token.as_deref(), Some("t"));
        assert!(!cli.memory);
        assert_eq!(cli.command.locator(), "swift://docs/a.txt");
        assert_eq!(cli.command.name(), "cat");
    }

    #[test]
    fn memory_flag_is_global() {
        let cli = Cli::try_parse_from(["nvisy", "rm", "swift://docs/a.txt", "--memory"]).unwrap();
        assert!(cli.memory);
        assert_eq!(cli.command.name(), "rm");
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["nvisy"]).is_err());
    }
}
