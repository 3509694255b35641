#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;

use std::io;
use std::process;

use anyhow::Context;
use nvisy_stream::memory::MemoryStore;
use nvisy_stream::prelude::*;
use nvisy_swift::SwiftSessionFactory;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "nvisy_cli::startup";
pub const TRACING_TARGET_COMMAND: &str = "nvisy_cli::command";
pub const TRACING_TARGET_CONFIG: &str = "nvisy_cli::config";

/// Token and endpoint used for dry runs against the in-memory store.
const MEMORY_TOKEN: &str = "memory";
const MEMORY_ENDPOINT: &str = "memory://local/";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMMAND,
            error = %error,
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    Cli::init_tracing();
    cli.log();

    let locator = Locator::parse(cli.command.locator()).context("invalid locator")?;
    let context = if cli.memory {
        memory_context(&locator)
    } else {
        let factory = SwiftSessionFactory::new(cli.swift.clone())
            .context("failed to create Swift client")?;
        // clap has already layered the environment under the flags
        StreamContext::new(factory, ConfigResolver::without_defaults())
    };

    cli.command
        .execute(&context, &locator, &cli.stream, io::stdin().lock(), io::stdout().lock())
        .await
}

/// Builds a context over a fresh in-memory store holding the locator's
/// container, so dry runs do not need a reachable endpoint.
fn memory_context(locator: &Locator) -> StreamContext {
    let store = MemoryStore::new().with_container(locator.container(), Visibility::Private);
    let defaults = StreamConfig::new()
        .with_token(MEMORY_TOKEN)
        .with_endpoint(MEMORY_ENDPOINT);
    StreamContext::new(store, ConfigResolver::new(StaticConfig(defaults)))
}
