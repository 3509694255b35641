//! Subcommands and their execution against a [`StreamContext`].

use std::io::{self, Read, Write};

use anyhow::{Context, bail};
use clap::Subcommand;
use nvisy_stream::prelude::*;

use crate::TRACING_TARGET_COMMAND;

/// Operations on a single object.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print an object's content to stdout.
    Cat {
        /// Object locator, e.g. `swift://container/path/to/object`.
        locator: String,
    },
    /// Replace an object's content with stdin, creating it if needed.
    Put {
        /// Object locator.
        locator: String,
    },
    /// Append stdin to an object, creating it if needed.
    Append {
        /// Object locator.
        locator: String,
    },
    /// Print an object's metadata as JSON without fetching its content.
    Stat {
        /// Object locator.
        locator: String,
    },
    /// Delete an object.
    Rm {
        /// Object locator.
        locator: String,
    },
}

impl Command {
    /// Returns the locator argument.
    pub fn locator(&self) -> &str {
        match self {
            Self::Cat { locator }
            | Self::Put { locator }
            | Self::Append { locator }
            | Self::Stat { locator }
            | Self::Rm { locator } => locator,
        }
    }

    /// Returns the subcommand name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cat { .. } => "cat",
            Self::Put { .. } => "put",
            Self::Append { .. } => "append",
            Self::Stat { .. } => "stat",
            Self::Rm { .. } => "rm",
        }
    }

    /// Runs the command, reading content from `input` and printing to `output`.
    pub async fn execute(
        &self,
        context: &StreamContext,
        locator: &Locator,
        config: &StreamConfig,
        mut input: impl Read,
        mut output: impl Write,
    ) -> anyhow::Result<()> {
        tracing::debug!(
            target: TRACING_TARGET_COMMAND,
            command = self.name(),
            locator = %locator,
            "Executing command"
        );

        match self {
            Self::Cat { .. } => {
                let mut stream = context
                    .open(locator, OpenMode::Read, config)
                    .await
                    .with_context(|| format!("failed to open {locator}"))?;
                let copied = io::copy(&mut stream, &mut output)?;
                output.flush()?;
                stream.close().await?;

                tracing::debug!(target: TRACING_TARGET_COMMAND, bytes = copied, "Content printed");
            }
            Self::Put { .. } | Self::Append { .. } => {
                let mut content = Vec::new();
                input
                    .read_to_end(&mut content)
                    .context("failed to read stdin")?;

                let mode = match self {
                    Self::Append { .. } => OpenMode::Append,
                    _ => OpenMode::Write,
                };
                let mut stream = context
                    .open(locator, mode, config)
                    .await
                    .with_context(|| format!("failed to open {locator}"))?;
                stream.write(&content)?;
                stream
                    .close()
                    .await
                    .with_context(|| format!("failed to save {locator}"))?;

                tracing::info!(
                    target: TRACING_TARGET_COMMAND,
                    locator = %locator,
                    bytes = content.len(),
                    "Object written"
                );
            }
            Self::Stat { .. } => {
                let Some(stat) = context.stat(locator, config).await? else {
                    bail!("{locator}: no such object");
                };
                serde_json::to_writer_pretty(&mut output, &stat)?;
                writeln!(output)?;
            }
            Self::Rm { .. } => {
                context
                    .unlink(locator, config)
                    .await
                    .with_context(|| format!("failed to remove {locator}"))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nvisy_stream::memory::MemoryStore;

    use super::*;

    const LOCATOR: &str = "swift://docs/notes.txt";

    fn setup() -> (MemoryStore, StreamContext, Locator, StreamConfig) {
        let store = MemoryStore::new().with_container("docs", Visibility::Public);
        let context = StreamContext::new(store.clone(), ConfigResolver::without_defaults());
        let config = StreamConfig::new()
            .with_token("token")
            .with_endpoint("memory://local/");
        (store, context, Locator::parse(LOCATOR).unwrap(), config)
    }

    fn command(name: &str) -> Command {
        let locator = LOCATOR.to_owned();
        match name {
            "cat" => Command::Cat { locator },
            "put" => Command::Put { locator },
            "append" => Command::Append { locator },
            "stat" => Command::Stat { locator },
            _ => Command::Rm { locator },
        }
    }

    async fn run(
        context: &StreamContext,
        locator: &Locator,
        config: &StreamConfig,
        name: &str,
        input: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        let mut output = Vec::new();
        command(name)
            .execute(context, locator, config, input, &mut output)
            .await?;
        Ok(output)
    }

    #[tokio::test]
    async fn put_append_cat_rm() {
        let (store, context, locator, config) = setup();

        run(&context, &locator, &config, "put", b"hello").await.unwrap();
        run(&context, &locator, &config, "append", b" world").await.unwrap();
        let printed = run(&context, &locator, &config, "cat", b"").await.unwrap();
        assert_eq!(printed, b"hello world");

        run(&context, &locator, &config, "rm", b"").await.unwrap();
        assert!(store.get("docs", "notes.txt").is_none());
        assert!(run(&context, &locator, &config, "cat", b"").await.is_err());
    }

    #[tokio::test]
    async fn stat_prints_json() {
        let (store, context, locator, config) = setup();
        store.insert("docs", "notes.txt", "12345");

        let printed = run(&context, &locator, &config, "stat", b"").await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&printed).unwrap();
        assert_eq!(json["size"], 5);
        assert_eq!(json["mode"], 0o100_644);
        assert_eq!(store.calls().fetches, 0);
    }

    #[tokio::test]
    async fn stat_of_missing_object_fails() {
        let (_store, context, locator, config) = setup();
        let err = run(&context, &locator, &config, "stat", b"").await.unwrap_err();
        assert!(err.to_string().contains("no such object"));
    }
}
