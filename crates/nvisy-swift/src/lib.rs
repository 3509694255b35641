#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for authentication and client setup.
pub const TRACING_TARGET_CLIENT: &str = "nvisy_swift::client";

/// Tracing target for container and object requests.
pub const TRACING_TARGET_OBJECT: &str = "nvisy_swift::object";

mod client;
mod config;
mod error;
mod metadata;
mod session;

pub use client::SwiftSessionFactory;
pub use config::{DEFAULT_TIMEOUT_SECS, SwiftConfig};
pub use error::{Error, Result};
pub use session::{SwiftContainer, SwiftSession};
