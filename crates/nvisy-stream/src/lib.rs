#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for stream sessions.
///
/// Use this target for logging open, synchronization, close and remote
/// metadata operations.
pub const TRACING_TARGET_STREAM: &str = "nvisy_stream::stream";

/// Tracing target for credential resolution.
pub const TRACING_TARGET_CONFIG: &str = "nvisy_stream::config";

/// Tracing target for the non-failing boundary surface.
///
/// Every failure swallowed by [`StreamWrapper`] is reported here.
pub const TRACING_TARGET_WRAPPER: &str = "nvisy_stream::wrapper";

mod buffer;
pub mod config;
mod error;
pub mod locator;
pub mod memory;
pub mod mode;
pub mod stat;
pub mod store;
mod stream;
mod wrapper;

pub use buffer::{Buffer, MAX_WRITE_GAP};
pub use error::{Error, ErrorKind, Result, StoreError, StoreErrorKind, StoreResult};
pub use stream::{ObjectStream, StreamContext, StreamOption, StreamOptions};
pub use wrapper::{DEFAULT_SCHEME, StreamWrapper};

#[doc(hidden)]
pub mod prelude;
