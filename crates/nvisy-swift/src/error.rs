//! Error types for Swift requests.

use nvisy_stream::StoreError;
use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Label prefixed to every [`StoreError`] produced by this crate.
pub(crate) const LABEL: &str = "swift";

/// Result type alias for Swift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Swift operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The server answered with an unexpected status.
    #[error("{method} {url} returned {status}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
    },

    /// A required response header was absent or malformed.
    #[error("missing or invalid '{0}' header")]
    Header(&'static str),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Returns the response status, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Reqwest(e) => e.status(),
            Self::Header(_) | Self::Url(_) => None,
        }
    }
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        match err.status() {
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                StoreError::unauthorized(&err, LABEL).with_source(err)
            }
            Some(StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED) => {
                StoreError::conflict(&err, LABEL).with_source(err)
            }
            Some(status) if status.is_client_error() => StoreError::transport(&err, LABEL)
                .with_retryable(status == StatusCode::TOO_MANY_REQUESTS)
                .with_source(err),
            _ => {
                let retryable = matches!(err, Error::Reqwest(_) | Error::Status { .. });
                StoreError::transport(&err, LABEL)
                    .with_retryable(retryable)
                    .with_source(err)
            }
        }
    }
}
