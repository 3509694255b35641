//! Stream and collaborator error types.

use std::fmt;

use strum::{AsRefStr, IntoStaticStr};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for stream operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Result type for collaborator (session, container) operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Categories of [`Error`], used as a structured logging field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Container or object segment is empty.
    MissingResourceIdentifier,
    /// Locator could not be parsed.
    InvalidLocator,
    /// Credentials are missing or were rejected.
    Authentication,
    /// Required object or container does not exist.
    ResourceNotFound,
    /// Exclusive create against an existing object.
    ResourceConflict,
    /// Any other remote failure.
    Transport,
    /// Local buffer misuse (read/write/seek outside the open mode).
    Buffer,
    /// Operation intentionally left unimplemented.
    Unsupported,
}

/// Errors produced by stream sessions and the resolution steps leading to them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The locator names no container or no object.
    #[error("missing container or object in '{locator}'")]
    MissingResourceIdentifier { locator: String },

    /// The locator is not a `scheme://container/object` URL.
    #[error("invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// No sufficient credential combination, or the remote rejected it.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The object (or its container) does not exist and may not be created.
    #[error("object '{object}' not found in container '{container}'")]
    ResourceNotFound { container: String, object: String },

    /// Exclusive create against an object that already exists.
    #[error("object '{object}' already exists in container '{container}'")]
    ResourceConflict { container: String, object: String },

    /// Remote failure reported by the collaborator.
    #[error("transport error: {0}")]
    Transport(#[source] StoreError),

    /// The stream was opened without read access.
    #[error("stream is not readable")]
    NotReadable,

    /// The stream was opened without write access.
    #[error("stream is not writable")]
    NotWritable,

    /// Seek would move the cursor before the start of the buffer.
    #[error("invalid seek to offset {offset}")]
    InvalidSeek { offset: i128 },

    /// Part of the file-style surface that is intentionally not implemented.
    #[error("operation '{operation}' is not supported")]
    Unsupported { operation: &'static str },
}

impl Error {
    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(container: impl Into<String>, object: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            container: container.into(),
            object: object.into(),
        }
    }

    /// Creates a new conflict error.
    pub fn conflict(container: impl Into<String>, object: impl Into<String>) -> Self {
        Self::ResourceConflict {
            container: container.into(),
            object: object.into(),
        }
    }

    /// Creates a new invalid locator error.
    pub fn invalid_locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingResourceIdentifier { .. } => ErrorKind::MissingResourceIdentifier,
            Self::InvalidLocator { .. } => ErrorKind::InvalidLocator,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            Self::ResourceConflict { .. } => ErrorKind::ResourceConflict,
            Self::Transport(_) => ErrorKind::Transport,
            Self::NotReadable | Self::NotWritable | Self::InvalidSeek { .. } => ErrorKind::Buffer,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind().into()
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err.kind() {
            StoreErrorKind::Unauthorized => Self::Authentication {
                message: err.to_string(),
            },
            _ => Self::Transport(err),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind as IoKind;

        let kind = match err.kind() {
            ErrorKind::ResourceNotFound => IoKind::NotFound,
            ErrorKind::ResourceConflict => IoKind::AlreadyExists,
            ErrorKind::Authentication => IoKind::PermissionDenied,
            ErrorKind::MissingResourceIdentifier | ErrorKind::InvalidLocator => {
                IoKind::InvalidInput
            }
            ErrorKind::Buffer => IoKind::InvalidInput,
            ErrorKind::Unsupported => IoKind::Unsupported,
            ErrorKind::Transport => IoKind::Other,
        };
        Self::new(kind, err)
    }
}

/// Failure category reported by a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    /// Credentials were rejected or the session expired.
    Unauthorized,
    /// The remote refused a conditional write.
    Conflict,
    /// Connection, protocol or server failure.
    Transport,
}

/// A lightweight collaborator error carrying a message, an optional source,
/// and a retryable flag.
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
    source: Option<BoxedError>,
    retryable: bool,
}

impl StoreError {
    /// Creates an error formatted as `[{label}] {msg}`.
    pub fn new(kind: StoreErrorKind, msg: impl fmt::Display, label: &str) -> Self {
        Self {
            kind,
            message: format!("[{label}] {msg}"),
            source: None,
            retryable: matches!(kind, StoreErrorKind::Transport),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(msg: impl fmt::Display, label: &str) -> Self {
        Self::new(StoreErrorKind::Unauthorized, msg, label)
    }

    /// Creates a transport error.
    pub fn transport(msg: impl fmt::Display, label: &str) -> Self {
        Self::new(StoreErrorKind::Transport, msg, label)
    }

    /// Creates a conflict error.
    pub fn conflict(msg: impl fmt::Display, label: &str) -> Self {
        Self::new(StoreErrorKind::Conflict, msg, label)
    }

    /// Attaches a source error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Overrides the retryable flag.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Returns the failure category.
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// Whether the caller could retry this operation.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("retryable", &self.retryable)
            .field("source", &self.source)
            .finish()
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_authentication() {
        let err: Error = StoreError::unauthorized("token expired", "swift").into();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.to_string().contains("token expired"));
    }

    #[test]
    fn transport_keeps_store_error() {
        let err: Error = StoreError::transport("connection reset", "swift").into();
        assert_eq!(err.kind_str(), "transport");
        let Error::Transport(inner) = err else {
            panic!("expected transport error");
        };
        assert!(inner.is_retryable());
        assert_eq!(inner.to_string(), "[swift] connection reset");
    }

    #[test]
    fn conflict_is_not_retryable() {
        let err = StoreError::conflict("precondition failed", "swift");
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), StoreErrorKind::Conflict);
    }

    #[test]
    fn io_error_conversion() {
        let io: std::io::Error = Error::not_found("docs", "a.txt").into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
