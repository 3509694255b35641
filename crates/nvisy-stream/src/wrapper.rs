//! Non-failing file-style surface over [`StreamContext`].
//!
//! Hosts that speak in booleans and optional values (file-handle tables,
//! scheme registries) call these methods instead of the `Result`-returning
//! core. Every failure is logged here and converted into the host's "false"
//! or "none" signal.

use std::io::SeekFrom;

use bytes::Bytes;

use crate::TRACING_TARGET_WRAPPER;
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::stat::Stat;
use crate::stream::{ObjectStream, StreamContext};

/// Scheme registered when none is given.
pub const DEFAULT_SCHEME: &str = "swift";

/// Scheme-bound boundary over a [`StreamContext`].
#[derive(Debug, Clone)]
pub struct StreamWrapper {
    scheme: String,
    context: StreamContext,
}

impl StreamWrapper {
    /// Creates a wrapper for [`DEFAULT_SCHEME`].
    pub fn new(context: StreamContext) -> Self {
        Self::with_scheme(DEFAULT_SCHEME, context)
    }

    /// Creates a wrapper for a custom scheme.
    pub fn with_scheme(scheme: impl Into<String>, context: StreamContext) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            context,
        }
    }

    /// Returns the registered scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the wrapped context.
    pub fn context(&self) -> &StreamContext {
        &self.context
    }

    /// Parses a locator, rejecting other schemes.
    pub fn parse(&self, locator: &str) -> Result<Locator> {
        let parsed = Locator::parse(locator)?;
        if parsed.scheme() != self.scheme {
            return Err(Error::invalid_locator(
                locator,
                format!("expected scheme '{}'", self.scheme),
            ));
        }
        Ok(parsed)
    }

    /// Opens a stream, or returns `None` after logging why it could not.
    pub async fn stream_open(
        &self,
        locator: &str,
        mode: &str,
        config: &StreamConfig,
    ) -> Option<ObjectStream> {
        let result = async {
            let parsed = self.parse(locator)?;
            self.context.open(&parsed, mode, config).await
        }
        .await;
        report("stream_open", locator, result)
    }

    /// Reads up to `len` bytes. Empty on failure or at end of content.
    pub fn stream_read(&self, stream: &mut ObjectStream, len: usize) -> Bytes {
        let locator = stream.locator().to_string();
        report("stream_read", &locator, stream.read(len)).unwrap_or_default()
    }

    /// Writes into the local buffer. Returns the bytes written, `0` on failure.
    pub fn stream_write(&self, stream: &mut ObjectStream, data: &[u8]) -> usize {
        let locator = stream.locator().to_string();
        report("stream_write", &locator, stream.write(data)).unwrap_or(0)
    }

    /// Moves the cursor. Returns whether the position was accepted.
    pub fn stream_seek(&self, stream: &mut ObjectStream, pos: SeekFrom) -> bool {
        let locator = stream.locator().to_string();
        report("stream_seek", &locator, stream.seek(pos)).is_some()
    }

    /// Synchronizes pending changes. Returns whether the remote is up to date.
    pub async fn stream_flush(&self, stream: &mut ObjectStream) -> bool {
        let locator = stream.locator().to_string();
        report("stream_flush", &locator, stream.flush().await).is_some()
    }

    /// Closes a stream. The local buffer is released regardless of the outcome.
    pub async fn stream_close(&self, stream: ObjectStream) -> bool {
        let locator = stream.locator().to_string();
        report("stream_close", &locator, stream.close().await).is_some()
    }

    /// Metadata of an open stream, reflecting unflushed writes.
    pub async fn stream_stat(&self, stream: &mut ObjectStream) -> Option<Stat> {
        let locator = stream.locator().to_string();
        report("stream_stat", &locator, stream.stat().await)
    }

    /// Metadata of a remote object, without fetching its content.
    pub async fn url_stat(&self, locator: &str, config: &StreamConfig) -> Option<Stat> {
        let result = async {
            let parsed = self.parse(locator)?;
            self.context.stat(&parsed, config).await
        }
        .await;
        report("url_stat", locator, result).flatten()
    }

    /// Deletes a remote object.
    pub async fn unlink(&self, locator: &str, config: &StreamConfig) -> bool {
        let result = async {
            let parsed = self.parse(locator)?;
            self.context.unlink(&parsed, config).await
        }
        .await;
        report("unlink", locator, result).is_some()
    }

    /// Whether the container (or object) named by the locator exists.
    pub async fn exists(&self, locator: &str, config: &StreamConfig) -> bool {
        let result = async {
            let parsed = self.parse(locator)?;
            self.context.exists(&parsed, config).await
        }
        .await;
        report("exists", locator, result).unwrap_or(false)
    }

    /// Directory listing is not supported.
    pub fn dir_opendir(&self, locator: &str) -> bool {
        unsupported("dir_opendir", locator)
    }

    /// Directory creation is not supported.
    pub fn mkdir(&self, locator: &str) -> bool {
        unsupported("mkdir", locator)
    }

    /// Directory removal is not supported.
    pub fn rmdir(&self, locator: &str) -> bool {
        unsupported("rmdir", locator)
    }

    /// Renaming is not supported.
    pub fn rename(&self, from: &str, _to: &str) -> bool {
        unsupported("rename", from)
    }

    /// Advisory locking is not supported.
    pub fn stream_lock(&self, stream: &ObjectStream) -> bool {
        unsupported("stream_lock", &stream.locator().to_string())
    }
}

fn report<T>(operation: &'static str, locator: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET_WRAPPER,
                operation,
                locator,
                kind = error.kind_str(),
                error = %error,
                "Stream operation failed"
            );
            None
        }
    }
}

fn unsupported(operation: &'static str, locator: &str) -> bool {
    let error = Error::Unsupported { operation };
    tracing::debug!(
        target: TRACING_TARGET_WRAPPER,
        operation,
        locator,
        kind = error.kind_str(),
        "{error}"
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use crate::memory::MemoryStore;
    use crate::store::Visibility;

    fn config() -> StreamConfig {
        StreamConfig::new()
            .with_token("token")
            .with_endpoint("https://storage.example.com/v1/AUTH_test")
    }

    fn wrapper(store: &MemoryStore) -> StreamWrapper {
        StreamWrapper::new(StreamContext::new(
            store.clone(),
            ConfigResolver::without_defaults(),
        ))
    }

    #[tokio::test]
    async fn failures_become_none_and_false() {
        let store = MemoryStore::new().with_container("docs", Visibility::Private);
        let wrapper = wrapper(&store);

        assert!(wrapper.stream_open("swift://docs/missing", "r", &config()).await.is_none());
        assert!(wrapper.stream_open("swift://docs", "w", &config()).await.is_none());
        assert!(wrapper.url_stat("swift://docs/missing", &config()).await.is_none());
        assert!(!wrapper.unlink("swift://docs/missing", &config()).await);
        assert!(!wrapper.exists("swift://void", &config()).await);
    }

    #[tokio::test]
    async fn other_schemes_are_rejected_before_any_call() {
        let store = MemoryStore::new().with_container("docs", Visibility::Private);
        store.insert("docs", "a.txt", "a");
        let wrapper = wrapper(&store);

        assert!(wrapper.stream_open("s3://docs/a.txt", "r", &config()).await.is_none());
        assert!(wrapper.url_stat("file://docs/a.txt", &config()).await.is_none());
        assert_eq!(store.calls().total(), 0);

        let custom = StreamWrapper::with_scheme("OBJ", wrapper.context().clone());
        assert_eq!(custom.scheme(), "obj");
        assert!(custom.url_stat("obj://docs/a.txt", &config()).await.is_some());
    }

    #[tokio::test]
    async fn full_session_through_the_boundary() {
        let store = MemoryStore::new().with_container("docs", Visibility::Public);
        let wrapper = wrapper(&store);

        let mut stream = wrapper
            .stream_open("swift://docs/log.txt", "a+", &config())
            .await
            .unwrap();
        assert_eq!(wrapper.stream_write(&mut stream, b"line\n"), 5);
        assert!(wrapper.stream_seek(&mut stream, SeekFrom::Start(0)));
        assert_eq!(wrapper.stream_read(&mut stream, 4).as_ref(), b"line");
        assert!(!wrapper.stream_seek(&mut stream, SeekFrom::Current(-10)));
        assert_eq!(wrapper.stream_stat(&mut stream).await.unwrap().size, 5);
        assert!(wrapper.stream_flush(&mut stream).await);
        assert!(!wrapper.stream_lock(&stream));
        assert!(wrapper.stream_close(stream).await);

        assert!(wrapper.exists("swift://docs/log.txt", &config()).await);
        let stat = wrapper.url_stat("swift://docs/log.txt", &config()).await.unwrap();
        assert_eq!(stat.size, 5);
        assert!(wrapper.unlink("swift://docs/log.txt", &config()).await);
        assert!(!wrapper.exists("swift://docs/log.txt", &config()).await);
    }

    #[tokio::test]
    async fn write_on_read_only_stream_reports_zero() {
        let store = MemoryStore::new().with_container("docs", Visibility::Private);
        store.insert("docs", "a.txt", "abc");
        let wrapper = wrapper(&store);

        let mut stream = wrapper
            .stream_open("swift://docs/a.txt", "r", &config())
            .await
            .unwrap();
        assert_eq!(wrapper.stream_write(&mut stream, b"zzz"), 0);
        assert!(wrapper.stream_close(stream).await);
        assert_eq!(store.calls().saves, 0);
    }

    #[tokio::test]
    async fn write_at_unreachable_offset_reports_zero() {
        let store = MemoryStore::new().with_container("docs", Visibility::Private);
        let wrapper = wrapper(&store);

        let mut stream = wrapper
            .stream_open("swift://docs/a", "c+", &config())
            .await
            .unwrap();
        assert!(wrapper.stream_seek(&mut stream, SeekFrom::Start(u64::MAX)));
        assert_eq!(wrapper.stream_write(&mut stream, b"x"), 0);
        assert!(wrapper.stream_seek(&mut stream, SeekFrom::Start(1 << 40)));
        assert_eq!(wrapper.stream_write(&mut stream, b"x"), 0);

        assert!(wrapper.stream_seek(&mut stream, SeekFrom::Start(0)));
        assert_eq!(wrapper.stream_write(&mut stream, b"ok"), 2);
        assert!(wrapper.stream_close(stream).await);
        assert_eq!(store.get("docs", "a").unwrap().as_ref(), b"ok");
    }

    #[tokio::test]
    async fn failed_close_reports_false() {
        let store = MemoryStore::new().with_container("docs", Visibility::Private);
        let wrapper = wrapper(&store);

        let mut stream = wrapper
            .stream_open("swift://docs/new.txt", "w", &config())
            .await
            .unwrap();
        wrapper.stream_write(&mut stream, b"data");
        store.fail_next_saves(1);
        assert!(!wrapper.stream_close(stream).await);
    }

    #[test]
    fn directory_surface_is_unsupported() {
        let wrapper = wrapper(&MemoryStore::new());
        assert!(!wrapper.dir_opendir("swift://docs"));
        assert!(!wrapper.mkdir("swift://docs/dir"));
        assert!(!wrapper.rmdir("swift://docs/dir"));
        assert!(!wrapper.rename("swift://docs/a", "swift://docs/b"));
    }
}
