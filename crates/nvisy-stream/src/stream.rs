//! File-style stream sessions over remote objects.
//!
//! An [`ObjectStream`] owns a local [`Buffer`] holding the object's content.
//! Reads, writes and seeks only ever touch that buffer; the remote object is
//! replaced as a whole when the stream is flushed or closed.

use std::io::{self, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::TRACING_TARGET_STREAM;
use crate::buffer::Buffer;
use crate::config::{ConfigResolver, StreamConfig};
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::mode::{ModeFlags, OpenMode};
use crate::stat::Stat;
use crate::store::{Container, Lookup, ObjectInfo, Session, SessionFactory, Visibility};

/// Shared entry point: a session factory plus a credential resolver.
///
/// Sessions are established per call and never shared between streams.
#[derive(Clone)]
pub struct StreamContext {
    factory: Arc<dyn SessionFactory>,
    resolver: ConfigResolver,
}

impl StreamContext {
    /// Creates a context from a session factory and a resolver.
    pub fn new(factory: impl SessionFactory + 'static, resolver: ConfigResolver) -> Self {
        Self {
            factory: Arc::new(factory),
            resolver,
        }
    }

    /// Creates a context from an already shared factory.
    pub fn from_shared(factory: Arc<dyn SessionFactory>, resolver: ConfigResolver) -> Self {
        Self { factory, resolver }
    }

    /// Returns the credential resolver.
    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// Resolves credentials and establishes a session.
    pub async fn session(&self, config: &StreamConfig) -> Result<Arc<dyn Session>> {
        let credentials = self.resolver.resolve(config)?;

        self.factory.connect(&credentials).await.map_err(|e| {
            tracing::warn!(
                target: TRACING_TARGET_STREAM,
                endpoint = %credentials.endpoint(),
                error = %e,
                "Failed to establish session"
            );
            Error::authentication(e.to_string())
        })
    }

    /// Looks up the locator's container, failing if it does not exist.
    async fn container(
        &self,
        session: &Arc<dyn Session>,
        locator: &Locator,
    ) -> Result<Arc<dyn Container>> {
        match session.container(locator.container()).await? {
            Lookup::Found(container) => Ok(container),
            Lookup::NotFound => Err(Error::not_found(locator.container(), locator.object())),
        }
    }

    /// Opens a stream session. See [`ObjectStream::open`].
    pub async fn open(
        &self,
        locator: &Locator,
        mode: impl Into<OpenMode>,
        config: &StreamConfig,
    ) -> Result<ObjectStream> {
        ObjectStream::open(self, locator, mode.into(), config).await
    }

    /// Synthesizes metadata without transferring the object's content.
    ///
    /// Returns `Ok(None)` when the container or the object does not exist.
    pub async fn stat(&self, locator: &Locator, config: &StreamConfig) -> Result<Option<Stat>> {
        locator.require_object()?;
        let session = self.session(config).await?;

        let Lookup::Found(container) = session.container(locator.container()).await? else {
            tracing::debug!(
                target: TRACING_TARGET_STREAM,
                container = %locator.container(),
                "Container not found"
            );
            return Ok(None);
        };

        let Lookup::Found(info) = container.head(locator.object()).await? else {
            tracing::debug!(
                target: TRACING_TARGET_STREAM,
                container = %locator.container(),
                object = %locator.object(),
                "Object not found"
            );
            return Ok(None);
        };

        let visibility = container.acl().await?;
        Ok(Some(Stat::from_object(&info, visibility)))
    }

    /// Deletes the object named by the locator.
    pub async fn unlink(&self, locator: &Locator, config: &StreamConfig) -> Result<()> {
        locator.require_object()?;
        let session = self.session(config).await?;
        let container = self.container(&session, locator).await?;

        container.delete(locator.object()).await?;

        tracing::info!(
            target: TRACING_TARGET_STREAM,
            container = %locator.container(),
            object = %locator.object(),
            "Object deleted"
        );
        Ok(())
    }

    /// Probes for existence. Container-only locators probe the container.
    pub async fn exists(&self, locator: &Locator, config: &StreamConfig) -> Result<bool> {
        if locator.container().is_empty() {
            return Err(Error::MissingResourceIdentifier {
                locator: locator.to_string(),
            });
        }

        let session = self.session(config).await?;
        let Lookup::Found(container) = session.container(locator.container()).await? else {
            return Ok(false);
        };
        if locator.object().is_empty() {
            return Ok(true);
        }
        Ok(container.head(locator.object()).await?.is_found())
    }
}

impl std::fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamContext")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// Local-buffer settings a caller may toggle on an open stream.
///
/// These affect only the local buffer, never the network round trips made
/// by the session collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOption {
    /// Blocking or non-blocking local reads.
    Blocking(bool),
    /// Timeout for local reads.
    ReadTimeout(Duration),
    /// Local write buffer size; `0` disables buffering.
    WriteBuffer(usize),
}

/// Settings recorded through [`ObjectStream::set_option`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub blocking: bool,
    pub read_timeout: Option<Duration>,
    pub write_buffer: Option<usize>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            blocking: true,
            read_timeout: None,
            write_buffer: None,
        }
    }
}

/// An open stream over one remote object.
pub struct ObjectStream {
    locator: Locator,
    mode: OpenMode,
    flags: ModeFlags,
    container: Arc<dyn Container>,
    object: ObjectInfo,
    visibility: Option<Visibility>,
    buffer: Buffer,
    options: StreamOptions,
    closed: bool,
}

impl ObjectStream {
    /// Opens a stream session.
    ///
    /// Existing objects are fetched whole. Missing objects are created
    /// locally when the mode allows it; the new buffer starts dirty so that
    /// an empty object is persisted on close even without writes.
    pub async fn open(
        context: &StreamContext,
        locator: &Locator,
        mode: OpenMode,
        config: &StreamConfig,
    ) -> Result<Self> {
        locator.require_object()?;
        let flags = mode.flags();

        let session = context.session(config).await?;
        let container = context.container(&session, locator).await?;

        let fetched = if flags.truncate_on_open || flags.fail_if_exists {
            container
                .head(locator.object())
                .await?
                .map(|info| (info, Bytes::new()))
        } else {
            container
                .object(locator.object())
                .await?
                .map(|remote| (remote.info, remote.content))
        };

        let (object, mut buffer) = match fetched {
            Lookup::Found(_) if flags.fail_if_exists => {
                return Err(Error::conflict(locator.container(), locator.object()));
            }
            Lookup::Found((info, _)) if flags.truncate_on_open => {
                let mut buffer = Buffer::empty();
                buffer.truncate();
                (info, buffer)
            }
            Lookup::Found((info, content)) => (info, Buffer::from_fetched(content, flags.can_write)),
            Lookup::NotFound if flags.create_if_absent => {
                let mut buffer = Buffer::empty();
                buffer.mark_dirty();
                (ObjectInfo::new(locator.object()), buffer)
            }
            Lookup::NotFound => {
                return Err(Error::not_found(locator.container(), locator.object()));
            }
        };

        if flags.append_only {
            buffer = buffer.with_append_only(true);
            buffer.seek(SeekFrom::End(0))?;
        }

        tracing::debug!(
            target: TRACING_TARGET_STREAM,
            container = %locator.container(),
            object = %locator.object(),
            mode = %mode,
            size = buffer.len(),
            created = object.last_modified.is_none(),
            "Stream opened"
        );

        Ok(Self {
            locator: locator.clone(),
            mode,
            flags,
            container,
            object,
            visibility: None,
            buffer,
            options: StreamOptions::default(),
            closed: false,
        })
    }

    /// Returns the locator this stream was opened with.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Returns the open mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns the capability flags.
    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    /// Returns the last known remote metadata.
    pub fn object(&self) -> &ObjectInfo {
        &self.object
    }

    /// Returns the recorded local-buffer settings.
    pub fn options(&self) -> StreamOptions {
        self.options
    }

    /// Whether local changes are pending synchronization.
    pub fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    /// Reads up to `len` bytes. Returns an empty chunk at end of content.
    pub fn read(&mut self, len: usize) -> Result<Bytes> {
        if !self.flags.can_read {
            return Err(Error::NotReadable);
        }
        Ok(self.buffer.read_bytes(len))
    }

    /// Writes into the local buffer. Nothing reaches the remote store until
    /// [`flush`](Self::flush) or [`close`](Self::close).
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.flags.can_write {
            return Err(Error::NotWritable);
        }
        self.buffer.write(data)
    }

    /// Moves the cursor of the local buffer.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.buffer.seek(pos)
    }

    /// Returns the cursor position.
    pub fn tell(&self) -> u64 {
        self.buffer.position()
    }

    /// Whether the cursor is at or past the end of the content.
    pub fn eof(&self) -> bool {
        self.buffer.is_eof()
    }

    /// Records a local-buffer setting. Returns `true` once applied.
    pub fn set_option(&mut self, option: StreamOption) -> bool {
        match option {
            StreamOption::Blocking(blocking) => self.options.blocking = blocking,
            StreamOption::ReadTimeout(timeout) => self.options.read_timeout = Some(timeout),
            StreamOption::WriteBuffer(0) => self.options.write_buffer = None,
            StreamOption::WriteBuffer(size) => self.options.write_buffer = Some(size),
        }
        true
    }

    /// Exposes the underlying local buffer content.
    pub fn cast(&self) -> &[u8] {
        self.buffer.contents()
    }

    /// Synchronizes pending changes to the remote store.
    ///
    /// No-op in debug mode or when nothing changed. The dirty flag is cleared
    /// only after the save succeeds, so a failed flush may be retried. The
    /// cursor position is preserved across the remote call.
    pub async fn flush(&mut self) -> Result<()> {
        if self.flags.never_persist {
            tracing::trace!(
                target: TRACING_TARGET_STREAM,
                object = %self.locator.object(),
                "Skipping synchronization in debug mode"
            );
            return Ok(());
        }
        if !self.buffer.is_dirty() {
            return Ok(());
        }

        let position = self.buffer.position();
        let content = self.buffer.snapshot();
        let size = content.len();

        match self.container.save(&self.object, content).await {
            Ok(info) => {
                self.object = info;
                self.buffer.mark_clean();
                self.buffer.seek(SeekFrom::Start(position))?;

                tracing::debug!(
                    target: TRACING_TARGET_STREAM,
                    container = %self.locator.container(),
                    object = %self.locator.object(),
                    size,
                    "Object synchronized"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_STREAM,
                    container = %self.locator.container(),
                    object = %self.locator.object(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to synchronize object"
                );
                Err(e.into())
            }
        }
    }

    /// Attempts a final synchronization, then releases the local buffer.
    ///
    /// The buffer is released whatever the outcome; a synchronization
    /// failure is logged and returned.
    pub async fn close(mut self) -> Result<()> {
        let result = self.flush().await;
        if let Err(e) = &result {
            tracing::error!(
                target: TRACING_TARGET_STREAM,
                container = %self.locator.container(),
                object = %self.locator.object(),
                error = %e,
                "Closing stream with unsynchronized changes"
            );
        }
        self.closed = true;
        result
    }

    /// Synthesizes metadata from the local buffer and last known remote state.
    ///
    /// The size reflects unflushed writes. The modification time is `0` for
    /// an object that has never been stored. Container visibility is looked
    /// up once per stream.
    pub async fn stat(&mut self) -> Result<Stat> {
        let visibility = match self.visibility {
            Some(visibility) => visibility,
            None => {
                let visibility = self.container.acl().await?;
                self.visibility = Some(visibility);
                visibility
            }
        };
        Ok(Stat::new(self.buffer.len(), self.object.mtime(), visibility))
    }
}

impl io::Read for ObjectStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = ObjectStream::read(self, buf.len())?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl io::Seek for ObjectStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(ObjectStream::seek(self, pos)?)
    }
}

impl Drop for ObjectStream {
    fn drop(&mut self) {
        if !self.closed && self.flags.persists() && self.buffer.is_dirty() {
            tracing::warn!(
                target: TRACING_TARGET_STREAM,
                container = %self.locator.container(),
                object = %self.locator.object(),
                "Stream dropped without close; local changes discarded"
            );
        }
    }
}

impl std::fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStream")
            .field("locator", &self.locator)
            .field("mode", &self.mode)
            .field("object", &self.object)
            .field("position", &self.buffer.position())
            .field("dirty", &self.buffer.is_dirty())
            .finish_non_exhaustive()
    }
}
