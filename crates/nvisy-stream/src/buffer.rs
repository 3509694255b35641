//! Local scratch buffer standing in for a remote object's content.

use std::io::{self, SeekFrom};

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Largest zero-filled gap a single write may open past the end of content.
pub const MAX_WRITE_GAP: usize = 64 * 1024 * 1024;

#[derive(Debug)]
enum Content {
    /// Fetched content used in place; never mutated.
    Shared(Bytes),
    /// Private copy that may be written.
    Owned(BytesMut),
}

/// A seekable in-memory buffer with a dirty flag.
///
/// `dirty` is set by every write and cleared only through
/// [`mark_clean`](Self::mark_clean), which callers invoke after the remote
/// save has succeeded.
#[derive(Debug)]
pub struct Buffer {
    content: Content,
    position: u64,
    dirty: bool,
    append_only: bool,
}

impl Buffer {
    /// Creates an empty, writable buffer.
    pub fn empty() -> Self {
        Self {
            content: Content::Owned(BytesMut::new()),
            position: 0,
            dirty: false,
            append_only: false,
        }
    }

    /// Wraps fetched content.
    ///
    /// Read-only buffers use the content in place. Writable buffers take the
    /// allocation over when nothing else references it and copy it otherwise.
    pub fn from_fetched(content: Bytes, writable: bool) -> Self {
        let content = if writable {
            Content::Owned(
                content
                    .try_into_mut()
                    .unwrap_or_else(|shared| BytesMut::from(shared.as_ref())),
            )
        } else {
            Content::Shared(content)
        };

        Self {
            content,
            position: 0,
            dirty: false,
            append_only: false,
        }
    }

    /// Forces every write to land at the end of the buffer.
    #[must_use]
    pub fn with_append_only(mut self, append_only: bool) -> Self {
        self.append_only = append_only;
        self
    }

    fn as_slice(&self) -> &[u8] {
        match &self.content {
            Content::Shared(bytes) => &bytes[..],
            Content::Owned(bytes) => &bytes[..],
        }
    }

    /// Returns the content length.
    pub fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    /// Whether the buffer holds no content.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Returns the cursor position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the cursor is at or past the end of the content.
    pub fn is_eof(&self) -> bool {
        self.position >= self.len()
    }

    /// Whether a write happened since the last successful synchronization.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flags the content as pending synchronization.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the dirty flag after a successful synchronization.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Returns the full content, independent of the cursor.
    pub fn snapshot(&self) -> Bytes {
        match &self.content {
            Content::Shared(bytes) => bytes.clone(),
            Content::Owned(bytes) => Bytes::copy_from_slice(bytes),
        }
    }

    /// Returns a view of the full content.
    pub fn contents(&self) -> &[u8] {
        self.as_slice()
    }

    /// Reads up to `len` bytes at the cursor. Empty at end of content.
    pub fn read_bytes(&mut self, len: usize) -> Bytes {
        let data = self.as_slice();
        let start = usize::try_from(self.position)
            .unwrap_or(usize::MAX)
            .min(data.len());
        let end = start.saturating_add(len).min(data.len());

        let chunk = match &self.content {
            Content::Shared(bytes) => bytes.slice(start..end),
            Content::Owned(bytes) => Bytes::copy_from_slice(&bytes[start..end]),
        };
        self.position += chunk.len() as u64;
        chunk
    }

    /// Writes `data` at the cursor, zero-filling any gap past the end.
    ///
    /// Fails with [`Error::InvalidSeek`] and leaves the buffer untouched when
    /// the cursor is so far past the end that the write would overflow or
    /// open a gap wider than [`MAX_WRITE_GAP`].
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.append_only {
            self.position = self.len();
        }

        let invalid = Error::InvalidSeek {
            offset: i128::from(self.position),
        };
        let Ok(start) = usize::try_from(self.position) else {
            return Err(invalid);
        };
        if start.saturating_sub(self.as_slice().len()) > MAX_WRITE_GAP {
            return Err(invalid);
        }
        let Some(end) = start.checked_add(data.len()) else {
            return Err(invalid);
        };

        let bytes = self.make_owned();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(data);

        self.position = end as u64;
        self.dirty = true;
        Ok(data.len())
    }

    /// Discards all content and marks the buffer dirty.
    pub fn truncate(&mut self) {
        self.content = Content::Owned(BytesMut::new());
        self.position = 0;
        self.dirty = true;
    }

    /// Moves the cursor. Positions past the end are allowed.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(offset) => (0i128, i128::from(offset)),
            SeekFrom::Current(offset) => (i128::from(self.position), i128::from(offset)),
            SeekFrom::End(offset) => (i128::from(self.len()), i128::from(offset)),
        };

        let target = base + offset;
        let position = u64::try_from(target).map_err(|_| Error::InvalidSeek { offset: target })?;
        self.position = position;
        Ok(position)
    }

    fn make_owned(&mut self) -> &mut BytesMut {
        if let Content::Shared(bytes) = &self.content {
            self.content = Content::Owned(BytesMut::from(bytes.as_ref()));
        }
        match &mut self.content {
            Content::Owned(bytes) => bytes,
            Content::Shared(_) => unreachable!("shared content was just replaced"),
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl io::Read for Buffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_bytes(buf.len());
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl io::Seek for Buffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Buffer::seek(self, pos).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn read_advances_and_stops_at_end() {
        let mut buffer = Buffer::from_fetched(Bytes::from_static(b"hello"), false);
        assert_eq!(buffer.read_bytes(3), Bytes::from_static(b"hel"));
        assert_eq!(buffer.read_bytes(10), Bytes::from_static(b"lo"));
        assert!(buffer.is_eof());
        assert!(buffer.read_bytes(4).is_empty());
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn write_overwrites_then_extends() {
        let mut buffer = Buffer::from_fetched(Bytes::from_static(b"abcdef"), true);
        buffer.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(buffer.write(b"XYZ").unwrap(), 3);
        assert_eq!(buffer.contents(), b"abcdXYZ");
        assert_eq!(buffer.position(), 7);
        assert!(buffer.is_dirty());
    }

    #[test]
    fn write_past_end_zero_fills() {
        let mut buffer = Buffer::empty();
        buffer.seek(SeekFrom::Start(3)).unwrap();
        buffer.write(b"x").unwrap();
        assert_eq!(buffer.contents(), b"\0\0\0x");
    }

    #[test]
    fn write_at_max_position_fails_cleanly() {
        let mut buffer = Buffer::from_fetched(Bytes::from_static(b"abc"), true);
        buffer.seek(SeekFrom::Start(u64::MAX)).unwrap();
        assert!(matches!(
            buffer.write(b"x"),
            Err(Error::InvalidSeek { offset }) if offset == i128::from(u64::MAX)
        ));
        assert_eq!(buffer.contents(), b"abc");
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn write_gap_is_bounded() {
        let mut buffer = Buffer::empty();
        buffer.seek(SeekFrom::Start(1 << 40)).unwrap();
        assert!(buffer.write(b"x").is_err());
        assert!(buffer.is_empty());
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.position(), 1 << 40);

        buffer.seek(SeekFrom::Start(MAX_WRITE_GAP as u64 + 1)).unwrap();
        assert!(buffer.write(b"x").is_err());
        buffer.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(buffer.write(b"x").unwrap(), 1);
    }

    #[test]
    fn append_only_writes_land_at_end() {
        let mut buffer =
            Buffer::from_fetched(Bytes::from_static(b"log:"), true).with_append_only(true);
        buffer.seek(SeekFrom::Start(0)).unwrap();
        buffer.write(b"one").unwrap();
        assert_eq!(buffer.contents(), b"log:one");
    }

    #[test]
    fn shared_content_is_copied_on_write() {
        let original = Bytes::from_static(b"shared");
        let mut buffer = Buffer::from_fetched(original.clone(), false);
        buffer.write(b"S").unwrap();
        assert_eq!(buffer.contents(), b"Shared");
        assert_eq!(original.as_ref(), b"shared");
    }

    #[test]
    fn seek_variants() {
        let mut buffer = Buffer::from_fetched(Bytes::from_static(b"0123456789"), false);
        assert_eq!(buffer.seek(SeekFrom::End(-2)).unwrap(), 8);
        assert_eq!(buffer.seek(SeekFrom::Current(-3)).unwrap(), 5);
        assert_eq!(buffer.seek(SeekFrom::Start(20)).unwrap(), 20);
        assert!(buffer.is_eof());
        assert!(buffer.seek(SeekFrom::Current(-21)).is_err());
        assert_eq!(buffer.position(), 20);
    }

    #[test]
    fn truncate_marks_dirty() {
        let mut buffer = Buffer::from_fetched(Bytes::from_static(b"data"), true);
        buffer.truncate();
        assert!(buffer.is_empty());
        assert!(buffer.is_dirty());
    }

    #[test]
    fn io_read_integration() {
        let mut buffer = Buffer::from_fetched(Bytes::from_static(b"stream me"), false);
        let mut out = String::new();
        buffer.read_to_string(&mut out).unwrap();
        assert_eq!(out, "stream me");
    }

    #[test]
    fn clean_and_dirty_transitions() {
        let mut buffer = Buffer::empty();
        assert!(!buffer.is_dirty());
        buffer.mark_dirty();
        assert!(buffer.is_dirty());
        buffer.mark_clean();
        assert!(!buffer.is_dirty());
    }
}
