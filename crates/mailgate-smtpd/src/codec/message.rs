//! Assembled DATA blocks.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use bytes::Bytes;

/// A complete DATA block, dot-unstuffed, without the terminating `.` line.
///
/// Small messages live in memory. Messages larger than the configured
/// threshold live in an anonymous temporary file that is removed when the
/// value is dropped.
pub struct MessageData {
    inner: Storage,
}

enum Storage {
    Memory(Bytes),
    File { file: File, len: u64 },
}

impl MessageData {
    /// Wraps an in-memory message.
    #[must_use]
    pub const fn from_bytes(bytes: Bytes) -> Self {
        Self {
            inner: Storage::Memory(bytes),
        }
    }

    pub(crate) const fn from_file(file: File, len: u64) -> Self {
        Self {
            inner: Storage::File { file, len },
        }
    }

    /// Returns the message size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        match &self.inner {
            Storage::Memory(bytes) => bytes.len() as u64,
            Storage::File { len, .. } => *len,
        }
    }

    /// Returns true if the message is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the message was spilled to a temporary file.
    #[must_use]
    pub const fn is_spilled(&self) -> bool {
        matches!(self.inner, Storage::File { .. })
    }

    /// Returns a reader positioned at the start of the message.
    ///
    /// Every reader keeps its own position, so several readers over the same
    /// message never disturb each other.
    #[must_use]
    pub fn reader(&self) -> MessageReader<'_> {
        let inner = match &self.inner {
            Storage::Memory(bytes) => ReaderInner::Memory(Cursor::new(bytes.as_ref())),
            Storage::File { file, len } => ReaderInner::File {
                file,
                pos: 0,
                len: *len,
            },
        };
        MessageReader { inner }
    }

    /// Reads the whole message into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the spill file cannot be read.
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(usize::try_from(self.len()).unwrap_or(0));
        self.reader().read_to_end(&mut out)?;
        Ok(out)
    }
}

impl fmt::Debug for MessageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageData")
            .field("len", &self.len())
            .field("spilled", &self.is_spilled())
            .finish()
    }
}

/// Sequential reader over a [`MessageData`].
pub struct MessageReader<'a> {
    inner: ReaderInner<'a>,
}

enum ReaderInner<'a> {
    Memory(Cursor<&'a [u8]>),
    File { file: &'a File, pos: u64, len: u64 },
}

impl Read for MessageReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            ReaderInner::Memory(cursor) => cursor.read(buf),
            ReaderInner::File { file, pos, len } => {
                if *pos >= *len || buf.is_empty() {
                    return Ok(0);
                }
                let remaining = usize::try_from(*len - *pos).unwrap_or(usize::MAX);
                let max = buf.len().min(remaining);

                let mut file: &File = *file;
                file.seek(SeekFrom::Start(*pos))?;
                let n = file.read(&mut buf[..max])?;
                *pos += n as u64;
                Ok(n)
            }
        }
    }
}

impl fmt::Debug for MessageReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageReader").finish_non_exhaustive()
    }
}
