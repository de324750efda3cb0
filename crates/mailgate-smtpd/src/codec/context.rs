//! Per-connection decoder buffers.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};

use super::MessageData;

/// Largest batch of bytes appended to an open spill file at once.
const SPILL_CHUNK: usize = 8192;

/// Accumulator for the frame currently being decoded.
///
/// Bytes go to memory until the DATA threshold is exceeded; from then on the
/// frame is written to an anonymous temporary file. The file belongs to the
/// in-flight frame and is handed over with the finished [`MessageData`] or
/// dropped on [`reset`](Self::reset).
#[derive(Debug)]
pub struct DecoderContext {
    buffer: BytesMut,
    baseline: usize,
    threshold: usize,
    flush_at: usize,
    temp_dir: Option<PathBuf>,
    spill: Option<File>,
    spilled_len: u64,
    overflow: Option<usize>,
    /// Delimiter bytes matched so far.
    pub(crate) match_count: usize,
}

impl DecoderContext {
    /// Creates a context with `baseline` bytes of initial capacity.
    pub fn new(baseline: usize, threshold: usize, temp_dir: Option<PathBuf>) -> Self {
        Self {
            buffer: BytesMut::with_capacity(baseline),
            baseline,
            threshold,
            flush_at: threshold.min(SPILL_CHUNK),
            temp_dir,
            spill: None,
            spilled_len: 0,
            overflow: None,
            match_count: 0,
        }
    }

    /// Appends a command line byte, discarding it once `limit` is reached.
    pub fn write_line_byte(&mut self, byte: u8, limit: usize) {
        if let Some(discarded) = self.overflow.as_mut() {
            *discarded += 1;
        } else if self.buffer.len() >= limit {
            self.overflow = Some(1);
        } else {
            self.buffer.extend_from_slice(&[byte]);
        }
    }

    /// Appends DATA bytes, spilling to a temporary file past the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the spill file cannot be created or written.
    pub fn write_data(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.buffer.extend_from_slice(bytes);

        if self.spill.is_some() {
            if self.buffer.len() >= self.flush_at {
                self.flush_spill()?;
            }
        } else if self.buffer.len() > self.threshold {
            self.start_spill()?;
        }
        Ok(())
    }

    /// Returns true if appending `incoming` more DATA bytes may write to a
    /// spill file.
    pub fn may_spill(&self, incoming: usize) -> bool {
        self.spill.is_some() || self.buffer.len() + incoming > self.threshold
    }

    /// Bytes of the current frame held in memory.
    #[cfg(test)]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total line length seen so far, including discarded bytes.
    pub fn line_length(&self) -> usize {
        self.buffer.len() + self.overflow.unwrap_or(0)
    }

    /// Returns true if the current line exceeded its limit.
    pub const fn overflowed(&self) -> bool {
        self.overflow.is_some()
    }

    /// Returns the bytes of the current command line.
    pub fn line(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns true if the current frame has been moved to a spill file.
    #[cfg(test)]
    pub const fn is_spilling(&self) -> bool {
        self.spill.is_some()
    }

    /// Completes the current DATA frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the tail of a spilled frame cannot be written.
    pub fn take_message(&mut self) -> io::Result<MessageData> {
        let data = match self.spill.take() {
            Some(mut file) => {
                file.write_all(&self.buffer)?;
                file.flush()?;
                let len = self.spilled_len + self.buffer.len() as u64;
                self.spilled_len = 0;
                // Back to baseline capacity after a spilled frame.
                self.buffer = BytesMut::with_capacity(self.baseline);
                MessageData::from_file(file, len)
            }
            None => {
                let data = MessageData::from_bytes(Bytes::copy_from_slice(&self.buffer));
                self.buffer.clear();
                data
            }
        };
        self.match_count = 0;
        self.overflow = None;
        Ok(data)
    }

    /// Resets all per-frame state, dropping any spill file.
    pub fn reset(&mut self) {
        if self.spill.take().is_some() {
            self.buffer = BytesMut::with_capacity(self.baseline);
        } else {
            self.buffer.clear();
        }
        self.spilled_len = 0;
        self.overflow = None;
        self.match_count = 0;
    }

    /// Current capacity of the in-memory accumulator.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    fn start_spill(&mut self) -> io::Result<()> {
        let file = match &self.temp_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        tracing::debug!(
            threshold = self.threshold,
            buffered = self.buffer.len(),
            "DATA threshold reached, spilling to temporary file"
        );
        self.spill = Some(file);
        self.flush_spill()
    }

    fn flush_spill(&mut self) -> io::Result<()> {
        if let Some(file) = self.spill.as_mut() {
            file.write_all(&self.buffer)?;
            self.spilled_len += self.buffer.len() as u64;
            self.buffer.clear();
        }
        Ok(())
    }
}
