//! Streaming frame decoder.
//!
//! SMTP input is a sequence of CRLF-terminated command lines, except after a
//! successful `DATA` command where the client sends a message terminated by
//! `CRLF . CRLF`. The decoder consumes arbitrary chunks of the byte stream
//! and yields one [`Frame`] at a time, leaving any pipelined bytes in the
//! source buffer for the next call.

use bytes::{Buf, BytesMut};

use super::{DecoderContext, MessageData};
use crate::config::{Charset, ServerConfig};
use crate::error::{Error, Result};

/// Command line terminator.
const LINE_DELIMITER: &[u8] = b"\r\n";

/// End-of-data terminator.
const DATA_DELIMITER: &[u8] = b"\r\n.\r\n";

/// Length of the `CRLF .` prefix after which a non-terminator byte means the
/// line started with a transparency dot.
const DOT_PREFIX: usize = 3;

/// A decoded unit of client input.
#[derive(Debug)]
pub enum Frame {
    /// A command line without its CRLF.
    Line(String),
    /// A complete message sent after `DATA`.
    Data(MessageData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Line,
    Data,
}

/// Splits a client byte stream into command lines and DATA blocks.
///
/// Bytes are matched against the active delimiter one at a time. A byte that
/// breaks a partial match releases the first matched byte and replays the
/// rest, so overlapping prefixes (a lone `\r` in a message, for example) are
/// never lost.
///
/// In DATA mode the CRLF that ended the `DATA` command counts as the first
/// two delimiter bytes, which lets a lone `.` end an empty message. A line
/// starting with a dot that is not the terminator loses that dot (RFC 5321
/// section 4.5.2).
#[derive(Debug)]
pub struct FrameDecoder {
    ctx: DecoderContext,
    max_line_length: usize,
    charset: Charset,
    mode: Option<Mode>,
    phantom: usize,
}

impl FrameDecoder {
    /// Creates a decoder using the limits from `config`.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            ctx: DecoderContext::new(
                config.max_line_length + LINE_DELIMITER.len(),
                config.data_deferred_size,
                config.temp_dir.clone(),
            ),
            max_line_length: config.max_line_length,
            charset: config.charset,
            mode: None,
            phantom: 0,
        }
    }

    /// Decodes the next frame from `src`.
    ///
    /// `data_mode` selects the delimiter for a frame that has not started
    /// yet; a frame in progress keeps its mode. Consumed bytes are removed
    /// from `src`; bytes after a complete frame stay there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LineTooLong`] when a command line exceeded the
    /// configured maximum (reported once its CRLF arrives), or an I/O error
    /// if a spill file cannot be written.
    pub fn decode(&mut self, src: &mut BytesMut, data_mode: bool) -> Result<Option<Frame>> {
        if src.is_empty() {
            return Ok(None);
        }
        if self.mode.is_none() {
            self.begin(data_mode);
        }

        let mut consumed = 0;
        let mut complete = false;
        for &byte in src.iter() {
            consumed += 1;
            if self.feed(byte)? {
                complete = true;
                break;
            }
        }
        src.advance(consumed);

        if complete {
            self.finish().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Returns true if a partial frame is buffered.
    #[must_use]
    pub const fn in_frame(&self) -> bool {
        self.mode.is_some()
    }

    /// Returns true if decoding `pending` more bytes may touch a spill file.
    ///
    /// Only DATA frames spill; `data_mode` applies when no frame is in
    /// progress, as in [`decode`](Self::decode).
    #[must_use]
    pub fn may_spill(&self, pending: usize, data_mode: bool) -> bool {
        let data = match self.mode {
            Some(mode) => mode == Mode::Data,
            None => data_mode,
        };
        data && self.ctx.may_spill(pending)
    }

    /// Drops the frame in progress, including any spill file.
    pub fn reset(&mut self) {
        self.ctx.reset();
        self.mode = None;
        self.phantom = 0;
    }

    fn begin(&mut self, data_mode: bool) {
        if data_mode {
            self.mode = Some(Mode::Data);
            self.ctx.match_count = LINE_DELIMITER.len();
            self.phantom = LINE_DELIMITER.len();
        } else {
            self.mode = Some(Mode::Line);
            self.ctx.match_count = 0;
            self.phantom = 0;
        }
    }

    const fn delimiter(&self) -> &'static [u8] {
        match self.mode {
            Some(Mode::Data) => DATA_DELIMITER,
            _ => LINE_DELIMITER,
        }
    }

    /// Feeds one byte, returning true when it completes the frame.
    fn feed(&mut self, byte: u8) -> Result<bool> {
        let delimiter = self.delimiter();
        let matched = self.ctx.match_count;

        if byte == delimiter[matched] {
            self.ctx.match_count += 1;
            return Ok(self.ctx.match_count == delimiter.len());
        }

        self.ctx.match_count = 0;
        if matched == 0 {
            self.emit(&[byte])?;
            return Ok(false);
        }

        let replay_from = if self.mode == Some(Mode::Data) && matched >= DOT_PREFIX {
            // Keep the CRLF, drop the leading dot.
            self.emit(&delimiter[..LINE_DELIMITER.len()])?;
            DOT_PREFIX
        } else {
            self.emit(&delimiter[..1])?;
            1
        };

        for &replayed in &delimiter[replay_from..matched] {
            if self.feed(replayed)? {
                return Ok(true);
            }
        }
        self.feed(byte)
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            if self.phantom > 0 {
                self.phantom -= 1;
                continue;
            }
            match self.mode {
                Some(Mode::Data) => self.ctx.write_data(&[byte])?,
                _ => self.ctx.write_line_byte(byte, self.max_line_length),
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Frame> {
        let mode = self.mode.take();
        let phantom = std::mem::take(&mut self.phantom);

        if mode == Some(Mode::Data) {
            if phantom == 0 {
                // The CRLF ending the last line belongs to the message.
                self.ctx.write_data(LINE_DELIMITER)?;
            }
            return match self.ctx.take_message() {
                Ok(data) => Ok(Frame::Data(data)),
                Err(e) => {
                    self.ctx.reset();
                    Err(e.into())
                }
            };
        }

        if self.ctx.overflowed() {
            let length = self.ctx.line_length();
            self.ctx.reset();
            return Err(Error::LineTooLong { length });
        }

        let line = self.charset.decode(self.ctx.line());
        self.ctx.reset();
        Ok(Frame::Line(line))
    }
}
