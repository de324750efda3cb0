//! Replies written to the client.

use std::fmt;

/// A reply sent to the client.
///
/// Every line but the last carries a `-` after the code:
///
/// ```text
/// 250-mail.example.com
/// 250-8BITMIME
/// 250 Ok
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Status code.
    pub code: ReplyCode,
    /// Text lines; empty text renders as the bare code.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a one-line reply.
    #[must_use]
    pub fn new(code: ReplyCode, text: impl Into<String>) -> Self {
        Self {
            code,
            message: vec![text.into()],
        }
    }

    /// Creates a reply of several lines.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn multiline(code: ReplyCode, lines: Vec<String>) -> Self {
        Self {
            code,
            message: lines,
        }
    }

    /// Bytes to write on the socket, CRLF-terminated.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = self.to_string().into_bytes();
        wire.extend_from_slice(b"\r\n");
        wire
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((last, head)) = self.message.split_last() else {
            return write!(f, "{}", self.code);
        };
        for line in head {
            write!(f, "{}-{line}\r\n", self.code)?;
        }
        if last.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {last}", self.code)
        }
    }
}

/// Three-digit SMTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Wraps a raw code, for replies without a named constant.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ReplyCode {
    /// HELP output
    pub const HELP: Self = Self(214);
    /// Greeting
    pub const SERVICE_READY: Self = Self(220);
    /// Reply to QUIT
    pub const CLOSING: Self = Self(221);
    /// AUTH completed
    pub const AUTH_SUCCESS: Self = Self(235);
    /// Success
    pub const OK: Self = Self(250);
    /// AUTH challenge follows
    pub const AUTH_CONTINUE: Self = Self(334);
    /// Reply to DATA, message content may follow
    pub const START_DATA: Self = Self(354);
    /// Idle timeout, the connection is closed
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// Unexpected server-side failure
    pub const MAILBOX_BUSY: Self = Self(450);
    /// Recipient limit reached
    pub const INSUFFICIENT_STORAGE: Self = Self(452);
    /// STARTTLS refused
    pub const TLS_UNAVAILABLE: Self = Self(454);
    /// Unknown verb or unparsable line
    pub const SYNTAX_ERROR: Self = Self(500);
    /// Bad command arguments
    pub const PARAMETER_ERROR: Self = Self(501);
    /// Command out of order
    pub const BAD_SEQUENCE: Self = Self(503);
    /// Unsupported mechanism or topic
    pub const PARAMETER_NOT_IMPLEMENTED: Self = Self(504);
    /// Command needs an authenticated session
    pub const AUTH_REQUIRED: Self = Self(530);
    /// Credentials rejected
    pub const AUTH_FAILED: Self = Self(535);
    /// Sender or recipient refused
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// Message too large
    pub const EXCEEDED_STORAGE: Self = Self(552);
    /// Malformed or unknown address
    pub const MAILBOX_NAME_INVALID: Self = Self(553);
    /// Connection refused or transaction failed
    pub const TRANSACTION_FAILED: Self = Self(554);
}
