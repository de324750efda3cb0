//! Error types for the SMTP server engine.

use std::io;

use crate::types::{Reply, ReplyCode};

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Connection-level errors.
///
/// Anything that reaches the connection as an `Error` is fatal for that
/// connection: the session writes [`Error::reply`] once and closes. Problems
/// a client can recover from are expressed as coded [`Reply`] values instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// A command line exceeded the configured maximum length.
    #[error("Line is too long: {length}")]
    LineTooLong {
        /// Number of bytes received before the line terminator.
        length: usize,
    },

    /// Invalid server configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The delivery collaborator failed without a coded rejection.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Protocol violation or unexpected state.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns the best-effort reply sent to the client before the
    /// connection is closed.
    #[must_use]
    pub fn reply(&self) -> Reply {
        match self {
            Self::LineTooLong { .. } => Reply::new(ReplyCode::PARAMETER_ERROR, self.to_string()),
            _ => Reply::new(
                ReplyCode::MAILBOX_BUSY,
                "Problem attempting to execute commands. Please try again later.",
            ),
        }
    }

    /// Returns true if the error was caused by the client closing or
    /// resetting the transport.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}
