//! Hand-off of envelopes and messages to the embedding application.
//!
//! Commands talk to a per-connection [`DeliveryHandler`]. The default
//! handler fans every message out to the registered [`MessageListener`]s,
//! which is where applications decide what to accept and what to do with
//! delivered mail.
//!
//! Collaborators never unwind through the protocol engine: they answer with
//! a [`Rejection`] carrying the SMTP code and text to send back.

mod collector;
mod default;
mod factory;

use std::io;

use async_trait::async_trait;
use thiserror::Error;

use crate::codec::{MessageData, MessageReader};
use crate::context::SessionContext;
use crate::types::{Reply, ReplyCode};

pub use collector::{CollectedMessage, MessageCollector};
pub use default::DefaultDeliveryHandler;
pub use factory::DeliveryHandlerFactory;

/// A business decision to refuse a sender, recipient or message.
///
/// Sent to the client verbatim as `<code> <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} {message}")]
pub struct Rejection {
    /// Reply code.
    pub code: ReplyCode,
    /// Reply text.
    pub message: String,
}

impl Rejection {
    /// Creates a rejection.
    #[must_use]
    pub fn new(code: ReplyCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns the reply sent to the client.
    #[must_use]
    pub fn reply(&self) -> Reply {
        Reply::new(self.code, self.message.clone())
    }
}

/// Failure while delivering message content.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The message exceeds what the receiver accepts; answered with `552`.
    #[error("Too much mail data")]
    TooMuchData,

    /// Coded rejection, answered verbatim.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Unexpected failure; closes the connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Application callback deciding on recipients and receiving messages.
#[async_trait]
pub trait MessageListener: Send + Sync {
    /// Returns true if this listener wants mail for `recipient`.
    async fn accept(&self, session: &SessionContext, from: &str, recipient: &str) -> bool;

    /// Receives one message for one accepted recipient.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::TooMuchData`] or a [`Rejection`] to refuse
    /// the message, or an I/O error for unexpected failures.
    async fn deliver(
        &self,
        session: &SessionContext,
        from: &str,
        recipient: &str,
        data: MessageReader<'_>,
    ) -> Result<(), DeliveryError>;
}

/// Per-connection receiver of envelope commands and message content.
#[async_trait]
pub trait DeliveryHandler: Send {
    /// Called for an accepted `MAIL FROM`.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] to refuse the sender.
    async fn sender(&mut self, session: &SessionContext, from: &str) -> Result<(), Rejection>;

    /// Called for a syntactically valid `RCPT TO`.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] to refuse the recipient.
    async fn recipient(&mut self, session: &SessionContext, recipient: &str)
    -> Result<(), Rejection>;

    /// Called once the complete message has been received.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the message is refused or cannot be
    /// delivered.
    async fn data(&mut self, session: &SessionContext, data: &MessageData)
    -> Result<(), DeliveryError>;

    /// Forgets the current transaction (RSET, end of DATA, STARTTLS).
    fn reset_message_state(&mut self);
}
