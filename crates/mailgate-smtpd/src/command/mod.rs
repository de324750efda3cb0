//! SMTP command handlers.
//!
//! Each verb is a [`Command`] registered in a [`CommandRegistry`]. The
//! [`Dispatcher`] parses the verb of every line, enforces the AUTH gate and
//! routes AUTH continuation lines, then runs the command against the
//! connection's [`SmtpContext`].
//!
//! A command answers with a [`Reply`]; client mistakes are ordinary replies
//! (`5xx`), while an `Err` closes the connection.

mod auth;
mod data;
mod dispatch;
mod helo;
mod help;
mod mail;
mod rcpt;
mod registry;
mod simple;
mod starttls;

use async_trait::async_trait;

use crate::context::SmtpContext;
use crate::error::Result;
use crate::types::Reply;

pub use auth::AuthCommand;
pub use data::{DataCommand, DataEndCommand};
pub use dispatch::Dispatcher;
pub use helo::{EhloCommand, HeloCommand};
pub use help::{HelpCommand, HelpMessage, HelpTable};
pub use mail::MailCommand;
pub use rcpt::RcptCommand;
pub use registry::{CommandRegistry, CommandRegistryBuilder};
pub use simple::{NoopCommand, QuitCommand, RsetCommand};
pub use starttls::StartTlsCommand;

/// Verb names of the built-in commands.
pub mod verbs {
    /// `AUTH`
    pub const AUTH: &str = "AUTH";
    /// `DATA`
    pub const DATA: &str = "DATA";
    /// End of message data. Run by the dispatcher, never sent by clients.
    pub const DATA_END: &str = "DATA_END";
    /// `EHLO`
    pub const EHLO: &str = "EHLO";
    /// `HELO`
    pub const HELO: &str = "HELO";
    /// `HELP`
    pub const HELP: &str = "HELP";
    /// `MAIL`
    pub const MAIL: &str = "MAIL";
    /// `NOOP`
    pub const NOOP: &str = "NOOP";
    /// `QUIT`
    pub const QUIT: &str = "QUIT";
    /// `RCPT`
    pub const RCPT: &str = "RCPT";
    /// `RSET`
    pub const RSET: &str = "RSET";
    /// `STARTTLS`
    pub const STARTTLS: &str = "STARTTLS";
}

/// An SMTP verb implementation.
#[async_trait]
pub trait Command: Send + Sync {
    /// Upper-case verb this command answers to.
    fn name(&self) -> &str;

    /// Returns true if the command is refused with `530` until the client
    /// authenticates (only when the server offers AUTH).
    fn auth_required(&self) -> bool {
        true
    }

    /// Help text shown by `HELP`.
    fn help(&self) -> Option<HelpMessage> {
        None
    }

    /// Runs the command for `line`, the full command line without CRLF.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that must close the connection.
    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        registry: &CommandRegistry,
    ) -> Result<Reply>;
}
