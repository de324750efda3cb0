use std::sync::Arc;

use super::{CommandRegistry, verbs};
use crate::codec::Frame;
use crate::context::SmtpContext;
use crate::error::Result;
use crate::parser;
use crate::types::{Reply, ReplyCode};

/// Routes decoded frames to commands.
///
/// - a data frame becomes the pending message and runs `DATA_END`
/// - while an AUTH exchange is in progress every line goes to `AUTH`
/// - otherwise the line's verb selects the command
///
/// Commands that require authentication answer `530` until the client has
/// authenticated, as long as the connection's auth handler offers any
/// mechanism.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the command registry.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Handles one frame and returns the reply to send.
    ///
    /// # Errors
    ///
    /// Returns an error if the command failed in a way that must close the
    /// connection.
    pub async fn dispatch(&self, frame: Frame, ctx: &mut SmtpContext) -> Result<Reply> {
        match frame {
            Frame::Data(message) => {
                tracing::debug!(size = message.len(), spilled = message.is_spilled(), "Message received");
                ctx.pending_message = Some(message);
                self.run(verbs::DATA_END, verbs::DATA_END, ctx).await
            }
            Frame::Line(line) => self.dispatch_line(&line, ctx).await,
        }
    }

    async fn dispatch_line(&self, line: &str, ctx: &mut SmtpContext) -> Result<Reply> {
        if ctx.state.is_authenticating() {
            return self.run(verbs::AUTH, line, ctx).await;
        }

        match parser::verb(line) {
            Ok(verb) => self.run(&verb, line, ctx).await,
            Err(e) => Ok(Reply::new(ReplyCode::SYNTAX_ERROR, e.to_string())),
        }
    }

    async fn run(&self, verb: &str, line: &str, ctx: &mut SmtpContext) -> Result<Reply> {
        let Some(command) = self.registry.get(verb) else {
            return Ok(Reply::new(ReplyCode::SYNTAX_ERROR, "Command not implemented"));
        };

        if command.auth_required() && ctx.auth_required() {
            return Ok(Reply::new(ReplyCode::AUTH_REQUIRED, "Authentication required"));
        }

        command.execute(line, ctx, &self.registry).await
    }
}
