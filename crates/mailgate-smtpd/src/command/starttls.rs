//! STARTTLS (RFC 3207).

use async_trait::async_trait;

use super::{Command, CommandRegistry, HelpMessage, verbs};
use crate::context::SmtpContext;
use crate::error::Result;
use crate::types::{Reply, ReplyCode};

/// `STARTTLS`
///
/// Only records the request: the connection performs the handshake right
/// after the `220` reply has been flushed in plaintext.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartTlsCommand;

#[async_trait]
impl Command for StartTlsCommand {
    fn name(&self) -> &str {
        verbs::STARTTLS
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::STARTTLS,
            "",
            "The STARTTLS command starts a secured connection for the current\n\
             SMTP session.",
        ))
    }

    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        if line.trim().contains(char::is_whitespace) {
            return Ok(Reply::new(
                ReplyCode::PARAMETER_ERROR,
                "Syntax error (no parameters allowed)",
            ));
        }

        if ctx.session.is_secure() {
            return Ok(Reply::new(
                ReplyCode::TLS_UNAVAILABLE,
                "TLS not available due to temporary reason: TLS already active",
            ));
        }
        if !ctx.tls_available {
            return Ok(Reply::new(
                ReplyCode::TLS_UNAVAILABLE,
                "TLS not available due to temporary reason: TLS not configured",
            ));
        }

        ctx.reset_all();
        ctx.starttls_requested = true;
        Ok(Reply::new(ReplyCode::SERVICE_READY, "Ready to start TLS"))
    }
}
