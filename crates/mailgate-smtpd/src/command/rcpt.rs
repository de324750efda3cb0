//! RCPT TO.

use async_trait::async_trait;

use super::{Command, CommandRegistry, HelpMessage, verbs};
use crate::context::SmtpContext;
use crate::error::Result;
use crate::parser;
use crate::types::{Address, Reply, ReplyCode};

const TO: &str = "TO:";

/// `RCPT TO:<address>`
#[derive(Debug, Clone, Copy, Default)]
pub struct RcptCommand;

#[async_trait]
impl Command for RcptCommand {
    fn name(&self) -> &str {
        verbs::RCPT
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::RCPT,
            "TO: <recipient>\nrecipient = the email address of the recipient of the message",
            "The RCPT command specifies the recipient. This command can be used\n\
             any number of times to specify multiple recipients.",
        ))
    }

    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        if !ctx.state.has_sender() {
            return Ok(Reply::new(ReplyCode::BAD_SEQUENCE, "Error: need MAIL command"));
        }

        if ctx
            .config
            .max_recipients
            .is_some_and(|max| ctx.state.recipient_count() >= max)
        {
            return Ok(Reply::new(ReplyCode::INSUFFICIENT_STORAGE, "Too many recipients"));
        }

        let predicate = parser::arg_predicate(line);
        if !parser::starts_with_keyword(predicate, TO) {
            return Ok(Reply::new(
                ReplyCode::PARAMETER_ERROR,
                format!("Syntax: RCPT TO: <address> Error in parameters: \"{predicate}\""),
            ));
        }

        let raw = parser::extract_address(predicate, TO.len());
        let Some(recipient) = Address::parse(raw) else {
            return Ok(Reply::new(
                ReplyCode::MAILBOX_NAME_INVALID,
                format!("<{raw}> Invalid email address"),
            ));
        };

        match ctx.delivery.recipient(&ctx.session, recipient.as_str()).await {
            Ok(()) => {
                ctx.state.add_recipient();
                Ok(Reply::new(ReplyCode::OK, "Ok"))
            }
            Err(rejection) => {
                tracing::debug!(%recipient, %rejection, "Recipient rejected");
                Ok(rejection.reply())
            }
        }
    }
}
