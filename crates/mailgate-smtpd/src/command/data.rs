//! DATA and the end-of-data step.

use async_trait::async_trait;

use super::{Command, CommandRegistry, HelpMessage, verbs};
use crate::context::SmtpContext;
use crate::delivery::DeliveryError;
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// `DATA`
///
/// Switches the connection to data mode; the decoder then frames everything
/// up to `<CRLF>.<CRLF>` as one message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataCommand;

#[async_trait]
impl Command for DataCommand {
    fn name(&self) -> &str {
        verbs::DATA
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::DATA,
            "",
            "The DATA command initiates the message transmission.\n\
             Message ends with <CR><LF>.<CR><LF>",
        ))
    }

    async fn execute(
        &self,
        _line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        if !ctx.state.has_sender() {
            return Ok(Reply::new(ReplyCode::BAD_SEQUENCE, "Error: need MAIL command"));
        }
        if ctx.state.recipient_count() == 0 {
            return Ok(Reply::new(ReplyCode::BAD_SEQUENCE, "Error: need RCPT command"));
        }

        ctx.state.set_data_mode(true);
        Ok(Reply::new(ReplyCode::START_DATA, "End data with <CR><LF>.<CR><LF>"))
    }
}

/// Hands a received message to the delivery handler.
///
/// Dispatched for every data frame. A client sending `DATA_END` itself has
/// no pending message and gets `500`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataEndCommand;

#[async_trait]
impl Command for DataEndCommand {
    fn name(&self) -> &str {
        verbs::DATA_END
    }

    fn auth_required(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        let Some(message) = ctx.pending_message.take() else {
            return Ok(Reply::new(ReplyCode::SYNTAX_ERROR, "Command not implemented"));
        };

        let outcome = ctx.delivery.data(&ctx.session, &message).await;
        ctx.reset();

        match outcome {
            Ok(()) => Ok(Reply::new(ReplyCode::OK, "Ok")),
            Err(DeliveryError::TooMuchData) => Ok(Reply::new(
                ReplyCode::EXCEEDED_STORAGE,
                DeliveryError::TooMuchData.to_string(),
            )),
            Err(DeliveryError::Rejected(rejection)) => Ok(rejection.reply()),
            Err(DeliveryError::Io(e)) => {
                tracing::warn!(error = %e, "Message delivery failed");
                Err(Error::Delivery(e.to_string()))
            }
        }
    }
}
