//! MAIL FROM.

use async_trait::async_trait;

use super::{Command, CommandRegistry, HelpMessage, verbs};
use crate::context::SmtpContext;
use crate::error::Result;
use crate::parser;
use crate::types::{Address, Reply, ReplyCode};

const FROM: &str = "FROM:";

/// `MAIL FROM:<address>`
#[derive(Debug, Clone, Copy, Default)]
pub struct MailCommand;

#[async_trait]
impl Command for MailCommand {
    fn name(&self) -> &str {
        verbs::MAIL
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::MAIL,
            "FROM: <address>\naddress = the email address of the sender",
            "The MAIL FROM command specifies the sender.",
        ))
    }

    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        if !ctx.state.has_seen_helo() {
            return Ok(Reply::new(ReplyCode::BAD_SEQUENCE, "Error: send HELO/EHLO first"));
        }
        if ctx.state.has_sender() {
            return Ok(Reply::new(ReplyCode::BAD_SEQUENCE, "Sender already specified"));
        }

        if line.trim().eq_ignore_ascii_case("MAIL FROM:") {
            return Ok(Reply::new(ReplyCode::PARAMETER_ERROR, "Syntax: MAIL FROM: <address>"));
        }

        let predicate = parser::arg_predicate(line);
        if !parser::starts_with_keyword(predicate, FROM) {
            return Ok(Reply::new(
                ReplyCode::PARAMETER_ERROR,
                format!("Syntax: MAIL FROM: <address>  Error in parameters: \"{predicate}\""),
            ));
        }

        let raw = parser::extract_address(predicate, FROM.len());
        let Some(address) = Address::parse(raw) else {
            return Ok(Reply::new(
                ReplyCode::MAILBOX_NAME_INVALID,
                format!("<{raw}> Invalid email address"),
            ));
        };

        if let Err(rejection) = ctx.delivery.sender(&ctx.session, address.as_str()).await {
            tracing::debug!(from = %address, %rejection, "Sender rejected");
            return Ok(rejection.reply());
        }

        ctx.state.set_has_sender(true);
        Ok(Reply::new(ReplyCode::OK, "Ok"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::codec::MessageData;
    use crate::command::test_support::context;
    use crate::context::SessionContext;
    use crate::delivery::{DeliveryError, DeliveryHandler, Rejection};

    struct RejectAll;

    #[async_trait]
    impl DeliveryHandler for RejectAll {
        async fn sender(&mut self, _session: &SessionContext, from: &str) -> std::result::Result<(), Rejection> {
            Err(Rejection::new(
                ReplyCode::MAILBOX_UNAVAILABLE,
                format!("<{from}> not welcome"),
            ))
        }

        async fn recipient(
            &mut self,
            _session: &SessionContext,
            _recipient: &str,
        ) -> std::result::Result<(), Rejection> {
            Ok(())
        }

        async fn data(
            &mut self,
            _session: &SessionContext,
            _data: &MessageData,
        ) -> std::result::Result<(), DeliveryError> {
            Ok(())
        }

        fn reset_message_state(&mut self) {}
    }

    async fn run(ctx: &mut SmtpContext, line: &str) -> String {
        MailCommand
            .execute(line, ctx, &CommandRegistry::default())
            .await
            .unwrap()
            .to_string()
    }

    fn greeted() -> SmtpContext {
        let mut ctx = context();
        ctx.state.set_has_seen_helo(true);
        ctx
    }

    #[tokio::test]
    async fn test_mail_before_helo() {
        let mut ctx = context();
        assert_eq!(run(&mut ctx, "MAIL FROM:<x@y>").await, "503 Error: send HELO/EHLO first");
        assert!(!ctx.state.has_sender());
    }

    #[tokio::test]
    async fn test_mail_accepts_sender() {
        let mut ctx = greeted();
        assert_eq!(run(&mut ctx, "MAIL FROM: <x@y>").await, "250 Ok");
        assert!(ctx.state.has_sender());
    }

    #[tokio::test]
    async fn test_mail_without_brackets() {
        let mut ctx = greeted();
        assert_eq!(run(&mut ctx, "mail from: x@y").await, "250 Ok");
    }

    #[tokio::test]
    async fn test_duplicate_sender() {
        let mut ctx = greeted();
        run(&mut ctx, "MAIL FROM:<x@y>").await;
        assert_eq!(run(&mut ctx, "MAIL FROM:<z@y>").await, "503 Sender already specified");
    }

    #[tokio::test]
    async fn test_missing_address() {
        let mut ctx = greeted();
        assert_eq!(run(&mut ctx, "MAIL FROM:").await, "501 Syntax: MAIL FROM: <address>");
    }

    #[tokio::test]
    async fn test_bad_predicate() {
        let mut ctx = greeted();
        assert_eq!(
            run(&mut ctx, "MAIL TO:<x@y>").await,
            "501 Syntax: MAIL FROM: <address>  Error in parameters: \"TO:<x@y>\""
        );
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let mut ctx = greeted();
        assert_eq!(
            run(&mut ctx, "MAIL FROM:<not an address>").await,
            "553 <not an address> Invalid email address"
        );
        assert!(!ctx.state.has_sender());
    }

    #[tokio::test]
    async fn test_rejected_sender() {
        let mut ctx = greeted().with_delivery(Box::new(RejectAll));
        assert_eq!(run(&mut ctx, "MAIL FROM:<x@y>").await, "550 <x@y> not welcome");
        assert!(!ctx.state.has_sender());
    }
}
