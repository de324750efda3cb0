//! HELO and EHLO.

use async_trait::async_trait;

use super::{Command, CommandRegistry, HelpMessage, verbs};
use crate::context::SmtpContext;
use crate::error::Result;
use crate::parser;
use crate::types::{Extension, Reply, ReplyCode};

const HOSTNAME_ARGUMENT: &str = "<hostname>\nhostname = your hostname";

/// `HELO <hostname>`
#[derive(Debug, Clone, Copy, Default)]
pub struct HeloCommand;

#[async_trait]
impl Command for HeloCommand {
    fn name(&self) -> &str {
        verbs::HELO
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::HELO,
            HOSTNAME_ARGUMENT,
            "The HELO command posts the client hostname info to the server.",
        ))
    }

    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        if parser::args(line).len() < 2 {
            return Ok(Reply::new(ReplyCode::PARAMETER_ERROR, "Syntax: HELO <hostname>"));
        }

        ctx.state.set_has_seen_helo(true);
        Ok(Reply::new(ReplyCode::OK, ctx.config.host_name.clone()))
    }
}

/// `EHLO <hostname>`
///
/// Answers with the extensions this connection supports: `8BITMIME` always,
/// `STARTTLS` while the session is still in plaintext and a TLS acceptor is
/// configured, `AUTH` when the authentication handler offers mechanisms.
#[derive(Debug, Clone, Copy, Default)]
pub struct EhloCommand;

impl EhloCommand {
    fn extensions(ctx: &SmtpContext, registry: &CommandRegistry) -> Vec<Extension> {
        let mut extensions = vec![Extension::EightBitMime];

        if ctx.tls_available && !ctx.session.is_secure() && registry.contains(verbs::STARTTLS) {
            extensions.push(Extension::StartTls);
        }

        if registry.contains(verbs::AUTH) {
            let mechanisms = ctx.auth.mechanisms();
            if !mechanisms.is_empty() {
                extensions.push(Extension::Auth(mechanisms));
            }
        }

        extensions
    }
}

#[async_trait]
impl Command for EhloCommand {
    fn name(&self) -> &str {
        verbs::EHLO
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::EHLO,
            HOSTNAME_ARGUMENT,
            "The EHLO command posts the client hostname info to the server.\n\
             This extended version of the HELO command will return hints about\n\
             the extended commands available on the local server.",
        ))
    }

    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        registry: &CommandRegistry,
    ) -> Result<Reply> {
        let args = parser::args(line);
        if args.len() < 2 {
            return Ok(Reply::new(ReplyCode::PARAMETER_ERROR, "Syntax: EHLO hostname"));
        }

        if ctx.state.has_seen_helo() {
            return Ok(Reply::new(
                ReplyCode::BAD_SEQUENCE,
                format!("{} Duplicate EHLO", args[1]),
            ));
        }

        ctx.state.set_has_seen_helo(true);

        let mut lines = vec![ctx.config.host_name.clone()];
        lines.extend(
            Self::extensions(ctx, registry)
                .iter()
                .map(ToString::to_string),
        );
        lines.push("Ok".to_string());

        tracing::debug!(client = args[1], "EHLO accepted");
        Ok(Reply::multiline(ReplyCode::OK, lines))
    }
}
