//! Commands without arguments: NOOP, QUIT and RSET.

use async_trait::async_trait;

use super::{Command, CommandRegistry, HelpMessage, verbs};
use crate::context::SmtpContext;
use crate::error::Result;
use crate::types::{Reply, ReplyCode};

/// `NOOP`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommand;

#[async_trait]
impl Command for NoopCommand {
    fn name(&self) -> &str {
        verbs::NOOP
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(verbs::NOOP, "", "This command does nothing."))
    }

    async fn execute(
        &self,
        _line: &str,
        _ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        Ok(Reply::new(ReplyCode::OK, "Ok"))
    }
}

/// `QUIT`
#[derive(Debug, Clone, Copy, Default)]
pub struct QuitCommand;

#[async_trait]
impl Command for QuitCommand {
    fn name(&self) -> &str {
        verbs::QUIT
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(verbs::QUIT, "", "Exit the SMTP session."))
    }

    async fn execute(
        &self,
        _line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        ctx.state.quit();
        Ok(Reply::new(ReplyCode::CLOSING, "Bye"))
    }
}

/// `RSET`
#[derive(Debug, Clone, Copy, Default)]
pub struct RsetCommand;

#[async_trait]
impl Command for RsetCommand {
    fn name(&self) -> &str {
        verbs::RSET
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::RSET,
            "",
            "Resets the system to the state after the last HELO/EHLO.",
        ))
    }

    async fn execute(
        &self,
        _line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        ctx.reset();
        Ok(Reply::new(ReplyCode::OK, "Ok"))
    }
}
