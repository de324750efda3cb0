//! AUTH (RFC 4954).

use async_trait::async_trait;

use super::{Command, CommandRegistry, HelpMessage, verbs};
use crate::auth::{AUTH_CANCEL, AuthStep};
use crate::context::SmtpContext;
use crate::error::Result;
use crate::parser;
use crate::types::{Reply, ReplyCode};

/// `AUTH <mechanism> [initial-response]`
///
/// Also receives every continuation line while an exchange is in progress;
/// the dispatcher routes them here regardless of their content.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthCommand;

#[async_trait]
impl Command for AuthCommand {
    fn name(&self) -> &str {
        verbs::AUTH
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::AUTH,
            "<mechanism> [<initial-response>]\n\
             mechanism = a string identifying a SASL authentication mechanism,\n\
             initial-response = an optional base64-encoded response",
            "The AUTH command allows to select the authentication mechanism to use\n\
             when authenticating with the server.",
        ))
    }

    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        _registry: &CommandRegistry,
    ) -> Result<Reply> {
        if ctx.state.is_authenticated() {
            return Ok(Reply::new(ReplyCode::BAD_SEQUENCE, "Refusing any other AUTH command"));
        }

        if ctx.state.is_authenticating() {
            if line.trim() == AUTH_CANCEL {
                ctx.state.set_authenticating(false);
                ctx.auth.reset_state();
                return Ok(Reply::new(
                    ReplyCode::PARAMETER_ERROR,
                    "Authentication canceled by client",
                ));
            }
        } else {
            let args = parser::args(line);
            let Some(mechanism) = args.get(1) else {
                return Ok(Reply::new(
                    ReplyCode::PARAMETER_ERROR,
                    "Syntax: AUTH mechanism [initial-response]",
                ));
            };

            let mechanism = mechanism.to_ascii_uppercase();
            if !ctx.auth.mechanisms().contains(&mechanism) {
                return Ok(Reply::new(
                    ReplyCode::PARAMETER_NOT_IMPLEMENTED,
                    "Unrecognized authentication type",
                ));
            }
        }

        match ctx.auth.auth(line).await {
            Ok(AuthStep::Challenge(challenge)) => {
                ctx.state.set_authenticating(true);
                Ok(Reply::new(ReplyCode::AUTH_CONTINUE, challenge))
            }
            Ok(AuthStep::Completed(credential)) => {
                tracing::info!(user = credential.username(), "Client authenticated");
                ctx.state.set_authenticating(false);
                ctx.state.set_authenticated(true);
                ctx.session.set_credential(Some(credential));
                Ok(Reply::new(ReplyCode::AUTH_SUCCESS, "Authentication successful"))
            }
            Err(e) => {
                tracing::debug!(error = %e, "Authentication failed");
                ctx.state.set_authenticating(false);
                ctx.state.set_authenticated(false);
                ctx.auth.reset_state();
                Ok(e.reply())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::command::test_support::{auth_context, context};

    async fn run(ctx: &mut SmtpContext, line: &str) -> String {
        AuthCommand
            .execute(line, ctx, &CommandRegistry::default())
            .await
            .unwrap()
            .to_string()
    }

    mod plain_tests {
        use super::*;

        #[tokio::test]
        async fn test_inline_success() {
            let mut ctx = auth_context();
            assert!(ctx.auth_required());

            assert_eq!(
                run(&mut ctx, "AUTH PLAIN AHVzZXIAcGFzcw==").await,
                "235 Authentication successful"
            );
            assert!(ctx.state.is_authenticated());
            assert!(!ctx.auth_required());
            assert_eq!(ctx.session.credential().unwrap().username(), "user");

            assert_eq!(
                run(&mut ctx, "AUTH PLAIN AHVzZXIAcGFzcw==").await,
                "503 Refusing any other AUTH command"
            );
        }

        #[tokio::test]
        async fn test_challenge_then_response() {
            let mut ctx = auth_context();
            assert_eq!(run(&mut ctx, "AUTH PLAIN").await, "334");
            assert!(ctx.state.is_authenticating());

            assert_eq!(run(&mut ctx, "AHVzZXIAcGFzcw==").await, "235 Authentication successful");
            assert!(!ctx.state.is_authenticating());
        }

        #[tokio::test]
        async fn test_wrong_password() {
            let mut ctx = auth_context();
            assert_eq!(
                run(&mut ctx, "AUTH PLAIN AHVzZXIAd3Jvbmc=").await,
                "535 Authentication failure"
            );
            assert!(!ctx.state.is_authenticated());
            assert!(!ctx.state.is_authenticating());
            assert!(ctx.session.credential().is_none());
        }
    }

    mod login_tests {
        use super::*;

        #[tokio::test]
        async fn test_login_exchange() {
            let mut ctx = auth_context();
            assert_eq!(run(&mut ctx, "AUTH LOGIN").await, "334 VXNlcm5hbWU6");
            assert_eq!(run(&mut ctx, "dXNlcg==").await, "334 UGFzc3dvcmQ6");
            assert_eq!(run(&mut ctx, "cGFzcw==").await, "235 Authentication successful");
            assert!(ctx.state.is_authenticated());
        }

        #[tokio::test]
        async fn test_cancel_then_retry() {
            let mut ctx = auth_context();
            assert_eq!(run(&mut ctx, "AUTH LOGIN").await, "334 VXNlcm5hbWU6");
            assert_eq!(run(&mut ctx, "*").await, "501 Authentication canceled by client");
            assert!(!ctx.state.is_authenticating());

            assert_eq!(run(&mut ctx, "AUTH LOGIN").await, "334 VXNlcm5hbWU6");
            assert_eq!(run(&mut ctx, "dXNlcg==").await, "334 UGFzc3dvcmQ6");
            assert_eq!(run(&mut ctx, "cGFzcw==").await, "235 Authentication successful");
        }
    }

    #[tokio::test]
    async fn test_missing_mechanism() {
        let mut ctx = auth_context();
        assert_eq!(
            run(&mut ctx, "AUTH").await,
            "501 Syntax: AUTH mechanism [initial-response]"
        );
    }

    #[tokio::test]
    async fn test_unknown_mechanism() {
        let mut ctx = auth_context();
        assert_eq!(
            run(&mut ctx, "AUTH CRAM-MD5").await,
            "504 Unrecognized authentication type"
        );
    }

    #[tokio::test]
    async fn test_nothing_offered() {
        let mut ctx = context();
        assert_eq!(
            run(&mut ctx, "AUTH PLAIN").await,
            "504 Unrecognized authentication type"
        );
    }
}
