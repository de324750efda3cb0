//! SMTP authentication (RFC 4954).
//!
//! An [`AuthenticationHandler`] drives the challenge/response exchange that
//! follows an `AUTH` command. Every connection gets its own handler from an
//! [`AuthenticationHandlerFactory`], so per-attempt state never leaks between
//! clients.
//!
//! - [`PlainAuthenticationHandler`]: `PLAIN`, with or without initial response
//! - [`LoginAuthenticationHandler`]: `LOGIN`, two base64 prompts
//! - [`PluginAuthenticationHandler`]: picks one of several mechanisms
//! - [`DummyAuthenticationHandler`]: offers nothing, disables AUTH gating
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mailgate_smtpd::auth::{LoginFailed, PlainLoginAuthFactory};
//!
//! let factory = PlainLoginAuthFactory::new(Arc::new(|user: &str, pass: &str| {
//!     if user == "alice" && pass == "secret" {
//!         Ok(())
//!     } else {
//!         Err(LoginFailed)
//!     }
//! }));
//! # let _ = factory;
//! ```

mod dummy;
mod login;
mod plain;
mod plugin;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Reply, ReplyCode};

pub use dummy::DummyAuthenticationHandler;
pub use login::LoginAuthenticationHandler;
pub use plain::PlainAuthenticationHandler;
pub use plugin::PluginAuthenticationHandler;

/// Line a client sends to abort an exchange.
pub const AUTH_CANCEL: &str = "*";

/// Identity attached to a connection after a successful AUTH.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    username: String,
}

impl Credential {
    /// Creates a credential for `username`.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Credential used when authentication is a no-op.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }

    /// Returns the authenticated user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Outcome of feeding one client line to an [`AuthenticationHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// The exchange continues; the text follows `334` in the reply.
    Challenge(String),
    /// The exchange succeeded.
    Completed(Credential),
}

/// Why an exchange ended without authenticating the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Malformed client data or credentials rejected by the validator.
    #[error("Authentication failure")]
    Failed,
    /// The handler was asked to run a mechanism it does not implement.
    #[error("AUTH mechanism mismatch")]
    MechanismMismatch,
    /// `AUTH LOGIN` was sent with an initial response.
    #[error("Initial response not allowed in AUTH LOGIN")]
    InitialResponseNotAllowed,
}

impl AuthError {
    /// Returns the reply sent to the client.
    #[must_use]
    pub fn reply(self) -> Reply {
        let code = match self {
            Self::Failed | Self::InitialResponseNotAllowed => ReplyCode::AUTH_FAILED,
            Self::MechanismMismatch => ReplyCode::PARAMETER_NOT_IMPLEMENTED,
        };
        Reply::new(code, self.to_string())
    }
}

/// Credentials rejected by a [`LoginValidator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("Login failed")]
pub struct LoginFailed;

impl From<LoginFailed> for AuthError {
    fn from(_: LoginFailed) -> Self {
        Self::Failed
    }
}

/// Checks a user name and password.
#[async_trait]
pub trait LoginValidator: Send + Sync {
    /// Accepts or rejects the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`LoginFailed`] if the credentials are not valid.
    async fn login(&self, username: &str, password: &str) -> Result<(), LoginFailed>;
}

#[async_trait]
impl<F> LoginValidator for F
where
    F: Fn(&str, &str) -> Result<(), LoginFailed> + Send + Sync,
{
    async fn login(&self, username: &str, password: &str) -> Result<(), LoginFailed> {
        self(username, password)
    }
}

/// Server side of one or more SASL mechanisms.
#[async_trait]
pub trait AuthenticationHandler: Send {
    /// Mechanism names offered in EHLO, upper-case.
    fn mechanisms(&self) -> Vec<String>;

    /// Processes one client line.
    ///
    /// The first call receives the whole `AUTH <mechanism> [...]` command;
    /// later calls receive the raw continuation lines.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the exchange ends without success.
    async fn auth(&mut self, input: &str) -> Result<AuthStep, AuthError>;

    /// Forgets any state of the current attempt.
    fn reset_state(&mut self);
}

/// Creates one [`AuthenticationHandler`] per connection.
pub trait AuthenticationHandlerFactory: Send + Sync {
    /// Creates a handler for a new connection.
    fn create(&self) -> Box<dyn AuthenticationHandler>;
}

impl<F> AuthenticationHandlerFactory for F
where
    F: Fn() -> Box<dyn AuthenticationHandler> + Send + Sync,
{
    fn create(&self) -> Box<dyn AuthenticationHandler> {
        self()
    }
}

/// Factory offering `PLAIN` and `LOGIN` backed by one validator.
#[derive(Clone)]
pub struct PlainLoginAuthFactory {
    validator: Arc<dyn LoginValidator>,
}

impl PlainLoginAuthFactory {
    /// Creates a factory using `validator` for both mechanisms.
    #[must_use]
    pub fn new(validator: Arc<dyn LoginValidator>) -> Self {
        Self { validator }
    }
}

impl std::fmt::Debug for PlainLoginAuthFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainLoginAuthFactory").finish_non_exhaustive()
    }
}

impl AuthenticationHandlerFactory for PlainLoginAuthFactory {
    fn create(&self) -> Box<dyn AuthenticationHandler> {
        let mut handler = PluginAuthenticationHandler::new();
        handler.add_plugin(Box::new(PlainAuthenticationHandler::new(Arc::clone(
            &self.validator,
        ))));
        handler.add_plugin(Box::new(LoginAuthenticationHandler::new(Arc::clone(
            &self.validator,
        ))));
        Box::new(handler)
    }
}

/// Splits an `AUTH` command line.
///
/// Returns the mechanism and the remaining tokens when `input` starts with
/// the `AUTH` verb, `None` for continuation lines.
pub(crate) fn parse_auth_command(input: &str) -> Option<(String, Vec<&str>)> {
    let mut tokens = input.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("AUTH") {
        return None;
    }
    let mechanism = tokens.next().unwrap_or_default().to_ascii_uppercase();
    Some((mechanism, tokens.collect()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    pub(super) fn validator() -> Arc<dyn LoginValidator> {
        Arc::new(|user: &str, pass: &str| {
            if user == "alice" && pass == "secret" {
                Ok(())
            } else {
                Err(LoginFailed)
            }
        })
    }

    #[test]
    fn test_error_replies() {
        assert_eq!(AuthError::Failed.reply().to_string(), "535 Authentication failure");
        assert_eq!(
            AuthError::MechanismMismatch.reply().to_string(),
            "504 AUTH mechanism mismatch"
        );
        assert_eq!(
            AuthError::InitialResponseNotAllowed.reply().to_string(),
            "535 Initial response not allowed in AUTH LOGIN"
        );
    }

    #[test]
    fn test_parse_auth_command() {
        let (mechanism, rest) = parse_auth_command("auth plain AGFsaWNl").unwrap();
        assert_eq!(mechanism, "PLAIN");
        assert_eq!(rest, vec!["AGFsaWNl"]);

        let (mechanism, rest) = parse_auth_command("AUTH").unwrap();
        assert_eq!(mechanism, "");
        assert!(rest.is_empty());

        assert!(parse_auth_command("YWxpY2U=").is_none());
        assert!(parse_auth_command("").is_none());
    }

    #[tokio::test]
    async fn test_closure_validator() {
        let validator = validator();
        assert!(validator.login("alice", "secret").await.is_ok());
        assert_eq!(validator.login("alice", "wrong").await, Err(LoginFailed));
    }

    #[tokio::test]
    async fn test_plain_login_factory() {
        let factory = PlainLoginAuthFactory::new(validator());
        let handler = factory.create();
        assert_eq!(handler.mechanisms(), vec!["PLAIN", "LOGIN"]);
    }

    #[test]
    fn test_credential() {
        assert_eq!(Credential::new("bob").username(), "bob");
        assert_eq!(Credential::anonymous().username(), "anonymous");
    }
}
