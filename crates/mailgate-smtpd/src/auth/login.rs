//! `LOGIN` mechanism.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{AuthError, AuthStep, AuthenticationHandler, Credential, LoginValidator, parse_auth_command};
use crate::types::AuthMechanism;

/// Server side of `AUTH LOGIN`.
///
/// Prompts for the base64 user name, then for the base64 password. An
/// initial response on the `AUTH LOGIN` line is refused.
pub struct LoginAuthenticationHandler {
    validator: Arc<dyn LoginValidator>,
    username: Option<String>,
}

impl LoginAuthenticationHandler {
    /// Creates a handler checking credentials with `validator`.
    #[must_use]
    pub fn new(validator: Arc<dyn LoginValidator>) -> Self {
        Self {
            validator,
            username: None,
        }
    }
}

impl std::fmt::Debug for LoginAuthenticationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAuthenticationHandler")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthenticationHandler for LoginAuthenticationHandler {
    fn mechanisms(&self) -> Vec<String> {
        vec![AuthMechanism::Login.as_str().to_string()]
    }

    async fn auth(&mut self, input: &str) -> Result<AuthStep, AuthError> {
        if let Some((mechanism, rest)) = parse_auth_command(input) {
            if AuthMechanism::from_name(&mechanism) != Some(AuthMechanism::Login) {
                return Err(AuthError::MechanismMismatch);
            }
            if !rest.is_empty() {
                return Err(AuthError::InitialResponseNotAllowed);
            }
            self.username = None;
            return Ok(AuthStep::Challenge(STANDARD.encode("Username:")));
        }

        let decoded = match decode(input) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.reset_state();
                return Err(e);
            }
        };

        let Some(username) = self.username.take() else {
            self.username = Some(decoded);
            return Ok(AuthStep::Challenge(STANDARD.encode("Password:")));
        };

        let outcome = self.validator.login(&username, &decoded).await;
        self.reset_state();
        outcome?;

        tracing::debug!(username = %username, "LOGIN authentication succeeded");
        Ok(AuthStep::Completed(Credential::new(username)))
    }

    fn reset_state(&mut self) {
        self.username = None;
    }
}

fn decode(input: &str) -> Result<String, AuthError> {
    let bytes = STANDARD
        .decode(input.trim())
        .map_err(|_| AuthError::Failed)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
