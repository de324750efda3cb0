//! `PLAIN` mechanism (RFC 4616).

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{AuthError, AuthStep, AuthenticationHandler, Credential, LoginValidator, parse_auth_command};
use crate::types::AuthMechanism;

/// Server side of `AUTH PLAIN`.
///
/// The secret is `authzid NUL authcid NUL passwd`, base64 encoded, sent
/// either inline as the initial response or after an empty `334` prompt.
pub struct PlainAuthenticationHandler {
    validator: Arc<dyn LoginValidator>,
}

impl PlainAuthenticationHandler {
    /// Creates a handler checking credentials with `validator`.
    #[must_use]
    pub fn new(validator: Arc<dyn LoginValidator>) -> Self {
        Self { validator }
    }
}

impl std::fmt::Debug for PlainAuthenticationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainAuthenticationHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthenticationHandler for PlainAuthenticationHandler {
    fn mechanisms(&self) -> Vec<String> {
        vec![AuthMechanism::Plain.as_str().to_string()]
    }

    async fn auth(&mut self, input: &str) -> Result<AuthStep, AuthError> {
        let secret = match parse_auth_command(input) {
            Some((mechanism, rest)) => {
                if AuthMechanism::from_name(&mechanism) != Some(AuthMechanism::Plain) {
                    return Err(AuthError::MechanismMismatch);
                }
                match rest.first() {
                    Some(initial) => (*initial).to_string(),
                    None => return Ok(AuthStep::Challenge(String::new())),
                }
            }
            None => input.trim().to_string(),
        };

        let (username, password) = decode_secret(&secret)?;
        let outcome = self.validator.login(&username, &password).await;
        self.reset_state();
        outcome?;

        tracing::debug!(username = %username, "PLAIN authentication succeeded");
        Ok(AuthStep::Completed(Credential::new(username)))
    }

    fn reset_state(&mut self) {}
}

/// Decodes a base64 PLAIN secret into user name and password.
fn decode_secret(secret: &str) -> Result<(String, String), AuthError> {
    let decoded = STANDARD.decode(secret).map_err(|_| AuthError::Failed)?;

    let mut parts = decoded.splitn(3, |&b| b == 0);
    let (Some(_authzid), Some(username), Some(password)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Failed);
    };

    Ok((
        String::from_utf8_lossy(username).into_owned(),
        String::from_utf8_lossy(password).into_owned(),
    ))
}
