//! No-op authentication.

use async_trait::async_trait;

use super::{AuthError, AuthStep, AuthenticationHandler, Credential};

/// Handler used when no authentication is configured.
///
/// Advertises no mechanism, which also turns off the "authenticate first"
/// rule for the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyAuthenticationHandler;

#[async_trait]
impl AuthenticationHandler for DummyAuthenticationHandler {
    fn mechanisms(&self) -> Vec<String> {
        Vec::new()
    }

    async fn auth(&mut self, _input: &str) -> Result<AuthStep, AuthError> {
        Ok(AuthStep::Completed(Credential::anonymous()))
    }

    fn reset_state(&mut self) {}
}
