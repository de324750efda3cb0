//! Mechanism selection.

use async_trait::async_trait;

use super::{AuthError, AuthStep, AuthenticationHandler, parse_auth_command};

/// Offers the mechanisms of several handlers.
///
/// An `AUTH <mechanism>` line activates the first plugin advertising that
/// mechanism (case-insensitive). Continuation lines go to the active plugin
/// until it completes or fails.
#[derive(Default)]
pub struct PluginAuthenticationHandler {
    plugins: Vec<Box<dyn AuthenticationHandler>>,
    active: Option<usize>,
}

impl PluginAuthenticationHandler {
    /// Creates a handler without plugins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mechanism plugin.
    pub fn add_plugin(&mut self, plugin: Box<dyn AuthenticationHandler>) {
        self.plugins.push(plugin);
    }

    /// Adds a mechanism plugin, builder style.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Box<dyn AuthenticationHandler>) -> Self {
        self.add_plugin(plugin);
        self
    }

    fn activate(&mut self, mechanism: &str) {
        self.active = self.plugins.iter().position(|plugin| {
            plugin
                .mechanisms()
                .iter()
                .any(|name| name.eq_ignore_ascii_case(mechanism))
        });
    }
}

impl std::fmt::Debug for PluginAuthenticationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginAuthenticationHandler")
            .field("mechanisms", &self.mechanisms())
            .field("active", &self.active)
            .finish()
    }
}

#[async_trait]
impl AuthenticationHandler for PluginAuthenticationHandler {
    fn mechanisms(&self) -> Vec<String> {
        self.plugins
            .iter()
            .flat_map(|plugin| plugin.mechanisms())
            .collect()
    }

    async fn auth(&mut self, input: &str) -> Result<AuthStep, AuthError> {
        if let Some((mechanism, _)) = parse_auth_command(input) {
            self.reset_state();
            self.activate(&mechanism);
        }

        let Some(plugin) = self.active.and_then(|index| self.plugins.get_mut(index)) else {
            return Err(AuthError::MechanismMismatch);
        };

        let result = plugin.auth(input).await;
        if !matches!(result, Ok(AuthStep::Challenge(_))) {
            self.active = None;
        }
        result
    }

    fn reset_state(&mut self) {
        if let Some(plugin) = self.active.take().and_then(|index| self.plugins.get_mut(index)) {
            plugin.reset_state();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    use super::*;
    use crate::auth::tests::validator;
    use crate::auth::{Credential, LoginAuthenticationHandler, PlainAuthenticationHandler};

    fn handler() -> PluginAuthenticationHandler {
        PluginAuthenticationHandler::new()
            .with_plugin(Box::new(PlainAuthenticationHandler::new(validator())))
            .with_plugin(Box::new(LoginAuthenticationHandler::new(validator())))
    }

    #[test]
    fn test_mechanisms_in_order() {
        assert_eq!(handler().mechanisms(), vec!["PLAIN", "LOGIN"]);
        assert!(PluginAuthenticationHandler::new().mechanisms().is_empty());
    }

    #[tokio::test]
    async fn test_routes_to_plain() {
        let mut handler = handler();
        let line = format!("AUTH PLAIN {}", STANDARD.encode("\0alice\0secret"));
        let step = handler.auth(&line).await.unwrap();
        assert_eq!(step, AuthStep::Completed(Credential::new("alice")));
        assert!(handler.active.is_none());
    }

    #[tokio::test]
    async fn test_routes_login_continuations() {
        let mut handler = handler();
        handler.auth("auth login").await.unwrap();
        assert_eq!(handler.active, Some(1));

        handler.auth(&STANDARD.encode("alice")).await.unwrap();
        let step = handler.auth(&STANDARD.encode("secret")).await.unwrap();
        assert_eq!(step, AuthStep::Completed(Credential::new("alice")));
        assert!(handler.active.is_none());
    }

    #[tokio::test]
    async fn test_failure_clears_active() {
        let mut handler = handler();
        handler.auth("AUTH LOGIN").await.unwrap();
        handler.auth(&STANDARD.encode("alice")).await.unwrap();
        let result = handler.auth(&STANDARD.encode("bad")).await;
        assert_eq!(result, Err(AuthError::Failed));
        assert!(handler.active.is_none());
    }

    #[tokio::test]
    async fn test_unknown_mechanism() {
        let mut handler = handler();
        assert_eq!(
            handler.auth("AUTH CRAM-MD5").await,
            Err(AuthError::MechanismMismatch)
        );
    }

    #[tokio::test]
    async fn test_new_auth_line_restarts() {
        let mut handler = handler();
        handler.auth("AUTH LOGIN").await.unwrap();
        let step = handler.auth("AUTH PLAIN").await.unwrap();
        assert_eq!(step, AuthStep::Challenge(String::new()));
        assert_eq!(handler.active, Some(0));
    }
}
