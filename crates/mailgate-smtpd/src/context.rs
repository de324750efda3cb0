//! Per-connection context passed through command dispatch.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::{AuthenticationHandler, Credential, DummyAuthenticationHandler};
use crate::codec::MessageData;
use crate::config::ServerConfig;
use crate::delivery::{DefaultDeliveryHandler, DeliveryHandler};
use crate::state::SessionState;

/// What listeners and delivery handlers may see of a connection.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    remote_addr: Option<SocketAddr>,
    credential: Option<Credential>,
    secure: bool,
    attributes: HashMap<String, String>,
}

impl SessionContext {
    /// Creates the context of a connection from `remote_addr`.
    #[must_use]
    pub fn new(remote_addr: Option<SocketAddr>) -> Self {
        Self {
            remote_addr,
            ..Self::default()
        }
    }

    /// Address of the connected client, when the transport has one.
    #[must_use]
    pub const fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Identity established by AUTH, if any.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Sets or clears the authenticated identity.
    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    /// Returns true once the session runs over TLS.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    pub(crate) const fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    /// Returns a session attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Stores a session attribute, returning the previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Removes a session attribute.
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }
}

/// Everything a command may read or change for one connection.
pub struct SmtpContext {
    /// Shared server configuration.
    pub config: Arc<ServerConfig>,
    /// SMTP state machine.
    pub state: SessionState,
    /// Connection facts exposed to listeners.
    pub session: SessionContext,
    /// Authentication handler of this connection.
    pub auth: Box<dyn AuthenticationHandler>,
    /// Delivery handler of this connection.
    pub delivery: Box<dyn DeliveryHandler>,
    /// True if the server can upgrade this connection with STARTTLS.
    pub tls_available: bool,
    /// Set by STARTTLS; the connection upgrades after flushing the reply.
    pub starttls_requested: bool,
    /// Message handed over by the decoder for the end-of-data command.
    pub pending_message: Option<MessageData>,
}

impl SmtpContext {
    /// Creates a context with no authentication and no listeners.
    #[must_use]
    pub fn new(config: Arc<ServerConfig>, session: SessionContext) -> Self {
        Self {
            config,
            state: SessionState::new(),
            session,
            auth: Box::new(DummyAuthenticationHandler),
            delivery: Box::new(DefaultDeliveryHandler::new(Vec::new())),
            tls_available: false,
            starttls_requested: false,
            pending_message: None,
        }
    }

    /// Replaces the authentication handler.
    #[must_use]
    pub fn with_auth(mut self, auth: Box<dyn AuthenticationHandler>) -> Self {
        self.auth = auth;
        self
    }

    /// Replaces the delivery handler.
    #[must_use]
    pub fn with_delivery(mut self, delivery: Box<dyn DeliveryHandler>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Marks STARTTLS as available.
    #[must_use]
    pub const fn with_tls(mut self, available: bool) -> Self {
        self.tls_available = available;
        self
    }

    /// Returns true if AUTH must succeed before gated commands run.
    #[must_use]
    pub fn auth_required(&self) -> bool {
        !self.state.is_authenticated() && !self.auth.mechanisms().is_empty()
    }

    /// Ends the mail transaction (RSET and end of DATA).
    pub fn reset(&mut self) {
        self.state.reset();
        self.delivery.reset_message_state();
        self.pending_message = None;
    }

    /// Forgets everything learned on the plaintext channel (STARTTLS).
    pub fn reset_all(&mut self) {
        self.state.reset_all();
        self.delivery.reset_message_state();
        self.auth.reset_state();
        self.session.set_credential(None);
        self.pending_message = None;
    }
}

impl std::fmt::Debug for SmtpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpContext")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("tls_available", &self.tls_available)
            .field("starttls_requested", &self.starttls_requested)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_session_attributes() {
        let mut session = SessionContext::new(Some("127.0.0.1:2525".parse().unwrap()));
        assert_eq!(session.remote_addr().unwrap().port(), 2525);
        assert!(session.credential().is_none());

        assert!(session.set_attribute("helo", "client.example").is_none());
        assert_eq!(session.attribute("helo"), Some("client.example"));
        assert_eq!(session.remove_attribute("helo").as_deref(), Some("client.example"));
        assert!(session.attribute("helo").is_none());
    }

    #[test]
    fn test_dummy_auth_disables_gating() {
        let ctx = SmtpContext::new(Arc::new(ServerConfig::default()), SessionContext::default());
        assert!(!ctx.auth_required());
    }

    #[test]
    fn test_reset_all_drops_credential() {
        let mut ctx = SmtpContext::new(Arc::new(ServerConfig::default()), SessionContext::default());
        ctx.state.set_has_seen_helo(true);
        ctx.state.set_authenticated(true);
        ctx.session.set_credential(Some(Credential::new("alice")));

        ctx.reset();
        assert!(ctx.state.has_seen_helo());
        assert!(ctx.session.credential().is_some());

        ctx.reset_all();
        assert!(!ctx.state.has_seen_helo());
        assert!(!ctx.state.is_authenticated());
        assert!(ctx.session.credential().is_none());
    }
}
