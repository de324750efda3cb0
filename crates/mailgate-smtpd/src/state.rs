//! Per-connection SMTP session state.

/// Progress of one SMTP session.
///
/// Owned by exactly one connection. Commands check and update it; the
/// connection reads [`is_data_mode`](Self::is_data_mode) to pick the frame
/// delimiter and [`is_active`](Self::is_active) to know when to close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    active: bool,
    has_seen_helo: bool,
    has_sender: bool,
    recipient_count: usize,
    data_mode: bool,
    authenticating: bool,
    authenticated: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates the state of a freshly accepted connection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: true,
            has_seen_helo: false,
            has_sender: false,
            recipient_count: 0,
            data_mode: false,
            authenticating: false,
            authenticated: false,
        }
    }

    /// Returns false once QUIT has been processed.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Marks the session for closing after the current reply.
    pub const fn quit(&mut self) {
        self.active = false;
    }

    /// Returns true once HELO or EHLO succeeded.
    #[must_use]
    pub const fn has_seen_helo(&self) -> bool {
        self.has_seen_helo
    }

    /// Records a successful HELO or EHLO.
    pub const fn set_has_seen_helo(&mut self, seen: bool) {
        self.has_seen_helo = seen;
    }

    /// Returns true once MAIL FROM was accepted.
    #[must_use]
    pub const fn has_sender(&self) -> bool {
        self.has_sender
    }

    /// Records an accepted MAIL FROM.
    pub const fn set_has_sender(&mut self, has_sender: bool) {
        self.has_sender = has_sender;
    }

    /// Number of accepted recipients in the current transaction.
    #[must_use]
    pub const fn recipient_count(&self) -> usize {
        self.recipient_count
    }

    /// Records an accepted RCPT TO.
    pub const fn add_recipient(&mut self) {
        self.recipient_count += 1;
    }

    /// Returns true between an accepted DATA and the end-of-data marker.
    #[must_use]
    pub const fn is_data_mode(&self) -> bool {
        self.data_mode
    }

    /// Enters or leaves DATA mode.
    pub const fn set_data_mode(&mut self, data_mode: bool) {
        self.data_mode = data_mode;
    }

    /// Returns true while an AUTH exchange is in progress.
    #[must_use]
    pub const fn is_authenticating(&self) -> bool {
        self.authenticating
    }

    /// Starts or ends an AUTH exchange.
    pub const fn set_authenticating(&mut self, authenticating: bool) {
        self.authenticating = authenticating;
    }

    /// Returns true once AUTH succeeded.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Records the outcome of an AUTH exchange.
    pub const fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Ends the mail transaction (RSET, end of DATA).
    ///
    /// HELO and authentication are kept.
    pub const fn reset(&mut self) {
        self.has_sender = false;
        self.data_mode = false;
        self.recipient_count = 0;
    }

    /// Resets everything but the connection itself (STARTTLS).
    pub const fn reset_all(&mut self) {
        self.reset();
        self.has_seen_helo = false;
        self.authenticating = false;
        self.authenticated = false;
    }
}
