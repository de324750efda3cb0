//! SMTP service extensions advertised in the EHLO reply.

use std::fmt;

/// SMTP extension advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `8BITMIME`
    EightBitMime,
    /// `STARTTLS`, only while the session is still plaintext
    StartTls,
    /// `AUTH` followed by the offered mechanism names
    Auth(Vec<String>),
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EightBitMime => f.write_str("8BITMIME"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth(mechanisms) => write!(f, "AUTH {}", mechanisms.join(" ")),
        }
    }
}

/// SASL authentication mechanism implemented by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication (RFC 4616)
    Plain,
    /// LOGIN - legacy plaintext, two round trips
    Login,
}

impl AuthMechanism {
    /// Looks up a mechanism by name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Plain, Self::Login]
            .into_iter()
            .find(|mechanism| mechanism.as_str().eq_ignore_ascii_case(name))
    }

    /// Name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
