//! Envelope address validation.

use std::fmt;

/// Email address taken from a MAIL or RCPT envelope command.
///
/// Validation is intentionally lenient on the domain side: any dot-separated
/// sequence of letters, digits and hyphens is accepted, so single-label
/// domains used on internal networks (`user@mailhost`) pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Parses and validates an address.
    ///
    /// Returns `None` if the address is not acceptable.
    #[must_use]
    pub fn parse(addr: &str) -> Option<Self> {
        Self::is_valid(addr).then(|| Self(addr.to_string()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks that `addr` is `local@domain` with a dot-atom local part.
    #[must_use]
    pub fn is_valid(addr: &str) -> bool {
        let Some((local, domain)) = addr.rsplit_once('@') else {
            return false;
        };

        is_dot_atom(local) && is_domain(domain)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// RFC 5322 `atext`.
const fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '_' | '!'
                | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '/'
                | '='
                | '?'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
                | '^'
                | '-'
        )
}

fn is_dot_atom(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

fn is_domain(s: &str) -> bool {
    if s.eq_ignore_ascii_case("localhost") {
        return true;
    }

    !s.is_empty()
        && s.split('.').all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
