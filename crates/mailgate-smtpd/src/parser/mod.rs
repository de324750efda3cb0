//! SMTP command line parser.
//!
//! Helpers shared by the command implementations to split a decoded command
//! line into its verb, arguments and envelope address.

use thiserror::Error;

/// Why a command line did not yield a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerbError {
    /// The line is empty or shorter than any SMTP verb.
    #[error("Syntax error")]
    Syntax,
}

/// Extracts the verb from a command line.
///
/// The verb is the first whitespace-delimited token, upper-cased. Lines
/// shorter than four characters cannot carry an SMTP verb.
///
/// # Errors
///
/// Returns [`VerbError::Syntax`] if the line is empty or too short.
pub fn verb(line: &str) -> Result<String, VerbError> {
    let line = line.trim();
    if line.len() < 4 {
        return Err(VerbError::Syntax);
    }

    line.split_whitespace()
        .next()
        .map(str::to_ascii_uppercase)
        .ok_or(VerbError::Syntax)
}

/// Splits a command line into whitespace-delimited tokens.
#[must_use]
pub fn args(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Returns the text after the four-letter verb, trimmed.
///
/// For `MAIL FROM:<a@b>` this is `FROM:<a@b>`.
#[must_use]
pub fn arg_predicate(line: &str) -> &str {
    line.get(4..).map_or("", str::trim)
}

/// Extracts an envelope address from a predicate such as `FROM:<a@b>`.
///
/// `offset` skips the keyword (`FROM:` or `TO:`). Angle brackets are
/// stripped when present; a missing closing bracket keeps the rest of the
/// text.
#[must_use]
pub fn extract_address(predicate: &str, offset: usize) -> &str {
    let address = predicate.get(offset..).map_or("", str::trim);

    match address.strip_prefix('<') {
        Some(rest) => rest.find('>').map_or(rest, |end| &rest[..end]),
        None => address,
    }
}

/// Returns true if `predicate` starts with `keyword`, ignoring ASCII case.
#[must_use]
pub fn starts_with_keyword(predicate: &str, keyword: &str) -> bool {
    predicate
        .get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
}
