//! Server configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Product name shown in the greeting and in `name_version`.
pub const SERVER_NAME: &str = "Mailgate";

/// Server version, taken from the crate version.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Character set used to decode command lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// ISO-8859-1: every byte maps to the code point of the same value.
    #[default]
    Latin1,
    /// UTF-8, with invalid sequences replaced by U+FFFD.
    Utf8,
}

impl Charset {
    /// Decodes a command line.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => bytes.iter().copied().map(char::from).collect(),
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// SMTP server configuration.
///
/// The configuration is shared read-only by every connection once the
/// server is started.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name announced in the greeting, HELO and EHLO replies.
    pub host_name: String,
    /// Maximum recipients per transaction, `None` for unlimited.
    pub max_recipients: Option<usize>,
    /// Maximum concurrent connections, `None` for unlimited.
    pub max_connections: Option<usize>,
    /// Idle time allowed between two frames before the session is closed.
    pub connection_timeout: Duration,
    /// DATA bytes kept in memory before spilling to a temporary file.
    pub data_deferred_size: usize,
    /// Maximum command line length, excluding the CRLF.
    pub max_line_length: usize,
    /// Character set for command lines.
    pub charset: Charset,
    /// Pending-accept queue length requested from the OS.
    pub backlog: u32,
    /// Size of each socket read.
    pub read_buffer_size: usize,
    /// Directory for spill files, `None` for the OS default.
    pub temp_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Default host name.
    pub const DEFAULT_HOST_NAME: &'static str = "localhost";
    /// Default recipient limit.
    pub const DEFAULT_MAX_RECIPIENTS: usize = 1000;
    /// Default connection limit.
    pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;
    /// Default idle timeout.
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default spill threshold (4 MiB).
    pub const DEFAULT_DATA_DEFERRED_SIZE: usize = 4 * 1024 * 1024;
    /// Default maximum line length (RFC 2822).
    pub const DEFAULT_MAX_LINE_LENGTH: usize = 998;
    /// Default accept backlog.
    pub const DEFAULT_BACKLOG: u32 = 5000;
    /// Default socket read size.
    pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns the product name and version, e.g. `Mailgate 0.1.0`.
    #[must_use]
    pub fn name_version() -> String {
        format!("{SERVER_NAME} {SERVER_VERSION}")
    }

    /// Returns the greeting line text, without the reply code.
    #[must_use]
    pub fn greeting(&self) -> String {
        format!("{} ESMTP {SERVER_NAME}", self.host_name)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_name: Self::DEFAULT_HOST_NAME.to_string(),
            max_recipients: Some(Self::DEFAULT_MAX_RECIPIENTS),
            max_connections: Some(Self::DEFAULT_MAX_CONNECTIONS),
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
            data_deferred_size: Self::DEFAULT_DATA_DEFERRED_SIZE,
            max_line_length: Self::DEFAULT_MAX_LINE_LENGTH,
            charset: Charset::default(),
            backlog: Self::DEFAULT_BACKLOG,
            read_buffer_size: Self::DEFAULT_READ_BUFFER_SIZE,
            temp_dir: None,
        }
    }
}

/// Builder for server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host name.
    #[must_use]
    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.config.host_name = host_name.into();
        self
    }

    /// Sets the recipient limit, `None` for unlimited.
    #[must_use]
    pub const fn max_recipients(mut self, max: Option<usize>) -> Self {
        self.config.max_recipients = max;
        self
    }

    /// Sets the connection limit, `None` for unlimited.
    #[must_use]
    pub const fn max_connections(mut self, max: Option<usize>) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Sets the idle timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Sets the DATA spill threshold. Must be a power of two.
    #[must_use]
    pub const fn data_deferred_size(mut self, size: usize) -> Self {
        self.config.data_deferred_size = size;
        self
    }

    /// Sets the maximum command line length.
    #[must_use]
    pub const fn max_line_length(mut self, length: usize) -> Self {
        self.config.max_line_length = length;
        self
    }

    /// Sets the command line character set.
    #[must_use]
    pub const fn charset(mut self, charset: Charset) -> Self {
        self.config.charset = charset;
        self
    }

    /// Sets the accept backlog.
    #[must_use]
    pub const fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Sets the socket read size.
    #[must_use]
    pub const fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Sets the directory used for spill files.
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the DATA threshold is not a power of two
    /// greater than one, or if a length or size is zero.
    pub fn build(self) -> Result<ServerConfig> {
        let config = self.config;

        if config.data_deferred_size <= 1 || !config.data_deferred_size.is_power_of_two() {
            return Err(Error::Config(format!(
                "data_deferred_size must be a power of two greater than 1, got {}",
                config.data_deferred_size
            )));
        }
        if config.max_line_length == 0 {
            return Err(Error::Config("max_line_length must be positive".into()));
        }
        if config.read_buffer_size == 0 {
            return Err(Error::Config("read_buffer_size must be positive".into()));
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host_name, "localhost");
        assert_eq!(config.max_recipients, Some(1000));
        assert_eq!(config.max_connections, Some(1000));
        assert_eq!(config.connection_timeout, Duration::from_secs(60));
        assert_eq!(config.data_deferred_size, 4 * 1024 * 1024);
        assert_eq!(config.max_line_length, 998);
        assert_eq!(config.charset, Charset::Latin1);
        assert_eq!(config.backlog, 5000);
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .host_name("mx.example.com")
            .max_recipients(None)
            .max_connections(Some(2))
            .connection_timeout(Duration::from_secs(5))
            .data_deferred_size(1024)
            .charset(Charset::Utf8)
            .build()
            .unwrap();

        assert_eq!(config.host_name, "mx.example.com");
        assert_eq!(config.max_recipients, None);
        assert_eq!(config.max_connections, Some(2));
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.data_deferred_size, 1024);
        assert_eq!(config.charset, Charset::Utf8);
    }

    #[test]
    fn test_rejects_non_power_of_two_threshold() {
        let err = ServerConfig::builder()
            .data_deferred_size(1000)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        assert!(ServerConfig::builder().data_deferred_size(1).build().is_err());
        assert!(ServerConfig::builder().data_deferred_size(0).build().is_err());
    }

    #[test]
    fn test_rejects_zero_line_length() {
        assert!(ServerConfig::builder().max_line_length(0).build().is_err());
    }

    #[test]
    fn test_greeting() {
        let config = ServerConfig::builder().host_name("mx").build().unwrap();
        assert_eq!(config.greeting(), "mx ESMTP Mailgate");
        assert!(ServerConfig::name_version().starts_with("Mailgate "));
    }

    #[test]
    fn test_charset_decode() {
        assert_eq!(Charset::Latin1.decode(b"HELO \xe9"), "HELO \u{e9}");
        assert_eq!(Charset::Utf8.decode("HELO é".as_bytes()), "HELO é");
        assert_eq!(Charset::Utf8.decode(b"\xff"), "\u{fffd}");
    }
}
