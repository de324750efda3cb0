//! # mailgate-smtpd
//!
//! An embeddable SMTP server protocol engine implementing RFC 5321 with
//! RFC 4954 authentication.
//!
//! The crate frames a client byte stream into command lines and DATA
//! blocks, drives the per-connection SMTP state machine and hands envelopes
//! and messages to the embedding application. It is a library, not an MTA:
//! what happens to accepted mail is decided by [`MessageListener`]s.
//!
//! ## Features
//!
//! - **Streaming decoder**: chunk-boundary independent framing, RFC 5321
//!   dot-unstuffing, large messages spilled to temporary files
//! - **Commands**: HELO, EHLO, MAIL, RCPT, DATA, RSET, NOOP, QUIT, HELP,
//!   AUTH, STARTTLS, plus application-defined verbs
//! - **Authentication**: PLAIN and LOGIN with pluggable credential checks,
//!   `530` gating of mail commands until the client authenticates
//! - **TLS**: STARTTLS through `tokio-rustls`
//! - **Admission control**: connection limit (`554`) and idle timeout (`421`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use mailgate_smtpd::SmtpServer;
//! use mailgate_smtpd::auth::{LoginFailed, PlainLoginAuthFactory};
//! use mailgate_smtpd::config::ServerConfig;
//! use mailgate_smtpd::delivery::MessageCollector;
//!
//! #[tokio::main]
//! async fn main() -> mailgate_smtpd::Result<()> {
//!     let config = ServerConfig::builder()
//!         .host_name("mx.example.com")
//!         .max_recipients(Some(100))
//!         .build()?;
//!
//!     let auth = PlainLoginAuthFactory::new(Arc::new(|user: &str, pass: &str| {
//!         if user == "alice" && pass == "secret" {
//!             Ok(())
//!         } else {
//!             Err(LoginFailed)
//!         }
//!     }));
//!
//!     let inbox = Arc::new(MessageCollector::new());
//!     let server = SmtpServer::builder()
//!         .config(config)
//!         .auth(auth)
//!         .listener(inbox.clone())
//!         .build();
//!
//!     let listener = server.bind(SocketAddr::from(([0, 0, 0, 0], 2525)))?;
//!     server.serve(listener).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: SASL mechanisms and credential validation
//! - [`codec`]: Frame decoder and message data
//! - [`command`]: Verb handlers, registry and dispatcher
//! - [`config`]: Server configuration
//! - [`connection`]: Per-client session loop and transport
//! - [`delivery`]: Hand-off of envelopes and messages to the application
//! - [`parser`]: Command line helpers
//! - [`types`]: Replies, addresses and extensions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod context;
pub mod delivery;
mod error;
pub mod parser;
mod server;
pub mod state;
pub mod types;

pub use config::{Charset, ServerConfig, ServerConfigBuilder};
pub use connection::Connection;
pub use context::{SessionContext, SmtpContext};
pub use delivery::{DeliveryError, MessageListener, Rejection};
pub use error::{Error, Result};
pub use server::{SmtpServer, SmtpServerBuilder};
pub use state::SessionState;
pub use types::{Address, Reply, ReplyCode};
