#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Run a small SMTP server that logs every message it receives
//!
//! Clients must authenticate with PLAIN or LOGIN as `demo` / `demo` before
//! sending mail. Every recipient is accepted.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=debug cargo run --package mailgate-smtpd --example basic_server
//! ```
//!
//! Then, for example:
//!
//! ```bash
//! swaks --server 127.0.0.1:2525 --auth PLAIN --auth-user demo --auth-password demo \
//!     --from alice@example.com --to bob@example.com
//! ```

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use mailgate_smtpd::auth::{Credential, LoginFailed, PlainLoginAuthFactory};
use mailgate_smtpd::codec::MessageReader;
use mailgate_smtpd::config::ServerConfig;
use mailgate_smtpd::{DeliveryError, MessageListener, SessionContext, SmtpServer};
use tracing_subscriber::EnvFilter;

/// Accepts all mail and logs a summary of each message.
struct LoggingListener;

#[async_trait]
impl MessageListener for LoggingListener {
    async fn accept(&self, session: &SessionContext, from: &str, recipient: &str) -> bool {
        tracing::info!(
            peer = ?session.remote_addr(),
            from = %from,
            to = %recipient,
            "Accepting recipient"
        );
        true
    }

    async fn deliver(
        &self,
        session: &SessionContext,
        from: &str,
        recipient: &str,
        mut data: MessageReader<'_>,
    ) -> Result<(), DeliveryError> {
        let mut content = Vec::new();
        data.read_to_end(&mut content)?;

        let text = String::from_utf8_lossy(&content);
        let subject = text
            .lines()
            .take_while(|line| !line.is_empty())
            .find_map(|line| {
                line.get(..8)
                    .filter(|name| name.eq_ignore_ascii_case("subject:"))
                    .map(|_| line[8..].trim().to_string())
            })
            .unwrap_or_default();

        tracing::info!(
            user = session.credential().map_or("-", Credential::username),
            from = %from,
            to = %recipient,
            size = content.len(),
            subject = %subject,
            "Message delivered"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::builder()
        .host_name("localhost")
        .max_recipients(Some(100))
        .max_connections(Some(50))
        .build()?;

    let auth = PlainLoginAuthFactory::new(Arc::new(|user: &str, pass: &str| {
        if user == "demo" && pass == "demo" {
            Ok(())
        } else {
            Err(LoginFailed)
        }
    }));

    let server = SmtpServer::builder()
        .config(config)
        .auth(auth)
        .listener(Arc::new(LoggingListener))
        .build();

    let listener = server.bind(SocketAddr::from(([127, 0, 0, 1], 2525)))?;
    println!("Listening on 127.0.0.1:2525, press Ctrl-C to stop");

    server
        .serve_with_shutdown(listener, async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
