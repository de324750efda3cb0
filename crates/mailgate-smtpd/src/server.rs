//! TCP server accepting SMTP clients.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_rustls::TlsAcceptor;

use crate::auth::AuthenticationHandlerFactory;
use crate::command::CommandRegistry;
use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionCounter};
use crate::delivery::{DeliveryHandlerFactory, MessageListener};
use crate::error::Result;

/// An SMTP server.
///
/// Owns the parts shared by all connections: configuration, command
/// registry, handler factories, TLS acceptor and the connection counter.
/// Every accepted socket runs as its own task.
///
/// # Example
///
/// ```no_run
/// use std::net::SocketAddr;
/// use std::sync::Arc;
/// use mailgate_smtpd::SmtpServer;
/// use mailgate_smtpd::config::ServerConfig;
/// use mailgate_smtpd::delivery::MessageCollector;
///
/// # async fn example() -> mailgate_smtpd::Result<()> {
/// let config = ServerConfig::builder().host_name("mx.example.com").build()?;
/// let collector = Arc::new(MessageCollector::new());
///
/// let server = SmtpServer::builder()
///     .config(config)
///     .listener(collector.clone())
///     .build();
///
/// let listener = server.bind(SocketAddr::from(([127, 0, 0, 1], 2525)))?;
/// server.serve(listener).await
/// # }
/// ```
pub struct SmtpServer {
    config: Arc<ServerConfig>,
    registry: Arc<CommandRegistry>,
    auth: Option<Arc<dyn AuthenticationHandlerFactory>>,
    delivery: Arc<DeliveryHandlerFactory>,
    tls: Option<TlsAcceptor>,
    connections: Arc<ConnectionCounter>,
}

impl SmtpServer {
    /// Creates a server with default settings and no listeners.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Starts building a server.
    #[must_use]
    pub fn builder() -> SmtpServerBuilder {
        SmtpServerBuilder::default()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the delivery handler factory, to add or remove listeners
    /// while the server runs.
    #[must_use]
    pub const fn delivery(&self) -> &Arc<DeliveryHandlerFactory> {
        &self.delivery
    }

    /// Number of connections currently open.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.count()
    }

    /// Creates a listening socket on `addr` with the configured backlog.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or bound.
    pub fn bind(&self, addr: SocketAddr) -> Result<TcpListener> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(self.config.backlog)?)
    }

    /// Prepares the session of a newly accepted client.
    ///
    /// The connection counts towards [`connection_count`](Self::connection_count)
    /// until it is dropped.
    #[must_use]
    pub fn connection(&self, remote_addr: Option<SocketAddr>) -> Connection {
        let mut connection = Connection::new(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            remote_addr,
        )
        .with_guard(self.connections.acquire())
        .with_delivery(self.delivery.create());

        if let Some(auth) = &self.auth {
            connection = connection.with_auth(auth.create());
        }
        if let Some(tls) = &self.tls {
            connection = connection.with_tls(tls.clone());
        }
        connection
    }

    /// Accepts clients until the process ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Accepts clients until `signal` completes.
    ///
    /// Connections already running are not interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve_with_shutdown<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            host = %self.config.host_name,
            tls = self.tls.is_some(),
            "SMTP server started"
        );

        tokio::pin!(signal);
        loop {
            tokio::select! {
                () = &mut signal => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => self.spawn(socket, peer),
                    Err(e) => tracing::warn!(error = %e, "Accept failed"),
                },
            }
        }

        tracing::info!(addr = %local_addr, "SMTP server stopped");
        Ok(())
    }

    fn spawn(&self, socket: TcpStream, peer: SocketAddr) {
        let connection = self.connection(Some(peer));
        tracing::debug!(peer = %peer, active = self.connection_count(), "Client connected");

        tokio::spawn(async move {
            if let Err(e) = connection.run(socket).await {
                tracing::debug!(peer = %peer, error = %e, "Connection ended with error");
            }
        });
    }
}

impl std::fmt::Debug for SmtpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpServer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("auth", &self.auth.is_some())
            .field("delivery", &self.delivery)
            .field("tls", &self.tls.is_some())
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// Builder for [`SmtpServer`].
#[derive(Default)]
pub struct SmtpServerBuilder {
    config: ServerConfig,
    registry: Option<CommandRegistry>,
    auth: Option<Arc<dyn AuthenticationHandlerFactory>>,
    delivery: Option<DeliveryHandlerFactory>,
    listeners: Vec<Arc<dyn MessageListener>>,
    tls: Option<TlsAcceptor>,
}

impl SmtpServerBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the built-in command registry.
    #[must_use]
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Enables AUTH with handlers from `factory`.
    #[must_use]
    pub fn auth<F>(mut self, factory: F) -> Self
    where
        F: AuthenticationHandlerFactory + 'static,
    {
        self.auth = Some(Arc::new(factory));
        self
    }

    /// Replaces the delivery handler factory.
    #[must_use]
    pub fn delivery(mut self, factory: DeliveryHandlerFactory) -> Self {
        self.delivery = Some(factory);
        self
    }

    /// Registers a message listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn MessageListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Enables STARTTLS with `acceptor`.
    #[must_use]
    pub fn tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    /// Enables STARTTLS with a rustls server configuration.
    #[must_use]
    pub fn tls_config(self, config: Arc<rustls::ServerConfig>) -> Self {
        self.tls(TlsAcceptor::from(config))
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> SmtpServer {
        let delivery = self.delivery.unwrap_or_default();
        for listener in self.listeners {
            delivery.add_listener(listener);
        }

        SmtpServer {
            config: Arc::new(self.config),
            registry: Arc::new(self.registry.unwrap_or_default()),
            auth: self.auth,
            delivery: Arc::new(delivery),
            tls: self.tls,
            connections: Arc::new(ConnectionCounter::new()),
        }
    }
}

impl std::fmt::Debug for SmtpServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpServerBuilder")
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .field("tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}
