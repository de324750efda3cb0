//! Per-client request/response loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_rustls::TlsAcceptor;
use tracing::Instrument;

use super::{ConnectionGuard, SmtpStream};
use crate::auth::AuthenticationHandler;
use crate::codec::{Frame, FrameDecoder};
use crate::command::{CommandRegistry, Dispatcher};
use crate::config::ServerConfig;
use crate::context::{SessionContext, SmtpContext};
use crate::delivery::DeliveryHandler;
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// What waiting for the next frame produced.
enum Incoming {
    Frame(Frame),
    Closed,
    TimedOut,
}

/// One client connection.
///
/// Created by the server for every accepted socket, or directly by an
/// embedding application that accepts connections itself:
///
/// ```no_run
/// use std::sync::Arc;
/// use mailgate_smtpd::command::CommandRegistry;
/// use mailgate_smtpd::config::ServerConfig;
/// use mailgate_smtpd::connection::Connection;
///
/// # async fn example(socket: tokio::net::TcpStream) -> mailgate_smtpd::Result<()> {
/// let peer = socket.peer_addr().ok();
/// let connection = Connection::new(
///     Arc::new(ServerConfig::default()),
///     Arc::new(CommandRegistry::default()),
///     peer,
/// );
/// connection.run(socket).await
/// # }
/// ```
pub struct Connection {
    config: Arc<ServerConfig>,
    dispatcher: Dispatcher,
    ctx: SmtpContext,
    decoder: FrameDecoder,
    buffer: BytesMut,
    acceptor: Option<TlsAcceptor>,
    guard: Option<ConnectionGuard>,
}

impl Connection {
    /// Creates a connection with no authentication, no listeners and no TLS.
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        registry: Arc<CommandRegistry>,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        let ctx = SmtpContext::new(Arc::clone(&config), SessionContext::new(remote_addr));
        Self {
            decoder: FrameDecoder::new(&config),
            buffer: BytesMut::with_capacity(config.read_buffer_size),
            dispatcher: Dispatcher::new(registry),
            ctx,
            config,
            acceptor: None,
            guard: None,
        }
    }

    /// Sets the authentication handler.
    #[must_use]
    pub fn with_auth(mut self, auth: Box<dyn AuthenticationHandler>) -> Self {
        self.ctx = self.ctx.with_auth(auth);
        self
    }

    /// Sets the delivery handler.
    #[must_use]
    pub fn with_delivery(mut self, delivery: Box<dyn DeliveryHandler>) -> Self {
        self.ctx = self.ctx.with_delivery(delivery);
        self
    }

    /// Enables STARTTLS with `acceptor`.
    #[must_use]
    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.ctx = self.ctx.with_tls(true);
        self.acceptor = Some(acceptor);
        self
    }

    /// Counts this connection for admission control.
    ///
    /// The connection is refused with `554` when the guard reports more live
    /// connections than [`ServerConfig::max_connections`].
    #[must_use]
    pub fn with_guard(mut self, guard: ConnectionGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Returns the connection's context.
    #[must_use]
    pub const fn context(&self) -> &SmtpContext {
        &self.ctx
    }

    /// Runs the session until the client quits, disconnects or times out.
    ///
    /// # Errors
    ///
    /// Returns the error that closed the connection. A best-effort reply has
    /// already been sent to the client when possible.
    pub async fn run<S>(self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let span = tracing::debug_span!("connection", peer = ?self.ctx.session.remote_addr());
        self.serve(SmtpStream::Plain(stream)).instrument(span).await
    }

    async fn serve<S>(mut self, mut stream: SmtpStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if self.over_capacity() {
            tracing::debug!(
                active = self.guard.as_ref().map(ConnectionGuard::count),
                "Too many connections, refusing client"
            );
            let refusal = Reply::new(
                ReplyCode::TRANSACTION_FAILED,
                "Transaction failed. Too many connections.",
            );
            if let Err(e) = stream.write_reply(&refusal).await {
                return Self::write_failed(e);
            }
            stream.shutdown().await.ok();
            return Ok(());
        }

        tracing::debug!("Connection opened");
        let greeting = Reply::new(ReplyCode::SERVICE_READY, self.config.greeting());
        if let Err(e) = stream.write_reply(&greeting).await {
            return Self::write_failed(e);
        }

        loop {
            let frame = match self.next_frame(&mut stream).await {
                Ok(Incoming::Frame(frame)) => frame,
                Ok(Incoming::Closed) => {
                    tracing::debug!("Client closed the connection");
                    return Ok(());
                }
                Ok(Incoming::TimedOut) => {
                    tracing::debug!(timeout = ?self.config.connection_timeout, "Idle timeout");
                    let timeout = Reply::new(
                        ReplyCode::SERVICE_UNAVAILABLE,
                        "Timeout waiting for data from client.",
                    );
                    if let Err(e) = stream.write_reply(&timeout).await {
                        return Self::write_failed(e);
                    }
                    stream.shutdown().await.ok();
                    return Ok(());
                }
                Err(e) => return Self::fail(&mut stream, e).await,
            };

            match &frame {
                Frame::Line(line) => tracing::trace!(line = %line, "C:"),
                Frame::Data(data) => tracing::trace!(size = data.len(), "C: <message data>"),
            }

            let reply = match self.dispatcher.dispatch(frame, &mut self.ctx).await {
                Ok(reply) => reply,
                Err(e) => return Self::fail(&mut stream, e).await,
            };
            if let Err(e) = stream.write_reply(&reply).await {
                return Self::write_failed(e);
            }

            if self.ctx.starttls_requested {
                self.ctx.starttls_requested = false;
                stream = self.start_tls(stream).await?;
            }

            if !self.ctx.state.is_active() {
                tracing::debug!("Client quit");
                stream.shutdown().await.ok();
                return Ok(());
            }
        }
    }

    fn over_capacity(&self) -> bool {
        match (&self.guard, self.config.max_connections) {
            (Some(guard), Some(max)) => guard.count() > max,
            _ => false,
        }
    }

    async fn next_frame<S>(&mut self, stream: &mut SmtpStream<S>) -> Result<Incoming>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        loop {
            let data_mode = self.ctx.state.is_data_mode();
            if let Some(frame) = self.decode(data_mode).await? {
                return Ok(Incoming::Frame(frame));
            }

            self.buffer.reserve(self.config.read_buffer_size);
            let read = tokio::time::timeout(
                self.config.connection_timeout,
                stream.read_into(&mut self.buffer),
            )
            .await;

            match read {
                Err(_elapsed) => return Ok(Incoming::TimedOut),
                Ok(read) => {
                    if read? == 0 {
                        return Ok(Incoming::Closed);
                    }
                }
            }
        }
    }

    async fn decode(&mut self, data_mode: bool) -> Result<Option<Frame>> {
        if !self.decoder.may_spill(self.buffer.len(), data_mode) {
            return self.decoder.decode(&mut self.buffer, data_mode);
        }

        // Spill files use blocking I/O.
        let mut decoder = std::mem::replace(&mut self.decoder, FrameDecoder::new(&self.config));
        let mut buffer = std::mem::take(&mut self.buffer);
        let (decoder, buffer, decoded) = tokio::task::spawn_blocking(move || {
            let decoded = decoder.decode(&mut buffer, data_mode);
            (decoder, buffer, decoded)
        })
        .await
        .map_err(io::Error::from)?;

        self.decoder = decoder;
        self.buffer = buffer;
        decoded
    }

    async fn start_tls<S>(&mut self, stream: SmtpStream<S>) -> Result<SmtpStream<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let Some(acceptor) = self.acceptor.clone() else {
            return Err(Error::Protocol("STARTTLS accepted without a TLS acceptor".into()));
        };

        // Anything pipelined after STARTTLS arrived in plaintext.
        self.buffer.clear();
        self.decoder.reset();

        match stream.upgrade(&acceptor).await {
            Ok(stream) => {
                tracing::debug!("TLS established");
                self.ctx.session.set_secure(stream.is_tls());
                Ok(stream)
            }
            Err(e) => {
                tracing::warn!(error = %e, "TLS handshake failed");
                Err(e)
            }
        }
    }

    fn write_failed(error: Error) -> Result<()> {
        if error.is_disconnect() {
            tracing::debug!(error = %error, "Client disconnected");
            return Ok(());
        }
        tracing::warn!(error = %error, "Could not write reply");
        Err(error)
    }

    async fn fail<S>(stream: &mut SmtpStream<S>, error: Error) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if error.is_disconnect() {
            tracing::debug!(error = %error, "Client disconnected");
            return Ok(());
        }

        tracing::warn!(error = %error, "Closing connection");
        if let Err(e) = stream.write_reply(&error.reply()).await {
            tracing::debug!(error = %e, "Could not send error reply");
        }
        stream.shutdown().await.ok();
        Err(error)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("ctx", &self.ctx)
            .field("decoder", &self.decoder)
            .field("tls", &self.acceptor.is_some())
            .finish_non_exhaustive()
    }
}
