//! Server-side SMTP stream handling.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

use crate::error::{Error, Result};
use crate::types::Reply;

/// Client transport, before or after STARTTLS.
#[derive(Debug)]
pub enum SmtpStream<S> {
    /// Plaintext transport.
    Plain(S),
    /// TLS-encrypted transport.
    Tls(Box<TlsStream<S>>),
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns true once the stream runs over TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Reads whatever the client sent into `buf`.
    ///
    /// Returns `0` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn read_into(&mut self, buf: &mut BytesMut) -> Result<usize> {
        Ok(self.read_buf(buf).await?)
    }

    /// Writes and flushes a reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_reply(&mut self, reply: &Reply) -> Result<()> {
        tracing::trace!(reply = %reply, "S:");
        self.write_all(&reply.to_wire()).await?;
        self.flush().await?;
        Ok(())
    }

    /// Performs the server side of a TLS handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream already uses TLS or the handshake
    /// fails.
    pub async fn upgrade(self, acceptor: &TlsAcceptor) -> Result<Self> {
        let plain = match self {
            Self::Plain(stream) => stream,
            Self::Tls(_) => return Err(Error::Protocol("Already using TLS".into())),
        };

        let tls = acceptor.accept(plain).await?;
        Ok(Self::Tls(Box::new(tls)))
    }
}

impl<S> AsyncRead for SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl<S> AsyncWrite for SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
