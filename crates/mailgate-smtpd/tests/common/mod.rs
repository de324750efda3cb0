//! Scripted SMTP client shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};

use mailgate_smtpd::auth::{LoginFailed, PlainLoginAuthFactory};
use mailgate_smtpd::SmtpServer;

/// Line-oriented client that reads complete (possibly multi-line) replies.
pub struct Client<S> {
    reader: BufReader<S>,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    /// Reads one reply; continuation lines are joined with CRLF.
    pub async fn reply(&mut self) -> String {
        let mut reply = String::new();
        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line).await.unwrap();
            assert!(n > 0, "connection closed while waiting for a reply");
            reply.push_str(&line);
            if line.as_bytes().get(3) != Some(&b'-') {
                break;
            }
        }
        reply.trim_end().to_string()
    }

    /// Sends a command line and returns the reply.
    pub async fn send(&mut self, line: &str) -> String {
        self.write(format!("{line}\r\n").as_bytes()).await;
        self.reply().await
    }

    /// Writes raw bytes without waiting for a reply.
    pub async fn write(&mut self, bytes: &[u8]) {
        let stream = self.reader.get_mut();
        stream.write_all(bytes).await.unwrap();
        stream.flush().await.unwrap();
    }

    /// Returns true if the server closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.map_or(true, |n| n == 0)
    }
}

/// Runs one session of `server` over an in-memory pipe and returns the
/// client side, with the greeting already consumed.
pub async fn connect(server: &SmtpServer) -> Client<DuplexStream> {
    let (client, socket) = tokio::io::duplex(64 * 1024);
    let connection = server.connection(None);
    tokio::spawn(connection.run(socket));

    let mut client = Client::new(client);
    let greeting = client.reply().await;
    assert!(greeting.starts_with("220 "), "unexpected greeting: {greeting}");
    client
}

/// PLAIN/LOGIN accepting `user`/`pass`.
pub fn auth_factory() -> PlainLoginAuthFactory {
    PlainLoginAuthFactory::new(Arc::new(|user: &str, pass: &str| {
        if user == "user" && pass == "pass" {
            Ok(())
        } else {
            Err(LoginFailed)
        }
    }))
}
