//! Integration tests for complete SMTP sessions.
//!
//! Each test drives one connection of a real [`SmtpServer`] over an
//! in-memory pipe, the way a client would.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{auth_factory, connect};
use mailgate_smtpd::SmtpServer;
use mailgate_smtpd::config::ServerConfig;
use mailgate_smtpd::delivery::MessageCollector;

fn config() -> mailgate_smtpd::config::ServerConfigBuilder {
    ServerConfig::builder().host_name("mx.test")
}

fn server_with(collector: &Arc<MessageCollector>) -> SmtpServer {
    SmtpServer::builder()
        .config(config().build().unwrap())
        .listener(collector.clone())
        .build()
}

mod envelope_tests {
    use super::*;

    #[tokio::test]
    async fn test_mail_before_helo() {
        let server = SmtpServer::new(config().build().unwrap());
        let mut client = connect(&server).await;

        assert_eq!(
            client.send("MAIL FROM:<a@b>").await,
            "503 Error: send HELO/EHLO first"
        );
        assert_eq!(client.send("QUIT").await, "221 Bye");
        assert!(client.is_closed().await);
    }

    #[tokio::test]
    async fn test_out_of_order_commands() {
        let server = SmtpServer::new(config().build().unwrap());
        let mut client = connect(&server).await;

        assert_eq!(client.send("HELO client.test").await, "250 mx.test");
        assert_eq!(client.send("RCPT TO:<a@b>").await, "503 Error: need MAIL command");
        assert_eq!(client.send("DATA").await, "503 Error: need MAIL command");
        assert_eq!(client.send("MAIL FROM:<x@y>").await, "250 Ok");
        assert_eq!(client.send("MAIL FROM:<x@y>").await, "503 Sender already specified");
        assert_eq!(client.send("DATA").await, "503 Error: need RCPT command");
    }

    #[tokio::test]
    async fn test_recipient_limit() {
        let server = SmtpServer::builder()
            .config(config().max_recipients(Some(2)).build().unwrap())
            .listener(Arc::new(MessageCollector::new()))
            .build();
        let mut client = connect(&server).await;

        client.send("HELO client.test").await;
        client.send("MAIL FROM:<x@y>").await;
        assert_eq!(client.send("RCPT TO:<a@z>").await, "250 Ok");
        assert_eq!(client.send("RCPT TO:<b@z>").await, "250 Ok");
        assert_eq!(client.send("RCPT TO:<c@z>").await, "452 Too many recipients");
    }

    #[tokio::test]
    async fn test_invalid_addresses() {
        let server = SmtpServer::new(config().build().unwrap());
        let mut client = connect(&server).await;

        client.send("HELO client.test").await;
        assert_eq!(
            client.send("MAIL FROM:<not an address>").await,
            "553 <not an address> Invalid email address"
        );
        assert_eq!(
            client.send("MAIL TO:<x@y>").await,
            "501 Syntax: MAIL FROM: <address>  Error in parameters: \"TO:<x@y>\""
        );
    }

    #[tokio::test]
    async fn test_rset_starts_new_transaction() {
        let server = server_with(&Arc::new(MessageCollector::new()));
        let mut client = connect(&server).await;

        client.send("HELO client.test").await;
        client.send("MAIL FROM:<x@y>").await;
        assert_eq!(client.send("RCPT TO:<a@z>").await, "250 Ok");
        assert_eq!(client.send("RSET").await, "250 Ok");
        assert_eq!(client.send("RCPT TO:<a@z>").await, "503 Error: need MAIL command");
        assert_eq!(client.send("MAIL FROM:<other@y>").await, "250 Ok");

        // HELO after RSET keeps the session usable.
        assert_eq!(client.send("RSET").await, "250 Ok");
        assert_eq!(client.send("HELO client.test").await, "250 mx.test");
        assert_eq!(client.send("MAIL FROM:<x@y>").await, "250 Ok");
        assert_eq!(client.send("RCPT TO:<a@z>").await, "250 Ok");
    }

    #[tokio::test]
    async fn test_ehlo_twice() {
        let server = SmtpServer::new(config().build().unwrap());
        let mut client = connect(&server).await;

        assert_eq!(
            client.send("EHLO client.test").await,
            "250-mx.test\r\n250-8BITMIME\r\n250 Ok"
        );
        assert_eq!(
            client.send("EHLO client.test").await,
            "503 client.test Duplicate EHLO"
        );
    }
}

mod delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_message_delivered_to_accepted_recipient() {
        let collector = Arc::new(MessageCollector::new().accept_only(|rcpt| rcpt == "good@z"));
        let server = server_with(&collector);
        let mut client = connect(&server).await;

        client.send("HELO client.test").await;
        assert_eq!(client.send("MAIL FROM: <x@y>").await, "250 Ok");
        assert_eq!(client.send("RCPT TO: <bad@z>").await, "553 <bad@z> address unknown.");
        assert_eq!(client.send("RCPT TO: <good@z>").await, "250 Ok");
        assert_eq!(client.send("DATA").await, "354 End data with <CR><LF>.<CR><LF>");

        client.write(b"Subject: test\r\n\r\n..leading dot\r\nbody\r\n").await;
        assert_eq!(client.send(".").await, "250 Ok");

        let messages = collector.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].from, "x@y");
        assert_eq!(messages[0].recipient, "good@z");
        assert_eq!(messages[0].data, b"Subject: test\r\n\r\n.leading dot\r\nbody\r\n");

        // The transaction is over; a new one needs a fresh MAIL.
        assert_eq!(client.send("RCPT TO:<good@z>").await, "503 Error: need MAIL command");
    }

    #[tokio::test]
    async fn test_pipelined_transaction() {
        let collector = Arc::new(MessageCollector::new());
        let server = server_with(&collector);
        let mut client = connect(&server).await;

        client
            .write(b"HELO c\r\nMAIL FROM:<x@y>\r\nRCPT TO:<a@z>\r\nDATA\r\nhello\r\n.\r\nQUIT\r\n")
            .await;
        assert_eq!(client.reply().await, "250 mx.test");
        assert_eq!(client.reply().await, "250 Ok");
        assert_eq!(client.reply().await, "250 Ok");
        assert_eq!(client.reply().await, "354 End data with <CR><LF>.<CR><LF>");
        assert_eq!(client.reply().await, "250 Ok");
        assert_eq!(client.reply().await, "221 Bye");
        assert!(client.is_closed().await);

        assert_eq!(collector.messages()[0].data, b"hello\r\n");
    }

    #[tokio::test]
    async fn test_large_message_is_spilled() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Arc::new(MessageCollector::new());
        let server = SmtpServer::builder()
            .config(config().data_deferred_size(64).temp_dir(dir.path()).build().unwrap())
            .listener(collector.clone())
            .build();
        let mut client = connect(&server).await;

        client.send("HELO client.test").await;
        client.send("MAIL FROM:<x@y>").await;
        client.send("RCPT TO:<a@z>").await;
        client.send("RCPT TO:<b@z>").await;
        client.send("DATA").await;

        let mut body = Vec::new();
        for i in 0..200 {
            body.extend_from_slice(format!("line {i} of a long message\r\n").as_bytes());
        }
        client.write(&body).await;
        assert_eq!(client.send(".").await, "250 Ok");

        let messages = collector.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.data == body));

        client.send("QUIT").await;
        assert!(client.is_closed().await);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

mod auth_tests {
    use super::*;

    fn server() -> SmtpServer {
        SmtpServer::builder()
            .config(config().build().unwrap())
            .auth(auth_factory())
            .build()
    }

    #[tokio::test]
    async fn test_ehlo_advertises_mechanisms() {
        let server = server();
        let mut client = connect(&server).await;

        assert_eq!(
            client.send("EHLO client.test").await,
            "250-mx.test\r\n250-8BITMIME\r\n250-AUTH PLAIN LOGIN\r\n250 Ok"
        );
    }

    #[tokio::test]
    async fn test_mail_requires_auth() {
        let server = server();
        let mut client = connect(&server).await;

        client.send("EHLO client.test").await;
        assert_eq!(client.send("MAIL FROM:<x@y>").await, "530 Authentication required");
        assert_eq!(client.send("NOOP").await, "250 Ok");

        assert_eq!(
            client.send("AUTH PLAIN AHVzZXIAcGFzcw==").await,
            "235 Authentication successful"
        );
        assert_eq!(client.send("MAIL FROM:<x@y>").await, "250 Ok");
    }

    #[tokio::test]
    async fn test_second_auth_refused() {
        let server = server();
        let mut client = connect(&server).await;

        client.send("EHLO client.test").await;
        client.send("AUTH PLAIN AHVzZXIAcGFzcw==").await;
        assert_eq!(
            client.send("AUTH PLAIN AHVzZXIAcGFzcw==").await,
            "503 Refusing any other AUTH command"
        );
    }

    #[tokio::test]
    async fn test_plain_without_initial_response() {
        let server = server();
        let mut client = connect(&server).await;

        client.send("EHLO client.test").await;
        assert_eq!(client.send("AUTH PLAIN").await, "334");
        assert_eq!(client.send("AHVzZXIAd3Jvbmc=").await, "535 Authentication failure");
        assert_eq!(client.send("MAIL FROM:<x@y>").await, "530 Authentication required");
    }

    #[tokio::test]
    async fn test_login_cancel_then_retry() {
        let server = server();
        let mut client = connect(&server).await;

        client.send("EHLO client.test").await;
        assert_eq!(client.send("AUTH LOGIN").await, "334 VXNlcm5hbWU6");
        assert_eq!(client.send("*").await, "501 Authentication canceled by client");

        assert_eq!(client.send("AUTH LOGIN").await, "334 VXNlcm5hbWU6");
        assert_eq!(client.send("dXNlcg==").await, "334 UGFzc3dvcmQ6");
        assert_eq!(client.send("*").await, "501 Authentication canceled by client");
        assert_eq!(client.send("NOOP").await, "250 Ok");

        assert_eq!(client.send("AUTH LOGIN").await, "334 VXNlcm5hbWU6");
        assert_eq!(client.send("dXNlcg==").await, "334 UGFzc3dvcmQ6");
        assert_eq!(client.send("cGFzcw==").await, "235 Authentication successful");
    }

    #[tokio::test]
    async fn test_unknown_mechanism() {
        let server = server();
        let mut client = connect(&server).await;

        client.send("EHLO client.test").await;
        assert_eq!(
            client.send("AUTH CRAM-MD5").await,
            "504 Unrecognized authentication type"
        );
    }
}

mod protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_and_malformed_commands() {
        let server = SmtpServer::new(config().build().unwrap());
        let mut client = connect(&server).await;

        assert_eq!(client.send("XYZZY").await, "500 Command not implemented");
        assert!(client.send("AB").await.starts_with("500 "));
        assert_eq!(client.send("noop").await, "250 Ok");
    }

    #[tokio::test]
    async fn test_starttls_without_tls() {
        let server = SmtpServer::new(config().build().unwrap());
        let mut client = connect(&server).await;

        assert_eq!(
            client.send("STARTTLS").await,
            "454 TLS not available due to temporary reason: TLS not configured"
        );
    }

    #[tokio::test]
    async fn test_help() {
        let server = SmtpServer::new(config().build().unwrap());
        let mut client = connect(&server).await;

        let summary = client.send("HELP").await;
        assert!(summary.starts_with("214-"));
        assert!(summary.ends_with("214 End of HELP info"));

        let topic = client.send("HELP rcpt").await;
        assert!(topic.starts_with("214-RCPT"));
        assert!(topic.ends_with("214 End of RCPT info"));
    }

    #[tokio::test]
    async fn test_line_too_long_closes_connection() {
        let server = SmtpServer::new(config().max_line_length(16).build().unwrap());
        let mut client = connect(&server).await;

        assert_eq!(
            client.send("HELO a.very.long.host.name").await,
            "501 Line is too long: 26"
        );
        assert!(client.is_closed().await);
    }
}
