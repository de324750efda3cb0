//! HELP command and help texts.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{Command, CommandRegistry, verbs};
use crate::config::ServerConfig;
use crate::context::SmtpContext;
use crate::error::Result;
use crate::parser;
use crate::types::{Reply, ReplyCode};

/// Help text of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpMessage {
    name: String,
    arguments: String,
    description: String,
}

impl HelpMessage {
    /// Creates a help text. `arguments` may span several lines; the first
    /// one is shown next to the verb.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            description: description.into(),
        }
    }

    /// The command the text belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the text as a multi-line `214` reply.
    #[must_use]
    pub fn reply(&self) -> Reply {
        let mut arguments = self.arguments.lines();
        let usage = match arguments.next() {
            Some(first) if !first.trim().is_empty() => format!("{} {}", self.name, first.trim()),
            _ => self.name.clone(),
        };

        let mut lines = vec![usage];
        lines.extend(self.description.lines().map(|line| format!("    {}", line.trim())));
        lines.extend(arguments.map(|line| format!("    {}", line.trim())));
        lines.push(format!("End of {} info", self.name));
        Reply::multiline(ReplyCode::HELP, lines)
    }
}

/// Help texts of all registered commands, keyed by upper-case verb.
///
/// Built once with the registry and never changed afterwards.
#[derive(Debug, Clone, Default)]
pub struct HelpTable {
    entries: BTreeMap<String, HelpMessage>,
}

impl HelpTable {
    pub(crate) fn insert(&mut self, message: HelpMessage) {
        self.entries.insert(message.name().to_ascii_uppercase(), message);
    }

    /// Looks up the help of `topic` (case-insensitive).
    #[must_use]
    pub fn get(&self, topic: &str) -> Option<&HelpMessage> {
        self.entries.get(&topic.to_ascii_uppercase())
    }

    /// Documented verbs, sorted.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The reply to a bare `HELP`.
    #[must_use]
    pub fn summary(&self, config: &ServerConfig) -> Reply {
        let mut lines = vec![
            format!(
                "This is {} server running on {}",
                ServerConfig::name_version(),
                config.host_name
            ),
            "Available commands:".to_string(),
        ];
        lines.extend(self.topics().map(|topic| format!("  {topic}")));
        lines.push("For more info use \"HELP <command>\".".to_string());
        lines.push("For local information send email to Postmaster at your site.".to_string());
        lines.push("End of HELP info".to_string());
        Reply::multiline(ReplyCode::HELP, lines)
    }
}

/// `HELP [topic]`
#[derive(Debug, Clone, Copy, Default)]
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        verbs::HELP
    }

    fn auth_required(&self) -> bool {
        false
    }

    fn help(&self) -> Option<HelpMessage> {
        Some(HelpMessage::new(
            verbs::HELP,
            "[ <topic> ]\ntopic = the command to describe",
            "The HELP command gives help info about the topic specified.\n\
             For a list of topics, type HELP by itself.",
        ))
    }

    async fn execute(
        &self,
        line: &str,
        ctx: &mut SmtpContext,
        registry: &CommandRegistry,
    ) -> Result<Reply> {
        let topic = parser::arg_predicate(line);
        if topic.is_empty() {
            return Ok(registry.help().summary(&ctx.config));
        }

        Ok(registry.help().get(topic).map_or_else(
            || {
                Reply::new(
                    ReplyCode::PARAMETER_NOT_IMPLEMENTED,
                    format!("HELP topic \"{topic}\" unknown"),
                )
            },
            HelpMessage::reply,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::command::test_support::context;

    #[test]
    fn test_help_message_rendering() {
        let message = HelpMessage::new(
            "RCPT",
            "TO: <recipient>\nrecipient = the email address",
            "The RCPT command specifies the recipient.",
        );
        assert_eq!(
            message.reply().to_string(),
            "214-RCPT TO: <recipient>\r\n\
             214-    The RCPT command specifies the recipient.\r\n\
             214-    recipient = the email address\r\n\
             214 End of RCPT info"
        );
    }

    #[test]
    fn test_help_message_without_arguments() {
        let message = HelpMessage::new("QUIT", "", "Closes the session.");
        assert_eq!(
            message.reply().message,
            vec!["QUIT", "    Closes the session.", "End of QUIT info"]
        );
    }

    #[tokio::test]
    async fn test_help_summary_lists_sorted_commands() {
        let registry = CommandRegistry::default();
        let mut ctx = context();
        let reply = HelpCommand.execute("HELP", &mut ctx, &registry).await.unwrap();

        assert_eq!(reply.code, ReplyCode::HELP);
        assert!(reply.message[0].starts_with("This is Mailgate "));
        let listed: Vec<&str> = reply
            .message
            .iter()
            .filter_map(|line| line.strip_prefix("  "))
            .collect();
        assert_eq!(
            listed,
            vec!["AUTH", "DATA", "EHLO", "HELO", "HELP", "MAIL", "NOOP", "QUIT", "RCPT", "RSET", "STARTTLS"]
        );
        assert_eq!(reply.message.last().unwrap(), "End of HELP info");
    }

    #[tokio::test]
    async fn test_help_topic() {
        let registry = CommandRegistry::default();
        let mut ctx = context();
        let reply = HelpCommand.execute("HELP mail", &mut ctx, &registry).await.unwrap();
        assert_eq!(reply.code, ReplyCode::HELP);
        assert!(reply.message[0].starts_with("MAIL FROM:"));
    }

    #[tokio::test]
    async fn test_help_unknown_topic() {
        let registry = CommandRegistry::default();
        let mut ctx = context();
        let reply = HelpCommand.execute("HELP BOGUS", &mut ctx, &registry).await.unwrap();
        assert_eq!(reply.to_string(), "504 HELP topic \"BOGUS\" unknown");
    }
}
