use std::collections::HashMap;

use super::{
    AuthCommand, Command, DataCommand, DataEndCommand, EhloCommand, HeloCommand, HelpCommand,
    HelpTable, MailCommand, NoopCommand, QuitCommand, RcptCommand, RsetCommand, StartTlsCommand,
};

/// Verb table shared by all connections.
///
/// Built once before the server starts; immutable afterwards.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
    help: HelpTable,
}

impl CommandRegistry {
    /// Starts a registry pre-filled with the built-in commands.
    #[must_use]
    pub fn builder() -> CommandRegistryBuilder {
        CommandRegistryBuilder::new()
    }

    /// Looks up a command by upper-case verb.
    #[must_use]
    pub fn get(&self, verb: &str) -> Option<&dyn Command> {
        self.commands.get(verb).map(AsRef::as_ref)
    }

    /// Returns true if `verb` is registered.
    #[must_use]
    pub fn contains(&self, verb: &str) -> bool {
        self.commands.contains_key(verb)
    }

    /// Help texts of the registered commands.
    #[must_use]
    pub const fn help(&self) -> &HelpTable {
        &self.help
    }

    /// Registered verbs, sorted.
    #[must_use]
    pub fn verbs(&self) -> Vec<&str> {
        let mut verbs: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        verbs.sort_unstable();
        verbs
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        CommandRegistryBuilder::new().build()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("verbs", &self.verbs())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandRegistry`].
pub struct CommandRegistryBuilder {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistryBuilder {
    /// Creates a builder holding the built-in commands.
    #[must_use]
    pub fn new() -> Self {
        Self::empty()
            .with_command(HeloCommand)
            .with_command(EhloCommand)
            .with_command(MailCommand)
            .with_command(RcptCommand)
            .with_command(DataCommand)
            .with_command(DataEndCommand)
            .with_command(RsetCommand)
            .with_command(NoopCommand)
            .with_command(QuitCommand)
            .with_command(HelpCommand)
            .with_command(AuthCommand)
            .with_command(StartTlsCommand)
    }

    /// Creates a builder without any command.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Adds a command, replacing any command with the same verb.
    #[must_use]
    pub fn with_command<C: Command + 'static>(mut self, command: C) -> Self {
        tracing::trace!(verb = command.name(), "Registering command");
        self.commands
            .insert(command.name().to_ascii_uppercase(), Box::new(command));
        self
    }

    /// Removes the command registered for `verb`.
    #[must_use]
    pub fn without_command(mut self, verb: &str) -> Self {
        self.commands.remove(&verb.to_ascii_uppercase());
        self
    }

    /// Freezes the registry and builds its help table.
    #[must_use]
    pub fn build(self) -> CommandRegistry {
        let mut help = HelpTable::default();
        for command in self.commands.values() {
            if let Some(message) = command.help() {
                help.insert(message);
            }
        }
        CommandRegistry {
            commands: self.commands,
            help,
        }
    }
}

impl Default for CommandRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::command::{HelpMessage, verbs};
    use crate::context::SmtpContext;
    use crate::types::{Reply, ReplyCode};

    struct VrfyCommand;

    #[async_trait]
    impl Command for VrfyCommand {
        fn name(&self) -> &str {
            "VRFY"
        }

        fn help(&self) -> Option<HelpMessage> {
            Some(HelpMessage::new("VRFY", "<address>", "Verifies an address."))
        }

        async fn execute(
            &self,
            _line: &str,
            _ctx: &mut SmtpContext,
            _registry: &CommandRegistry,
        ) -> crate::Result<Reply> {
            Ok(Reply::new(ReplyCode::new(252), "Cannot VRFY user"))
        }
    }

    #[test]
    fn test_builtin_verbs() {
        let registry = CommandRegistry::default();
        assert_eq!(
            registry.verbs(),
            vec![
                "AUTH", "DATA", "DATA_END", "EHLO", "HELO", "HELP", "MAIL", "NOOP", "QUIT", "RCPT",
                "RSET", "STARTTLS"
            ]
        );
        assert!(registry.contains(verbs::STARTTLS));
        assert!(registry.get("BOGUS").is_none());
    }

    #[test]
    fn test_auth_exempt_commands() {
        let registry = CommandRegistry::default();
        for verb in ["HELO", "EHLO", "AUTH", "NOOP", "QUIT", "HELP", "STARTTLS", "RSET", "DATA_END"] {
            assert!(!registry.get(verb).unwrap().auth_required(), "{verb}");
        }
        for verb in ["MAIL", "RCPT", "DATA"] {
            assert!(registry.get(verb).unwrap().auth_required(), "{verb}");
        }
    }

    #[test]
    fn test_custom_command() {
        let registry = CommandRegistry::builder()
            .with_command(VrfyCommand)
            .without_command(verbs::STARTTLS)
            .build();

        assert!(registry.contains("VRFY"));
        assert!(!registry.contains(verbs::STARTTLS));
        assert!(registry.help().get("vrfy").is_some());
        assert!(registry.help().get(verbs::STARTTLS).is_none());
    }

    #[test]
    fn test_data_end_has_no_help() {
        let registry = CommandRegistry::default();
        assert!(registry.help().get(verbs::DATA_END).is_none());
    }
}
