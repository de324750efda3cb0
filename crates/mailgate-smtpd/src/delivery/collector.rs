use std::io::Read;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{DeliveryError, MessageListener};
use crate::codec::MessageReader;
use crate::context::SessionContext;

type RecipientFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// A message stored by [`MessageCollector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedMessage {
    /// Envelope sender.
    pub from: String,
    /// Envelope recipient this copy was delivered to.
    pub recipient: String,
    /// Message content.
    pub data: Vec<u8>,
}

/// Listener keeping every delivered message in memory.
///
/// Accepts all recipients unless restricted with
/// [`accept_only`](Self::accept_only). Useful for tests and small embedded
/// servers.
#[derive(Default)]
pub struct MessageCollector {
    filter: Option<RecipientFilter>,
    messages: Mutex<Vec<CollectedMessage>>,
}

impl MessageCollector {
    /// Creates a collector accepting every recipient.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts only recipients for which `filter` returns true.
    #[must_use]
    pub fn accept_only<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Returns a copy of the messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<CollectedMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the messages received so far.
    pub fn take_messages(&self) -> Vec<CollectedMessage> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl std::fmt::Debug for MessageCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCollector")
            .field("filtered", &self.filter.is_some())
            .field("messages", &self.messages())
            .finish()
    }
}

#[async_trait]
impl MessageListener for MessageCollector {
    async fn accept(&self, _session: &SessionContext, _from: &str, recipient: &str) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(recipient))
    }

    async fn deliver(
        &self,
        _session: &SessionContext,
        from: &str,
        recipient: &str,
        mut data: MessageReader<'_>,
    ) -> Result<(), DeliveryError> {
        let mut content = Vec::new();
        data.read_to_end(&mut content)?;

        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CollectedMessage {
                from: from.to_string(),
                recipient: recipient.to_string(),
                data: content,
            });
        Ok(())
    }
}
