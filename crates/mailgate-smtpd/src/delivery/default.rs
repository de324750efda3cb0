use std::sync::Arc;

use async_trait::async_trait;

use super::{DeliveryError, DeliveryHandler, MessageListener, Rejection};
use crate::codec::MessageData;
use crate::context::SessionContext;
use crate::types::ReplyCode;

/// A recipient accepted by one listener.
struct Delivery {
    listener: Arc<dyn MessageListener>,
    recipient: String,
}

/// Delivery handler that fans messages out to listeners.
///
/// Every listener accepting a recipient gets its own delivery of the
/// message for that recipient. A recipient nobody accepts is refused with
/// `553`.
pub struct DefaultDeliveryHandler {
    listeners: Vec<Arc<dyn MessageListener>>,
    from: Option<String>,
    deliveries: Vec<Delivery>,
}

impl DefaultDeliveryHandler {
    /// Creates a handler over a snapshot of `listeners`.
    #[must_use]
    pub fn new(listeners: Vec<Arc<dyn MessageListener>>) -> Self {
        Self {
            listeners,
            from: None,
            deliveries: Vec::new(),
        }
    }

    /// Number of recipient bindings in the current transaction.
    #[must_use]
    pub fn delivery_count(&self) -> usize {
        self.deliveries.len()
    }
}

impl std::fmt::Debug for DefaultDeliveryHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultDeliveryHandler")
            .field("listeners", &self.listeners.len())
            .field("from", &self.from)
            .field("deliveries", &self.deliveries.len())
            .finish()
    }
}

#[async_trait]
impl DeliveryHandler for DefaultDeliveryHandler {
    async fn sender(&mut self, _session: &SessionContext, from: &str) -> Result<(), Rejection> {
        self.from = Some(from.to_string());
        Ok(())
    }

    async fn recipient(
        &mut self,
        session: &SessionContext,
        recipient: &str,
    ) -> Result<(), Rejection> {
        let from = self.from.as_deref().unwrap_or_default();
        let mut accepted = false;

        for listener in &self.listeners {
            if listener.accept(session, from, recipient).await {
                self.deliveries.push(Delivery {
                    listener: Arc::clone(listener),
                    recipient: recipient.to_string(),
                });
                accepted = true;
            }
        }

        if accepted {
            Ok(())
        } else {
            Err(Rejection::new(
                ReplyCode::MAILBOX_NAME_INVALID,
                format!("<{recipient}> address unknown."),
            ))
        }
    }

    async fn data(
        &mut self,
        session: &SessionContext,
        data: &MessageData,
    ) -> Result<(), DeliveryError> {
        let from = self.from.as_deref().unwrap_or_default();

        for delivery in &self.deliveries {
            tracing::debug!(
                from = %from,
                recipient = %delivery.recipient,
                size = data.len(),
                "Delivering message"
            );
            delivery
                .listener
                .deliver(session, from, &delivery.recipient, data.reader())
                .await?;
        }
        Ok(())
    }

    fn reset_message_state(&mut self) {
        self.from = None;
        self.deliveries.clear();
    }
}
