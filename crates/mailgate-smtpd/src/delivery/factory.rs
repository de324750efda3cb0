use std::sync::{Arc, PoisonError, RwLock};

use super::{DefaultDeliveryHandler, DeliveryHandler, MessageListener};

type CustomFactory = Box<dyn Fn(Vec<Arc<dyn MessageListener>>) -> Box<dyn DeliveryHandler> + Send + Sync>;

/// Creates one [`DeliveryHandler`] per connection.
///
/// Holds the listener list shared by all connections. Listeners may be added
/// or removed while the server runs; each new connection sees the list as it
/// is when the connection is accepted.
#[derive(Default)]
pub struct DeliveryHandlerFactory {
    listeners: RwLock<Vec<Arc<dyn MessageListener>>>,
    custom: Option<CustomFactory>,
}

impl DeliveryHandlerFactory {
    /// Creates a factory producing [`DefaultDeliveryHandler`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory producing handlers from `factory`.
    ///
    /// The closure receives a snapshot of the registered listeners.
    #[must_use]
    pub fn with_handler<F>(factory: F) -> Self
    where
        F: Fn(Vec<Arc<dyn MessageListener>>) -> Box<dyn DeliveryHandler> + Send + Sync + 'static,
    {
        Self {
            listeners: RwLock::default(),
            custom: Some(Box::new(factory)),
        }
    }

    /// Registers a listener.
    pub fn add_listener(&self, listener: Arc<dyn MessageListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Unregisters a listener, returning true if it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn MessageListener>) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|registered| !Arc::ptr_eq(registered, listener));
        listeners.len() != before
    }

    /// Returns a snapshot of the registered listeners.
    #[must_use]
    pub fn listeners(&self) -> Vec<Arc<dyn MessageListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Creates the handler for a new connection.
    #[must_use]
    pub fn create(&self) -> Box<dyn DeliveryHandler> {
        let listeners = self.listeners();
        match &self.custom {
            Some(factory) => factory(listeners),
            None => Box::new(DefaultDeliveryHandler::new(listeners)),
        }
    }
}

impl std::fmt::Debug for DeliveryHandlerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryHandlerFactory")
            .field("listeners", &self.listeners().len())
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::context::SessionContext;
    use crate::delivery::MessageCollector;

    #[test]
    fn test_add_and_remove() {
        let factory = DeliveryHandlerFactory::new();
        let listener: Arc<dyn MessageListener> = Arc::new(MessageCollector::new());

        factory.add_listener(Arc::clone(&listener));
        assert_eq!(factory.listeners().len(), 1);

        assert!(factory.remove_listener(&listener));
        assert!(factory.listeners().is_empty());
        assert!(!factory.remove_listener(&listener));
    }

    #[tokio::test]
    async fn test_handler_sees_registered_listeners() {
        let factory = DeliveryHandlerFactory::new();
        factory.add_listener(Arc::new(MessageCollector::new()));

        let mut handler = factory.create();
        let session = SessionContext::default();
        handler.sender(&session, "x@y").await.unwrap();
        assert!(handler.recipient(&session, "a@b").await.is_ok());
    }

    #[test]
    fn test_custom_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let factory = DeliveryHandlerFactory::with_handler(move |listeners| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(DefaultDeliveryHandler::new(listeners))
        });

        let _ = factory.create();
        let _ = factory.create();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
