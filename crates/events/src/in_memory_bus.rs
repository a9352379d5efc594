//! In-memory event bus for tests, dev and single-process hosts.

use std::sync::{Mutex, PoisonError, mpsc};

use crate::bus::{EventBus, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

impl<T> From<PoisonError<T>> for InMemoryBusError {
    fn from(_: PoisonError<T>) -> Self {
        InMemoryBusError::Poisoned
    }
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Fan-out to every live subscriber; dead subscribers are pruned on publish
/// - A `recording` bus also keeps an append-only log of everything published, exposed
///   through `published()`
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
    log: Mutex<Vec<M>>,
    record: bool,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus that keeps every published message. The log is never trimmed.
    pub fn recording() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.len())
            .unwrap_or_default()
    }
}

impl<M: Clone> InMemoryEventBus<M> {
    /// Every message published so far, oldest first. Always empty unless `recording`.
    pub fn published(&self) -> Vec<M> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            record: false,
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self.subscribers.lock()?;
        subs.retain(|tx| tx.send(message.clone()).is_ok());

        if self.record {
            self.log.lock()?.push(message);
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just never receives anything.
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => tracing::warn!("event bus lock poisoned; subscription will stay empty"),
        }

        Subscription::new(rx)
    }
}
