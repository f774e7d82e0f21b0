//! Channel carrying page events from host input sources to the session loop.

use super::types::PageEvent;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Bounded event channel between the host page and the page session.
///
/// Input sources (stdin reader, signal handler, replay file) hold cloned
/// senders; the session loop owns the receiving side.
#[derive(Clone)]
pub struct PageEventBus {
    sender: Sender<PageEvent>,
    receiver: Receiver<PageEvent>,
}

impl PageEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Get a sender for an input source.
    pub fn sender(&self) -> Sender<PageEvent> {
        self.sender.clone()
    }

    /// Get the receiver for page events.
    pub fn receiver(&self) -> &Receiver<PageEvent> {
        &self.receiver
    }

    /// Publish an event without blocking. Returns false when the bus is full.
    pub fn publish(&self, event: PageEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "Page event bus full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl Default for PageEventBus {
    fn default() -> Self {
        Self::new(1_024)
    }
}
