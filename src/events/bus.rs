//! Invalidation bus for broadcasting cache resets to cache owners

use super::{CacheInvalidation, CacheInvalidator};
use crate::notes::Note;
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Distributes CacheInvalidations via `tokio::sync::broadcast`
///
/// Fire-and-forget: emitting never blocks, never panics.
/// If no subscribers are connected, invalidations are silently dropped.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<CacheInvalidation>,
}

impl InvalidationBus {
    /// Create a new InvalidationBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to receive invalidations (for cache owners)
    pub fn subscribe(&self) -> broadcast::Receiver<CacheInvalidation> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl CacheInvalidator for InvalidationBus {
    fn reset_events_cache(&self, note: &Note) {
        let invalidation = CacheInvalidation::for_note(note);
        let key = invalidation.cache_key();
        if let Ok(n) = self.sender.send(invalidation) {
            debug!(cache_key = %key, subscribers = n, "Events cache reset");
        }
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
