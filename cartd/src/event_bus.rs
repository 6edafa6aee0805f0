//! Event bus for cart observers.
//!
//! The event bus lets observers follow the cart without polling:
//! - Manager → UI (replacement cart states)
//! - Hydration → integrator (startup outcome)
//! - Snapshot writer → integrator (persist successes and failures)
//!
//! Uses tokio broadcast channels for fan-out to multiple receivers.

use std::sync::Arc;

use cart_domain::{CartState, Mutation};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

// =============================================================================
// Event Types
// =============================================================================

/// Events that flow through the cart event bus.
#[derive(Debug, Clone)]
pub enum CartEvent {
    /// Startup hydration finished
    Hydrated {
        /// The cart hydration installed
        state: Arc<CartState>,
        /// Items in the cart after hydration
        items: usize,
        /// Early mutations replayed on top of the snapshot
        replayed: usize,
        /// Early mutations discarded by an overwriting hydration
        discarded: usize,
    },

    /// Startup hydration could not read the snapshot
    HydrationFailed {
        /// What went wrong
        error: String,
    },

    /// A mutation produced a new cart
    Changed {
        /// Revision of the new state
        revision: u64,
        /// Product the mutation targeted
        product_id: String,
        /// What the mutation did
        mutation: Mutation,
        /// The replacement cart
        state: Arc<CartState>,
        /// When the mutation happened
        timestamp: DateTime<Utc>,
    },

    /// A snapshot write completed
    Persisted {
        /// Revision that was written
        revision: u64,
        /// Store calls it took
        attempts: u32,
    },

    /// A snapshot write failed under the `Propagate` policy
    PersistFailed {
        /// Revision that was not written
        revision: u64,
        /// What went wrong
        error: String,
    },
}

// =============================================================================
// Event Bus
// =============================================================================

/// Event bus for cart-wide notifications.
///
/// Multiple producers can send events, and multiple consumers can receive.
/// Uses broadcast channels for fan-out pattern.
pub struct EventBus {
    sender: broadcast::Sender<CartEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity.
    ///
    /// Capacity determines how many events can be buffered before
    /// slow receivers start missing events (lagging).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// Returns 0 if there are no active receivers.
    pub fn send(&self, event: CartEvent) -> usize {
        // send() returns Err if there are no receivers, but we don't care
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events.
    ///
    /// Returns a receiver that will receive all events sent after subscription.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Receiver for cart events.
pub struct EventReceiver {
    receiver: broadcast::Receiver<CartEvent>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the sender has been dropped.
    /// Returns error description if the receiver lagged (missed events).
    pub async fn recv(&mut self) -> Option<Result<CartEvent, String>> {
        match self.receiver.recv().await {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            }
        }
    }

    /// Try to receive an event without blocking.
    ///
    /// Returns `None` if no event is immediately available.
    pub fn try_recv(&mut self) -> Option<Result<CartEvent, String>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Closed) => None,
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_send_recv() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.send(CartEvent::Persisted { revision: 3, attempts: 1 });

        match receiver.recv().await.unwrap().unwrap() {
            CartEvent::Persisted { revision, attempts } => {
                assert_eq!(revision, 3);
                assert_eq!(attempts, 1);
            }
            other => panic!("Expected Persisted event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_event_bus_multiple_receivers() {
        let bus = EventBus::new(10);
        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();

        assert_eq!(bus.receiver_count(), 2);

        bus.send(CartEvent::Hydrated {
            state: Arc::new(CartState::empty()),
            items: 0,
            replayed: 0,
            discarded: 0,
        });

        let event1 = receiver1.recv().await.unwrap().unwrap();
        let event2 = receiver2.recv().await.unwrap().unwrap();

        assert!(matches!(event1, CartEvent::Hydrated { items: 0, .. }));
        assert!(matches!(event2, CartEvent::Hydrated { items: 0, .. }));
    }

    #[tokio::test]
    async fn test_event_bus_no_receivers() {
        let bus = EventBus::new(10);

        let count = bus.send(CartEvent::HydrationFailed { error: "boom".to_string() });
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_receiver_reports_lag() {
        let bus = EventBus::new(1);
        let mut receiver = bus.subscribe();

        bus.send(CartEvent::Persisted { revision: 1, attempts: 1 });
        bus.send(CartEvent::Persisted { revision: 2, attempts: 1 });

        assert!(receiver.recv().await.unwrap().is_err());
    }

    #[test]
    fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        assert!(receiver.try_recv().is_none());
    }
}
