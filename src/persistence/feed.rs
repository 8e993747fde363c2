//! Signal ledger feed
//!
//! Broadcast channel carrying every signal insert and terminal update, so
//! the engine hears about externally persisted records (webhook path)
//! without polling. Publishing never blocks; subscribers that lag simply
//! miss events and catch up on the next slow-loop refresh.

use tokio::sync::broadcast;

use crate::domain::entities::signal::Signal;

#[derive(Debug, Clone)]
pub enum SignalEvent {
    Inserted(Signal),
    Updated(Signal),
}

#[derive(Debug, Clone)]
pub struct SignalFeed {
    tx: broadcast::Sender<SignalEvent>,
}

impl SignalFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget; a send with no subscribers is fine.
    pub(crate) fn publish(&self, event: SignalEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for SignalFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::signal::{SignalAction, SignalSource};

    #[tokio::test]
    async fn test_subscriber_receives_published_events() {
        let feed = SignalFeed::default();
        let mut rx = feed.subscribe();
        let signal = Signal::pending("EURUSD", SignalAction::Buy, 0.1, SignalSource::External);
        feed.publish(SignalEvent::Inserted(signal.clone()));
        match rx.recv().await.unwrap() {
            SignalEvent::Inserted(received) => assert_eq!(received.id, signal.id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let feed = SignalFeed::default();
        let signal = Signal::pending("EURUSD", SignalAction::Sell, 0.1, SignalSource::Manual);
        feed.publish(SignalEvent::Inserted(signal));
    }
}
