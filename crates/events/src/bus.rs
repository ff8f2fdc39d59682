//! In-process publish/subscribe for transaction events

use crate::event::{Event, EventKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Fans each published event out to every subscriber of its kind
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<HashMap<EventKind, Vec<mpsc::UnboundedSender<Event>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event
    pub fn subscribe(&self, kind: EventKind) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions.lock().entry(kind).or_default().push(tx);
        rx
    }

    /// Subscribe to several kinds on one channel
    pub fn subscribe_all(&self, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subs = self.subscriptions.lock();
        for kind in kinds {
            subs.entry(*kind).or_default().push(tx.clone());
        }
        rx
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let subs = self.subscriptions.lock();

        let Some(subscribers) = subs.get(&event.kind()) else {
            tracing::trace!("No subscribers for {:?} event of {}", event.kind(), event.id());
            return;
        };
        for sub in subscribers {
            let _ = sub.send(event.clone());
        }
    }

    /// Drop subscriptions whose receivers are gone
    pub fn cleanup(&self) {
        let mut subs = self.subscriptions.lock();
        for subscribers in subs.values_mut() {
            subscribers.retain(|s| !s.is_closed());
        }
        subs.retain(|_, subscribers| !subscribers.is_empty());
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions.lock().get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CompleteEvent, ResultEvent};
    use ordo_common::{Outcome, Term, TransactionId};

    #[tokio::test]
    async fn test_subscribers_only_get_their_kind() {
        let bus = EventBus::new();
        let mut completes = bus.subscribe(EventKind::Complete);
        let mut everything = bus.subscribe_all(&[EventKind::Result, EventKind::Complete]);

        bus.publish(ResultEvent {
            id: TransactionId::from("tx"),
            vm_result: Outcome::Success(Term::nil()),
        });
        bus.publish(CompleteEvent {
            id: TransactionId::from("tx"),
            outcome: Outcome::Success(Term::nil()),
        });

        assert_eq!(completes.recv().await.unwrap().kind(), EventKind::Complete);
        assert!(completes.try_recv().is_err());

        assert_eq!(everything.recv().await.unwrap().kind(), EventKind::Result);
        assert_eq!(everything.recv().await.unwrap().kind(), EventKind::Complete);
    }

    #[test]
    fn test_cleanup_drops_closed_receivers() {
        let bus = EventBus::new();
        let kept = bus.subscribe(EventKind::Result);
        drop(bus.subscribe(EventKind::Result));
        drop(bus.subscribe(EventKind::Nullifiers));

        bus.cleanup();
        assert_eq!(bus.subscriber_count(EventKind::Result), 1);
        assert_eq!(bus.subscriber_count(EventKind::Nullifiers), 0);
        drop(kept);
    }
}
