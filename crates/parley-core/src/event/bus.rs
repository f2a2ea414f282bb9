//! Fan-out of conversation events from one controller to its front ends.
//!
//! The controller publishes every view change and every surfaced failure.
//! Front ends hold an [`EventSubscription`] and either await events one by
//! one or drain whatever piled up since their last command. Events
//! published while nobody is subscribed are lost, and a subscriber that
//! falls more than the configured capacity behind loses the oldest ones.

use parley_types::event::ConversationEvent;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

/// Publishing side, owned by the conversation controller.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConversationEvent>,
}

impl EventBus {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.sender.subscribe(),
            missed: 0,
        }
    }

    pub fn publish(&self, event: ConversationEvent) {
        // No subscriber is not an error.
        let _ = self.sender.send(event);
    }
}

/// One front end's view of the event stream.
#[derive(Debug)]
pub struct EventSubscription {
    rx: broadcast::Receiver<ConversationEvent>,
    missed: u64,
}

impl EventSubscription {
    /// Wait for the next event. `None` once the controller is gone.
    pub async fn recv(&mut self) -> Option<ConversationEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Everything published since the last call, oldest first.
    pub fn drain(&mut self) -> Vec<ConversationEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
            }
        }
    }

    /// Total events lost to lag over the subscription's lifetime.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn lagged(&mut self, skipped: u64) {
        self.missed += skipped;
        warn!(skipped, "conversation event subscriber lagged behind");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::conversation::MessageId;

    fn edited(id: i64) -> ConversationEvent {
        ConversationEvent::MessageEdited {
            message_id: MessageId(id),
        }
    }

    fn edited_ids(events: &[ConversationEvent]) -> Vec<i64> {
        events
            .iter()
            .filter_map(|e| match e {
                ConversationEvent::MessageEdited { message_id } => Some(message_id.0),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn recv_delivers_in_publish_order() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();

        bus.publish(edited(1));
        bus.publish(ConversationEvent::BalanceChanged { balance: 4 });

        assert!(matches!(
            events.recv().await,
            Some(ConversationEvent::MessageEdited { message_id: MessageId(1) })
        ));
        assert!(matches!(
            events.recv().await,
            Some(ConversationEvent::BalanceChanged { balance: 4 })
        ));
    }

    #[tokio::test]
    async fn recv_ends_when_bus_dropped() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        drop(bus);
        assert!(events.recv().await.is_none());
    }

    #[test]
    fn drain_returns_backlog_then_nothing() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();

        bus.publish(edited(1));
        bus.publish(edited(2));

        assert_eq!(edited_ids(&events.drain()), vec![1, 2]);
        assert!(events.drain().is_empty());
    }

    #[test]
    fn drain_skips_past_lag_and_counts_losses() {
        let bus = EventBus::new(2);
        let mut events = bus.subscribe();

        for id in 1..=5 {
            bus.publish(edited(id));
        }

        assert_eq!(edited_ids(&events.drain()), vec![4, 5]);
        assert_eq!(events.missed(), 3);
    }

    #[test]
    fn events_before_subscribe_are_not_replayed() {
        let bus = EventBus::new(8);
        bus.publish(edited(1));

        let mut events = bus.subscribe();
        bus.publish(edited(2));

        assert_eq!(edited_ids(&events.drain()), vec![2]);
    }

    #[test]
    fn zero_capacity_is_usable() {
        let bus = EventBus::new(0);
        let mut events = bus.subscribe();
        bus.publish(edited(1));
        assert_eq!(edited_ids(&events.drain()), vec![1]);
    }
}
