//! Typed publish/subscribe over crossbeam channels.
//!
//! Each subscriber gets its own receiver. `publish` delivers synchronously to
//! every live subscriber; subscribers whose receiver was dropped are pruned.

use std::collections::HashMap;

use crossbeam::channel::{self, Receiver, Sender};

pub type SubscriberId = u64;

#[derive(Debug)]
pub struct EventBus<T> {
    subscribers: HashMap<SubscriberId, Sender<T>>,
    next_id: SubscriberId,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            subscribers: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> (SubscriberId, Receiver<T>) {
        let (tx, rx) = channel::unbounded();
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: &T) {
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_to_every_subscriber() {
        let mut bus = EventBus::new();
        let (_, a) = bus.subscribe();
        let (_, b) = bus.subscribe();
        bus.publish(&7u32);
        assert_eq!(a.try_recv(), Ok(7));
        assert_eq!(b.try_recv(), Ok(7));
    }

    #[test]
    fn prunes_dropped_receivers() {
        let mut bus = EventBus::new();
        let (_, a) = bus.subscribe();
        let (id, b) = bus.subscribe();
        drop(a);
        bus.publish(&1u32);
        assert_eq!(bus.subscriber_count(), 1);
        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(b.try_recv().is_ok());
    }
}
