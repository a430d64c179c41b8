use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use qf_events::{Event, EventKind};

use crate::subscriber::{SubscriberHandle, SubscriberId};

#[derive(Default)]
struct Registry {
    by_kind: BTreeMap<EventKind, Vec<SubscriberHandle>>,
    all: Vec<SubscriberHandle>,
}

impl Registry {
    fn add(&mut self, kind: EventKind, handle: &SubscriberHandle) {
        let list = self.by_kind.entry(kind).or_default();
        if !list.iter().any(|h| h.id() == handle.id()) {
            list.push(handle.clone());
        }
        if !self.all.iter().any(|h| h.id() == handle.id()) {
            self.all.push(handle.clone());
        }
    }

    fn remove(&mut self, id: SubscriberId) {
        for list in self.by_kind.values_mut() {
            list.retain(|h| h.id() != id);
        }
        self.all.retain(|h| h.id() != id);
    }
}

/// Routes each published event to every subscriber registered for the
/// event's exact kind.
///
/// The registry mutex is held only to snapshot or mutate the subscriber
/// lists — never across delivery — so subscription changes during delivery
/// cannot deadlock. Registration order is preserved and determines delivery
/// order, which keeps replays deterministic.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `handle` for `kind`. Idempotent per (kind, subscriber) pair.
    pub fn subscribe(&self, kind: EventKind, handle: &SubscriberHandle) {
        self.lock().add(kind, handle);
    }

    /// Register `handle` for several kinds at once.
    pub fn subscribe_many(&self, kinds: &[EventKind], handle: &SubscriberHandle) {
        let mut registry = self.lock();
        for kind in kinds {
            registry.add(*kind, handle);
        }
    }

    /// Remove one (kind, subscriber) registration.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriberId) {
        let mut registry = self.lock();
        if let Some(list) = registry.by_kind.get_mut(&kind) {
            list.retain(|h| h.id() != id);
        }
        let still_registered = registry
            .by_kind
            .values()
            .any(|list| list.iter().any(|h| h.id() == id));
        if !still_registered {
            registry.all.retain(|h| h.id() != id);
        }
    }

    /// Remove a subscriber from every kind.
    pub fn unsubscribe_all(&self, id: SubscriberId) {
        self.lock().remove(id);
    }

    /// Publish an event to every subscriber of its kind.
    ///
    /// Never fails: the subscriber list is snapshotted under the lock, the
    /// lock is released, and delivery is a non-blocking enqueue per handle.
    /// Returns the shared event so callers can retain it.
    pub fn publish(&self, event: impl Into<Event>) -> Arc<Event> {
        let event = Arc::new(event.into());
        let snapshot: Vec<SubscriberHandle> = {
            let registry = self.lock();
            registry
                .by_kind
                .get(&event.kind())
                .map(|list| list.to_vec())
                .unwrap_or_default()
        };
        for handle in &snapshot {
            handle.receive(Arc::clone(&event));
        }
        event
    }

    /// Block until every registered subscriber has an empty queue and no
    /// in-flight handler.
    ///
    /// Sweeps all subscribers, waiting on each; repeats until one full pass
    /// observes every subscriber already idle. The fixpoint matters: a
    /// handler may publish follow-up events to subscribers the sweep already
    /// passed, and those must settle before the barrier returns.
    pub fn wait_until_system_idle(&self) {
        loop {
            let snapshot: Vec<SubscriberHandle> = self.lock().all.to_vec();
            let mut settled = true;
            for handle in &snapshot {
                if !handle.is_idle() {
                    settled = false;
                    handle.wait_until_idle();
                }
            }
            if settled {
                return;
            }
        }
    }

    /// Shut down every registered subscriber (drain, cleanup, join) and
    /// clear the registry.
    pub fn shutdown(&self) {
        let handles: Vec<SubscriberHandle> = {
            let mut registry = self.lock();
            let handles = registry.all.to_vec();
            registry.by_kind.clear();
            registry.all.clear();
            handles
        };
        for handle in handles {
            handle.shutdown();
        }
    }

    /// Number of distinct registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().all.len()
    }
}
