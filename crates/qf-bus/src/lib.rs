//! Exact-kind event bus and per-subscriber worker runtime.
//!
//! # Design
//!
//! Every event-consuming component runs behind a [`SubscriberHandle`]: an
//! unbounded FIFO queue drained by a dedicated worker thread that feeds a
//! user-supplied [`EventHandler`]. The [`EventBus`] routes each published
//! event to every handle registered for the event's exact [`EventKind`] —
//! tagged-sum dispatch, no subtype matching.
//!
//! Two synchronization primitives make deterministic replay possible:
//!
//! 1. **Per-subscriber idle barrier** — a pending counter incremented on
//!    enqueue and decremented after the handler returns (success or error).
//!    [`SubscriberHandle::wait_until_idle`] blocks until it reaches zero, so
//!    "queue empty AND nothing in-flight" is one condition.
//! 2. **System idle barrier** — [`EventBus::wait_until_system_idle`] sweeps
//!    every registered subscriber and repeats the sweep until one full pass
//!    finds all of them already idle, so cascade publishes (strategy →
//!    broker → strategy) settle within a single call.
//!
//! Handler failures are isolated: the worker forwards the error to
//! [`EventHandler::on_error`] and continues with the next event. Publishes
//! after a subscriber began shutting down are dropped and counted, never an
//! error.

mod bus;
mod subscriber;

pub use bus::EventBus;
pub use subscriber::{spawn_subscriber, EventHandler, SubscriberHandle, SubscriberId};
