//! Immutable event records flowing through the QuantFlow bus.
//!
//! # Design
//!
//! Events form a closed tagged sum ([`Event`]) with one payload struct per
//! variant. The bus dispatches on the tag ([`EventKind`]) only — exact-kind
//! matching, no subtyping. Every payload carries two nanosecond timestamps:
//!
//! - `ts_event_ns` — when the represented fact occurred (taken from the data
//!   source during replay).
//! - `ts_created_ns` — wall clock at construction.
//!
//! Events are immutable once constructed and are shared across subscriber
//! threads as `Arc<Event>`; nothing in this crate hands out mutable access
//! after construction.

pub mod market;
pub mod orders;
pub mod requests;
pub mod responses;

pub use market::{BarProcessed, BarReceived};
pub use orders::{FillEvent, OrderExpired};
pub use requests::{OrderCancellationRequest, OrderModificationRequest, OrderSubmissionRequest};
pub use responses::{
    CancellationAccepted, CancellationRejected, ModificationAccepted, ModificationRejected,
    OrderAccepted, OrderRejected,
};

/// Wall clock in nanoseconds since the Unix epoch.
///
/// Saturates instead of failing for dates beyond the representable range.
pub fn now_ns() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Discriminant of [`Event`]; the bus keys subscriptions on this tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    BarReceived,
    BarProcessed,
    OrderSubmissionRequest,
    OrderCancellationRequest,
    OrderModificationRequest,
    OrderAccepted,
    OrderRejected,
    CancellationAccepted,
    CancellationRejected,
    ModificationAccepted,
    ModificationRejected,
    Fill,
    OrderExpired,
}

impl EventKind {
    /// Every kind, in declaration order. Components that observe the whole
    /// stream (the run recorder) subscribe to this list.
    pub const ALL: [EventKind; 13] = [
        EventKind::BarReceived,
        EventKind::BarProcessed,
        EventKind::OrderSubmissionRequest,
        EventKind::OrderCancellationRequest,
        EventKind::OrderModificationRequest,
        EventKind::OrderAccepted,
        EventKind::OrderRejected,
        EventKind::CancellationAccepted,
        EventKind::CancellationRejected,
        EventKind::ModificationAccepted,
        EventKind::ModificationRejected,
        EventKind::Fill,
        EventKind::OrderExpired,
    ];

    /// The eight broker response/outcome kinds a strategy listens to.
    pub const ORDER_RESPONSES: [EventKind; 8] = [
        EventKind::OrderAccepted,
        EventKind::OrderRejected,
        EventKind::CancellationAccepted,
        EventKind::CancellationRejected,
        EventKind::ModificationAccepted,
        EventKind::ModificationRejected,
        EventKind::Fill,
        EventKind::OrderExpired,
    ];
}

/// One event on the bus.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    BarReceived(BarReceived),
    BarProcessed(BarProcessed),
    OrderSubmissionRequest(OrderSubmissionRequest),
    OrderCancellationRequest(OrderCancellationRequest),
    OrderModificationRequest(OrderModificationRequest),
    OrderAccepted(OrderAccepted),
    OrderRejected(OrderRejected),
    CancellationAccepted(CancellationAccepted),
    CancellationRejected(CancellationRejected),
    ModificationAccepted(ModificationAccepted),
    ModificationRejected(ModificationRejected),
    Fill(FillEvent),
    OrderExpired(OrderExpired),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BarReceived(_) => EventKind::BarReceived,
            Event::BarProcessed(_) => EventKind::BarProcessed,
            Event::OrderSubmissionRequest(_) => EventKind::OrderSubmissionRequest,
            Event::OrderCancellationRequest(_) => EventKind::OrderCancellationRequest,
            Event::OrderModificationRequest(_) => EventKind::OrderModificationRequest,
            Event::OrderAccepted(_) => EventKind::OrderAccepted,
            Event::OrderRejected(_) => EventKind::OrderRejected,
            Event::CancellationAccepted(_) => EventKind::CancellationAccepted,
            Event::CancellationRejected(_) => EventKind::CancellationRejected,
            Event::ModificationAccepted(_) => EventKind::ModificationAccepted,
            Event::ModificationRejected(_) => EventKind::ModificationRejected,
            Event::Fill(_) => EventKind::Fill,
            Event::OrderExpired(_) => EventKind::OrderExpired,
        }
    }

    /// `ts_event_ns` of the wrapped payload.
    pub fn ts_event_ns(&self) -> i64 {
        match self {
            Event::BarReceived(e) => e.ts_event_ns,
            Event::BarProcessed(e) => e.ts_event_ns,
            Event::OrderSubmissionRequest(e) => e.ts_event_ns,
            Event::OrderCancellationRequest(e) => e.ts_event_ns,
            Event::OrderModificationRequest(e) => e.ts_event_ns,
            Event::OrderAccepted(e) => e.ts_event_ns,
            Event::OrderRejected(e) => e.ts_event_ns,
            Event::CancellationAccepted(e) => e.ts_event_ns,
            Event::CancellationRejected(e) => e.ts_event_ns,
            Event::ModificationAccepted(e) => e.ts_event_ns,
            Event::ModificationRejected(e) => e.ts_event_ns,
            Event::Fill(e) => e.ts_event_ns,
            Event::OrderExpired(e) => e.ts_event_ns,
        }
    }
}

macro_rules! event_from {
    ($payload:ty => $variant:ident) => {
        impl From<$payload> for Event {
            fn from(p: $payload) -> Event {
                Event::$variant(p)
            }
        }
    };
}

event_from!(BarReceived => BarReceived);
event_from!(BarProcessed => BarProcessed);
event_from!(OrderSubmissionRequest => OrderSubmissionRequest);
event_from!(OrderCancellationRequest => OrderCancellationRequest);
event_from!(OrderModificationRequest => OrderModificationRequest);
event_from!(OrderAccepted => OrderAccepted);
event_from!(OrderRejected => OrderRejected);
event_from!(CancellationAccepted => CancellationAccepted);
event_from!(CancellationRejected => CancellationRejected);
event_from!(ModificationAccepted => ModificationAccepted);
event_from!(ModificationRejected => ModificationRejected);
event_from!(FillEvent => Fill);
event_from!(OrderExpired => OrderExpired);
