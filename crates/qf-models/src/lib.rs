//! Domain enums shared across the QuantFlow engine.
//!
//! Everything in this crate is a small closed vocabulary: bar periods and
//! fields, order types and sides, plotting metadata, rejection reasons, and
//! run status. The string forms returned by `as_str` are the canonical names
//! persisted by the run recorder and embedded in indicator identifiers, so
//! they are stable API.

mod actions;
mod bars;
mod orders;
mod plotting;
mod rejections;
mod run;

pub use actions::ActionType;
pub use bars::{BarField, BarPeriod};
pub use orders::{OrderType, TradeSide};
pub use plotting::{PlotColor, PlotStyle};
pub use rejections::{
    CancellationRejectionReason, ModificationRejectionReason, OrderRejectionReason,
};
pub use run::RunStatus;
