use serde::{Deserialize, Serialize};

/// Canonical reason codes for rejected order submissions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderRejectionReason {
    NonPositiveQuantity,
    MissingLimitPrice,
    MissingStopPrice,
    NonPositiveLimitPrice,
    NonPositiveStopPrice,
    Unknown,
}

impl OrderRejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderRejectionReason::NonPositiveQuantity => "NON_POSITIVE_QUANTITY",
            OrderRejectionReason::MissingLimitPrice => "MISSING_LIMIT_PRICE",
            OrderRejectionReason::MissingStopPrice => "MISSING_STOP_PRICE",
            OrderRejectionReason::NonPositiveLimitPrice => "NON_POSITIVE_LIMIT_PRICE",
            OrderRejectionReason::NonPositiveStopPrice => "NON_POSITIVE_STOP_PRICE",
            OrderRejectionReason::Unknown => "UNKNOWN",
        }
    }
}

/// Canonical reason codes for rejected order modifications.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationRejectionReason {
    UnknownOrder,
    NonPositiveQuantity,
    NonPositiveLimitPrice,
    NonPositiveStopPrice,
    Unknown,
}

impl ModificationRejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModificationRejectionReason::UnknownOrder => "UNKNOWN_ORDER",
            ModificationRejectionReason::NonPositiveQuantity => "NON_POSITIVE_QUANTITY",
            ModificationRejectionReason::NonPositiveLimitPrice => "NON_POSITIVE_LIMIT_PRICE",
            ModificationRejectionReason::NonPositiveStopPrice => "NON_POSITIVE_STOP_PRICE",
            ModificationRejectionReason::Unknown => "UNKNOWN",
        }
    }
}

/// Canonical reason codes for rejected order cancellations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationRejectionReason {
    UnknownOrder,
    Unknown,
}

impl CancellationRejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationRejectionReason::UnknownOrder => "UNKNOWN_ORDER",
            CancellationRejectionReason::Unknown => "UNKNOWN",
        }
    }
}
