use thiserror::Error;
use uuid::Uuid;

use crate::domain::BookingStatus;

/// Error taxonomy for the booking and promotion core.
///
/// Configuration errors (the `Unknown*` variants) mean the caller named an
/// entity that does not exist. `SlotUnavailable`, `CapacityExceeded` and
/// `NotEligible` are recoverable denials. Storage failures always mean the
/// operation was not applied.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("unknown campaign {0}")]
    UnknownCampaign(Uuid),

    #[error("unknown coupon {0}")]
    UnknownCoupon(Uuid),

    #[error("unknown booking {0}")]
    UnknownBooking(Uuid),

    #[error("field `{field}` has no free slot at {start_minutes}+{duration_minutes}m")]
    SlotUnavailable {
        field: String,
        start_minutes: i32,
        duration_minutes: i32,
    },

    #[error("campaign {0} has no redemptions left")]
    CapacityExceeded(Uuid),

    #[error("coupon not eligible: {0}")]
    NotEligible(&'static str),

    #[error("booking is {from}, cannot become {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
