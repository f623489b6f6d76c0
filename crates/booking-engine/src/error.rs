//! Error types for booking operations.

use thiserror::Error;

/// Typed failures surfaced by the engine's primary operations.
///
/// Side-effect failures (notification dispatch, promotion attempts) are
/// never converted into one of these; they are logged and swallowed by
/// the operation that triggered them.
#[derive(Error, Debug)]
pub enum BookingError {
    /// Malformed input: inverted time range, bad slot configuration, etc.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Space or reservation absent, or a space required to be active is not.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested window overlaps another confirmed reservation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Requester is neither the owner of the record nor an admin.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Operation is invalid for the record's current status.
    #[error("Invalid state: {0}")]
    State(String),

    /// Hard persistence failure. Distinct from the business failures above.
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Convenience alias used throughout booking-engine.
pub type Result<T> = std::result::Result<T, BookingError>;
