//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Invalid availability: {0}")]
    InvalidAvailability(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid booking: {0}")]
    InvalidBooking(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, SlotError>;
