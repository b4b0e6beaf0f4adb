//! Bookings and the booking status state machine.
//!
//! ```text
//! RESERVADO ──► CONFIRMADO ──► PAGADO
//!     │              │            │
//!     └──────────────┴────────────┴──► CANCELADO
//!
//! BLOQUEADO: entered and left only through block / unblock
//! ```
//!
//! Cancelled bookings are kept for audit history; they simply stop occupying
//! their slot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// Title carried by admin blocks in place of a customer name.
pub const BLOCKED_TITLE: &str = "BLOQUEADO";

/// Lifecycle state of a booking, serialised with its stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    #[serde(rename = "RESERVADO")]
    Reserved,
    #[serde(rename = "CONFIRMADO")]
    Confirmed,
    #[serde(rename = "PAGADO")]
    Paid,
    #[serde(rename = "CANCELADO")]
    Cancelled,
    #[serde(rename = "BLOQUEADO")]
    Blocked,
}

impl BookingStatus {
    /// The stored string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "RESERVADO",
            Self::Confirmed => "CONFIRMADO",
            Self::Paid => "PAGADO",
            Self::Cancelled => "CANCELADO",
            Self::Blocked => "BLOQUEADO",
        }
    }

    /// Whether a booking in this state holds its slot.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Validate a customer-facing status change and return the new state.
    ///
    /// Cancelling an already cancelled booking is a no-op. Blocks cannot be
    /// entered or left here; use the block/unblock admin actions.
    pub fn transition(self, to: BookingStatus) -> Result<BookingStatus> {
        use BookingStatus::*;

        let allowed = match (self, to) {
            (Blocked, _) | (_, Blocked) => false,
            (_, Cancelled) => true,
            (Reserved, Confirmed) => true,
            (Confirmed, Paid) => true,
            _ => false,
        };

        if allowed {
            Ok(to)
        } else {
            Err(SlotError::InvalidTransition(format!("{self} -> {to}")))
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RESERVADO" => Ok(Self::Reserved),
            "CONFIRMADO" => Ok(Self::Confirmed),
            "PAGADO" => Ok(Self::Paid),
            "CANCELADO" => Ok(Self::Cancelled),
            "BLOQUEADO" => Ok(Self::Blocked),
            other => Err(SlotError::InvalidBooking(format!("unknown status '{other}'"))),
        }
    }
}

/// A reservation (or admin block) on an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub event_id: String,
    /// Display title: the customer's name, or [`BLOCKED_TITLE`] for blocks.
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default = "default_seats")]
    pub seats: u32,
    pub status: BookingStatus,
}

fn default_seats() -> u32 {
    1
}

impl Booking {
    pub fn is_block(&self) -> bool {
        self.status == BookingStatus::Blocked
    }

    pub fn occupies_slot(&self) -> bool {
        self.status.occupies_slot()
    }

    /// Exact boundary match against a slot.
    pub fn matches(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start == start && self.end == end
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(SlotError::InvalidBooking(format!(
                "booking '{}' starts at or after its end",
                self.id
            )));
        }
        if self.seats == 0 {
            return Err(SlotError::InvalidBooking(format!(
                "booking '{}' takes no seats",
                self.id
            )));
        }
        Ok(())
    }
}
