//! # slot-engine
//!
//! Deterministic booking slot computation.
//!
//! Turns an event's weekly availability template into concrete time slots
//! over a short horizon, overlays bookings and admin blocks, reports remaining
//! seats, and converts between stored UTC instants and the event's IANA
//! timezone. Every function takes `now` explicitly; nothing reads the system
//! clock.
//!
//! ## Modules
//!
//! - [`availability`] — Weekly availability templates (typed + legacy `"HH:MM-HH:MM"` form)
//! - [`expander`] — Availability → candidate slots over the horizon
//! - [`reconciler`] — Overlay bookings and blocks onto candidate slots
//! - [`timezone`] — UTC ↔ IANA zone conversion
//! - [`booking`] — Bookings and the status state machine
//! - [`event`] — The bookable resource
//! - [`calendar`] — End-to-end computation, display projection, summaries
//! - [`store`] — Data-access port, in-memory store, admin actions
//! - [`error`] — Error types

pub mod availability;
pub mod booking;
pub mod calendar;
pub mod error;
pub mod event;
pub mod expander;
pub mod reconciler;
pub mod store;
pub mod timezone;

pub use availability::{TimeRange, WeeklyAvailability};
pub use booking::{Booking, BookingStatus, BLOCKED_TITLE};
pub use calendar::{
    compute_calendar, display_calendar, summarize, CalendarOptions, CalendarSummary, DisplaySlot,
    DEFAULT_HORIZON_DAYS,
};
pub use error::SlotError;
pub use event::Event;
pub use expander::{expand_slots, CandidateSlot, MAX_HORIZON_DAYS};
pub use reconciler::{reconcile, CalendarSlot, SlotKind};
pub use store::{load_calendar, CalendarStore, InMemoryStore, NewBooking};
pub use timezone::{
    convert_instant, local_to_utc, parse_rfc3339, parse_timezone, to_utc, to_zone, LocalInstant,
};
