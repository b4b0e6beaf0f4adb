//! End-to-end calendar computation for one event.
//!
//! `compute_calendar` is stateless: every call re-derives the full slot list
//! from the event definition and its bookings. The caller supplies `now`, so
//! results are reproducible in tests.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{debug, debug_span};

use crate::availability::weekday_name;
use crate::booking::Booking;
use crate::error::Result;
use crate::event::Event;
use crate::expander::expand_slots;
use crate::reconciler::{reconcile, CalendarSlot, SlotKind};
use crate::timezone::{format_utc_offset, parse_timezone, to_zone};

/// Number of local days shown from today onwards.
pub const DEFAULT_HORIZON_DAYS: u32 = 8;

/// Options for [`compute_calendar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOptions {
    /// Local days to expand, starting with today in the event's zone.
    pub horizon_days: u32,
    /// Keep booked or blocked slots that have already started.
    pub include_past_bookings: bool,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            include_past_bookings: true,
        }
    }
}

impl CalendarOptions {
    #[must_use]
    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    #[must_use]
    pub fn with_past_bookings(mut self, include: bool) -> Self {
        self.include_past_bookings = include;
        self
    }
}

/// Compute the slot calendar of `event` as seen at `now`.
///
/// Archived events have no calendar.
///
/// # Errors
///
/// Fails if the event has an invalid duration, seat count or timezone.
pub fn compute_calendar(
    event: &Event,
    bookings: &[Booking],
    now: DateTime<Utc>,
    options: &CalendarOptions,
) -> Result<Vec<CalendarSlot>> {
    let span = debug_span!("compute_calendar", event_id = %event.id, horizon = options.horizon_days);
    let _enter = span.enter();

    event.validate()?;
    if event.is_archived {
        debug!("event is archived");
        return Ok(Vec::new());
    }

    let tz = event.tz()?;
    let today = to_zone(now, tz).date_naive();

    let candidates = expand_slots(
        &event.availability,
        event.duration_minutes,
        tz,
        today,
        options.horizon_days,
    )?;

    let own: Vec<Booking> = bookings
        .iter()
        .filter(|b| b.event_id == event.id)
        .cloned()
        .collect();

    let mut slots = reconcile(&candidates, &own, event.seats_per_time_slot, now);
    if !options.include_past_bookings {
        slots.retain(|s| s.start > now);
    }

    debug!(
        candidates = candidates.len(),
        slots = slots.len(),
        "calendar computed"
    );
    Ok(slots)
}

// ── presentation ────────────────────────────────────────────────────────────

/// A calendar slot expressed in the event's local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySlot {
    /// Local start (RFC 3339 with offset).
    pub start: String,
    /// Local end (RFC 3339 with offset).
    pub end: String,
    /// Local date (`YYYY-MM-DD`).
    pub date: String,
    /// Lower-case weekday name.
    pub weekday: &'static str,
    /// `"HH:MM-HH:MM"` wall-clock label.
    pub label: String,
    pub utc_offset: String,
    #[serde(rename = "type")]
    pub kind: SlotKind,
    pub available_seats: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Render slots in the named timezone for display.
pub fn display_calendar(slots: &[CalendarSlot], timezone: &str) -> Result<Vec<DisplaySlot>> {
    let tz = parse_timezone(timezone)?;

    Ok(slots
        .iter()
        .map(|slot| {
            let start = to_zone(slot.start, tz);
            let end = to_zone(slot.end, tz);
            DisplaySlot {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
                date: start.format("%Y-%m-%d").to_string(),
                weekday: weekday_name(start.weekday()),
                label: format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
                utc_offset: format_utc_offset(&start),
                kind: slot.kind,
                available_seats: slot.available_seats,
                title: slot.title.clone(),
            }
        })
        .collect())
}

/// Slot counts for a computed calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSummary {
    pub total: usize,
    pub free: usize,
    pub booked: usize,
    pub blocked: usize,
    /// Seats still bookable across free and partially booked slots.
    pub available_seats: u64,
}

pub fn summarize(slots: &[CalendarSlot]) -> CalendarSummary {
    slots.iter().fold(CalendarSummary::default(), |mut acc, slot| {
        acc.total += 1;
        match slot.kind {
            SlotKind::Free => acc.free += 1,
            SlotKind::Booking => acc.booked += 1,
            SlotKind::Blocked => acc.blocked += 1,
        }
        acc.available_seats += u64::from(slot.available_seats);
        acc
    })
}
