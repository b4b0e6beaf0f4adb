//! Overlay bookings and blocks onto candidate slots.
//!
//! A booking occupies a candidate only when its start and end equal the
//! slot's boundaries exactly. Bookings that fit no candidate (wrong duration,
//! shifted start, outside the horizon) are ignored here.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::booking::Booking;
use crate::expander::CandidateSlot;

/// What currently sits in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Free,
    Booking,
    Blocked,
}

/// A slot as presented to the calendar. Derived on every computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SlotKind,
    pub available_seats: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
}

impl CalendarSlot {
    fn free(slot: &CandidateSlot, seats_per_time_slot: u32) -> Self {
        Self {
            start: slot.start,
            end: slot.end,
            kind: SlotKind::Free,
            available_seats: seats_per_time_slot,
            title: None,
            seats: None,
            booking_id: None,
        }
    }

    /// `holders` is non-empty and in input order.
    fn occupied(slot: &CandidateSlot, holders: &[&Booking], seats_per_time_slot: u32) -> Self {
        let (kind, shown, seats, available_seats) =
            match holders.iter().find(|b| b.is_block()) {
                Some(block) => {
                    if holders.len() > 1 {
                        warn!(
                            block = %block.id,
                            others = holders.len() - 1,
                            start = %slot.start,
                            "blocked slot also holds bookings"
                        );
                    }
                    (SlotKind::Blocked, *block, block.seats, 0)
                }
                None => {
                    let taken = holders
                        .iter()
                        .fold(0u32, |sum, b| sum.saturating_add(b.seats));
                    if taken > seats_per_time_slot {
                        warn!(
                            taken,
                            capacity = seats_per_time_slot,
                            start = %slot.start,
                            "slot is overbooked"
                        );
                    }
                    (
                        SlotKind::Booking,
                        holders[0],
                        taken,
                        seats_per_time_slot.saturating_sub(taken),
                    )
                }
            };

        Self {
            start: slot.start,
            end: slot.end,
            kind,
            available_seats,
            title: Some(shown.title.clone()),
            seats: Some(seats),
            booking_id: Some(shown.id.clone()),
        }
    }

    pub fn is_free(&self) -> bool {
        self.kind == SlotKind::Free
    }
}

/// Label each candidate as free, booked or blocked.
///
/// Only bookings whose status occupies a slot take part. Seats of every
/// booking on a slot add up; the first one in `bookings` provides the title
/// and id shown. A block wins over bookings. Free slots starting at or before
/// `now` are dropped; occupied ones are always kept.
pub fn reconcile(
    candidates: &[CandidateSlot],
    bookings: &[Booking],
    seats_per_time_slot: u32,
    now: DateTime<Utc>,
) -> Vec<CalendarSlot> {
    let mut by_slot: HashMap<(DateTime<Utc>, DateTime<Utc>), Vec<&Booking>> = HashMap::new();
    for booking in bookings.iter().filter(|b| b.occupies_slot()) {
        by_slot
            .entry((booking.start, booking.end))
            .or_default()
            .push(booking);
    }

    let grid: HashSet<(DateTime<Utc>, DateTime<Utc>)> =
        candidates.iter().map(|c| (c.start, c.end)).collect();
    let off_grid = by_slot.keys().filter(|key| !grid.contains(key)).count();
    if off_grid > 0 {
        debug!(off_grid, "bookings outside the slot grid were not placed");
    }

    candidates
        .iter()
        .filter_map(|slot| match by_slot.get(&(slot.start, slot.end)) {
            Some(holders) => Some(CalendarSlot::occupied(slot, holders, seats_per_time_slot)),
            None if slot.start > now => Some(CalendarSlot::free(slot, seats_per_time_slot)),
            None => None,
        })
        .collect()
}
