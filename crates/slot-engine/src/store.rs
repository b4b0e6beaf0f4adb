//! Data-access port and an in-memory implementation with the admin actions.
//!
//! The calendar only needs two reads: the event and its bookings. Anything
//! that can answer them (a database layer, a fixture file) implements
//! [`CalendarStore`]. [`InMemoryStore`] also carries the write side: booking
//! creation, status changes, and slot blocks. Creation only sells the seats a
//! slot has left, and a block needs an empty slot, so the calendar never
//! shows an overbooked slot from this store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::booking::{Booking, BookingStatus, BLOCKED_TITLE};
use crate::calendar::{compute_calendar, CalendarOptions};
use crate::error::{Result, SlotError};
use crate::event::Event;
use crate::reconciler::CalendarSlot;

/// Read access to events and their bookings.
pub trait CalendarStore {
    fn event(&self, id: &str) -> Result<Event>;

    /// Every booking of the event, cancelled ones included.
    fn bookings(&self, event_id: &str) -> Result<Vec<Booking>>;
}

/// Fetch an event and its bookings, then compute its calendar.
pub fn load_calendar<S: CalendarStore + ?Sized>(
    store: &S,
    event_id: &str,
    now: DateTime<Utc>,
    options: &CalendarOptions,
) -> Result<Vec<CalendarSlot>> {
    let event = store.event(event_id)?;
    let bookings = store.bookings(event_id)?;
    compute_calendar(&event, &bookings, now, options)
}

/// Input for [`InMemoryStore::create_booking`].
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub event_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub seats: u32,
    pub status: BookingStatus,
}

impl NewBooking {
    /// A one-seat reservation.
    pub fn new(
        event_id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            title: title.into(),
            start,
            end,
            seats: 1,
            status: BookingStatus::Reserved,
        }
    }

    #[must_use]
    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats = seats;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    events: BTreeMap<String, Event>,
    bookings: Vec<Booking>,
    next_id: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from existing records. Booking ids must be unique and
    /// every booking must belong to one of `events`.
    pub fn from_records(events: Vec<Event>, bookings: Vec<Booking>) -> Result<Self> {
        let mut store = Self::new();
        for event in events {
            store.insert_event(event)?;
        }
        for booking in bookings {
            booking.validate()?;
            if !store.events.contains_key(&booking.event_id) {
                return Err(SlotError::NotFound(format!(
                    "event '{}' of booking '{}'",
                    booking.event_id, booking.id
                )));
            }
            if store.bookings.iter().any(|b| b.id == booking.id) {
                return Err(SlotError::InvalidBooking(format!(
                    "duplicate booking id '{}'",
                    booking.id
                )));
            }
            store.bookings.push(booking);
        }
        Ok(store)
    }

    /// Add or replace an event.
    pub fn insert_event(&mut self, event: Event) -> Result<()> {
        event.validate()?;
        self.events.insert(event.id.clone(), event);
        Ok(())
    }

    /// Apply a field-level update. The event is left untouched if `update` fails.
    pub fn update_event<F>(&mut self, id: &str, update: F) -> Result<Event>
    where
        F: FnOnce(&mut Event) -> Result<()>,
    {
        let current = self
            .events
            .get(id)
            .ok_or_else(|| SlotError::NotFound(format!("event '{id}'")))?;

        let mut updated = current.clone();
        update(&mut updated)?;
        updated.validate()?;
        self.events.insert(id.to_string(), updated.clone());
        info!(event_id = id, "event updated");
        Ok(updated)
    }

    pub fn booking(&self, id: &str) -> Result<&Booking> {
        self.bookings
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| SlotError::NotFound(format!("booking '{id}'")))
    }

    /// Record a new booking.
    ///
    /// # Errors
    ///
    /// - [`SlotError::NotFound`] if the event does not exist.
    /// - [`SlotError::InvalidBooking`] for archived events, empty or inverted
    ///   intervals, zero seats, more seats than the slot holds, or a
    ///   cancelled/blocked initial status.
    /// - [`SlotError::SlotUnavailable`] if the slot is blocked or has fewer
    ///   seats left than requested.
    pub fn create_booking(&mut self, new: NewBooking) -> Result<Booking> {
        let event = self.active_event(&new.event_id)?;

        if matches!(new.status, BookingStatus::Cancelled | BookingStatus::Blocked) {
            return Err(SlotError::InvalidBooking(format!(
                "a booking cannot start as {}",
                new.status
            )));
        }
        if new.seats > event.seats_per_time_slot {
            return Err(SlotError::InvalidBooking(format!(
                "{} seats requested, slot holds {}",
                new.seats, event.seats_per_time_slot
            )));
        }

        let booking = Booking {
            id: self.allocate_id(),
            event_id: new.event_id,
            title: new.title,
            start: new.start,
            end: new.end,
            seats: new.seats,
            status: new.status,
        };
        booking.validate()?;
        self.ensure_seats(&booking, event.seats_per_time_slot)?;

        info!(booking_id = %booking.id, event_id = %booking.event_id, start = %booking.start, "booking created");
        self.bookings.push(booking.clone());
        Ok(booking)
    }

    /// Move a booking to a new status through the status state machine.
    pub fn transition_booking(&mut self, id: &str, to: BookingStatus) -> Result<Booking> {
        let booking = self.booking_mut(id)?;
        let from = booking.status;
        booking.status = from.transition(to)?;
        info!(booking_id = id, %from, %to, "booking status changed");
        Ok(booking.clone())
    }

    /// Cancel a booking. It stays in the store for history.
    pub fn cancel_booking(&mut self, id: &str) -> Result<Booking> {
        self.transition_booking(id, BookingStatus::Cancelled)
    }

    /// Block a slot so nobody can book it. The slot must hold no booking.
    pub fn block_slot(
        &mut self,
        event_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking> {
        let event = self.active_event(event_id)?;

        let block = Booking {
            id: self.allocate_id(),
            event_id: event_id.to_string(),
            title: BLOCKED_TITLE.to_string(),
            start,
            end,
            seats: event.seats_per_time_slot,
            status: BookingStatus::Blocked,
        };
        block.validate()?;
        if let Some(existing) = self.holders(&block).next() {
            return Err(SlotError::SlotUnavailable(format!(
                "{start} is held by '{}' ({})",
                existing.id, existing.status
            )));
        }

        info!(booking_id = %block.id, event_id, start = %start, "slot blocked");
        self.bookings.push(block.clone());
        Ok(block)
    }

    /// Lift a block created by [`block_slot`](Self::block_slot).
    pub fn unblock_slot(&mut self, booking_id: &str) -> Result<Booking> {
        let booking = self.booking_mut(booking_id)?;
        if !booking.is_block() {
            return Err(SlotError::InvalidTransition(format!(
                "booking '{booking_id}' is {} and not a block",
                booking.status
            )));
        }
        booking.status = BookingStatus::Cancelled;
        info!(booking_id, "slot unblocked");
        Ok(booking.clone())
    }

    fn active_event(&self, id: &str) -> Result<Event> {
        let event = self.event(id)?;
        if event.is_archived {
            return Err(SlotError::InvalidBooking(format!("event '{id}' is archived")));
        }
        Ok(event)
    }

    /// Occupying bookings on exactly the slot of `candidate`.
    fn holders<'a>(&'a self, candidate: &'a Booking) -> impl Iterator<Item = &'a Booking> + 'a {
        self.bookings.iter().filter(move |b| {
            b.event_id == candidate.event_id
                && b.occupies_slot()
                && b.matches(candidate.start, candidate.end)
        })
    }

    fn ensure_seats(&self, candidate: &Booking, capacity: u32) -> Result<()> {
        let mut taken = 0u32;
        for existing in self.holders(candidate) {
            if existing.is_block() {
                return Err(SlotError::SlotUnavailable(format!(
                    "{} is blocked by '{}'",
                    candidate.start, existing.id
                )));
            }
            taken = taken.saturating_add(existing.seats);
        }

        if taken.saturating_add(candidate.seats) > capacity {
            return Err(SlotError::SlotUnavailable(format!(
                "{} has {} of {capacity} seats left, {} requested",
                candidate.start,
                capacity.saturating_sub(taken),
                candidate.seats
            )));
        }
        Ok(())
    }

    fn booking_mut(&mut self, id: &str) -> Result<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| SlotError::NotFound(format!("booking '{id}'")))
    }

    fn allocate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("bk_{}", self.next_id);
            if !self.bookings.iter().any(|b| b.id == id) {
                return id;
            }
        }
    }
}

impl CalendarStore for InMemoryStore {
    fn event(&self, id: &str) -> Result<Event> {
        self.events
            .get(id)
            .cloned()
            .ok_or_else(|| SlotError::NotFound(format!("event '{id}'")))
    }

    fn bookings(&self, event_id: &str) -> Result<Vec<Booking>> {
        if !self.events.contains_key(event_id) {
            return Err(SlotError::NotFound(format!("event '{event_id}'")));
        }
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::WeeklyAvailability;
    use crate::reconciler::SlotKind;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn store() -> InMemoryStore {
        let availability =
            WeeklyAvailability::from_legacy(&[Some("09:00-10:00"), None, None, None, None, None, None][..])
                .unwrap();
        let event = Event::new("evt", 30, "UTC", availability)
            .unwrap()
            .with_seats(2)
            .unwrap();
        let mut store = InMemoryStore::new();
        store.insert_event(event).unwrap();
        store
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_create_and_load() {
        let mut store = store();
        let booking = store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Reserved);

        let slots = load_calendar(&store, "evt", now(), &CalendarOptions::default()).unwrap();
        assert_eq!(slots[0].kind, SlotKind::Booking);
        assert_eq!(slots[1].kind, SlotKind::Free);
    }

    #[test]
    fn test_bookings_fill_slot_up_to_capacity() {
        let mut store = store();
        store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap();
        store
            .create_booking(NewBooking::new("evt", "Pablo", at(9, 0), at(9, 30)))
            .unwrap();

        let slots = load_calendar(&store, "evt", now(), &CalendarOptions::default()).unwrap();
        assert_eq!(slots[0].seats, Some(2));
        assert_eq!(slots[0].available_seats, 0);

        let err = store
            .create_booking(NewBooking::new("evt", "Luis", at(9, 0), at(9, 30)))
            .unwrap_err();
        assert!(matches!(err, SlotError::SlotUnavailable(_)));
    }

    #[test]
    fn test_group_larger_than_remaining_seats_rejected() {
        let mut store = store();
        store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap();
        let err = store
            .create_booking(NewBooking::new("evt", "Pair", at(9, 0), at(9, 30)).with_seats(2))
            .unwrap_err();
        assert!(matches!(err, SlotError::SlotUnavailable(_)));
    }

    #[test]
    fn test_rebooking_after_cancellation() {
        let mut store = store();
        let first = store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap();
        store.cancel_booking(&first.id).unwrap();

        let second = store
            .create_booking(NewBooking::new("evt", "Pablo", at(9, 0), at(9, 30)))
            .unwrap();
        assert_ne!(first.id, second.id);

        // Cancelled booking is kept
        assert_eq!(store.bookings("evt").unwrap().len(), 2);
    }

    #[test]
    fn test_too_many_seats_rejected() {
        let mut store = store();
        let err = store
            .create_booking(NewBooking::new("evt", "Group", at(9, 0), at(9, 30)).with_seats(3))
            .unwrap_err();
        assert!(matches!(err, SlotError::InvalidBooking(_)));
    }

    #[test]
    fn test_cannot_create_blocked_booking_directly() {
        let mut store = store();
        let err = store
            .create_booking(
                NewBooking::new("evt", "x", at(9, 0), at(9, 30)).with_status(BookingStatus::Blocked),
            )
            .unwrap_err();
        assert!(matches!(err, SlotError::InvalidBooking(_)));
    }

    #[test]
    fn test_unknown_event() {
        let mut store = store();
        let err = store
            .create_booking(NewBooking::new("nope", "x", at(9, 0), at(9, 30)))
            .unwrap_err();
        assert!(matches!(err, SlotError::NotFound(_)));
        assert!(load_calendar(&store, "nope", now(), &CalendarOptions::default()).is_err());
    }

    #[test]
    fn test_status_flow() {
        let mut store = store();
        let b = store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap();
        assert!(store.transition_booking(&b.id, BookingStatus::Paid).is_err());
        store.transition_booking(&b.id, BookingStatus::Confirmed).unwrap();
        let paid = store.transition_booking(&b.id, BookingStatus::Paid).unwrap();
        assert_eq!(paid.status, BookingStatus::Paid);
        assert_eq!(store.booking(&b.id).unwrap().status, BookingStatus::Paid);
    }

    #[test]
    fn test_block_and_unblock() {
        let mut store = store();
        let block = store.block_slot("evt", at(9, 30), at(10, 0)).unwrap();
        assert_eq!(block.title, BLOCKED_TITLE);

        let slots = load_calendar(&store, "evt", now(), &CalendarOptions::default()).unwrap();
        assert_eq!(slots[1].kind, SlotKind::Blocked);

        let err = store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 30), at(10, 0)))
            .unwrap_err();
        assert!(matches!(err, SlotError::SlotUnavailable(_)));

        store.unblock_slot(&block.id).unwrap();
        let slots = load_calendar(&store, "evt", now(), &CalendarOptions::default()).unwrap();
        assert!(slots.iter().all(CalendarSlot::is_free));
    }

    #[test]
    fn test_unblock_rejects_regular_booking() {
        let mut store = store();
        let b = store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap();
        assert!(matches!(
            store.unblock_slot(&b.id).unwrap_err(),
            SlotError::InvalidTransition(_)
        ));
    }

    #[test]
    fn test_block_over_booking_rejected() {
        let mut store = store();
        store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap();
        assert!(store.block_slot("evt", at(9, 0), at(9, 30)).is_err());
    }

    #[test]
    fn test_archived_event_refuses_bookings() {
        let mut store = store();
        store
            .update_event("evt", |e| {
                e.archive();
                Ok(())
            })
            .unwrap();
        let err = store
            .create_booking(NewBooking::new("evt", "Marta", at(9, 0), at(9, 30)))
            .unwrap_err();
        assert!(matches!(err, SlotError::InvalidBooking(_)));
    }

    #[test]
    fn test_failed_update_leaves_event_untouched() {
        let mut store = store();
        assert!(store.update_event("evt", |e| e.set_duration(0)).is_err());
        assert_eq!(store.event("evt").unwrap().duration_minutes, 30);
    }

    #[test]
    fn test_from_records_rejects_orphan_booking() {
        let orphan = Booking {
            id: "b1".to_string(),
            event_id: "missing".to_string(),
            title: "x".to_string(),
            start: at(9, 0),
            end: at(9, 30),
            seats: 1,
            status: BookingStatus::Reserved,
        };
        let err = InMemoryStore::from_records(Vec::new(), vec![orphan]).unwrap_err();
        assert!(matches!(err, SlotError::NotFound(_)));
    }

    #[test]
    fn test_from_records_rejects_duplicate_ids() {
        let b = Booking {
            id: "b1".to_string(),
            event_id: "evt".to_string(),
            title: "x".to_string(),
            start: at(9, 0),
            end: at(9, 30),
            seats: 1,
            status: BookingStatus::Reserved,
        };
        let event = store().event("evt").unwrap();
        let err = InMemoryStore::from_records(vec![event], vec![b.clone(), b]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
