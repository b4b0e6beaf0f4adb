//! The bookable resource.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::WeeklyAvailability;
use crate::error::{Result, SlotError};
use crate::timezone::parse_timezone;

/// A bookable service definition: when it can be booked, for how long, where
/// its wall clock lives, and how many seats each slot has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Slot length in minutes.
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    /// IANA timezone the availability template is written in.
    pub timezone: String,
    pub seats_per_time_slot: u32,
    pub availability: WeeklyAvailability,
    #[serde(default)]
    pub is_archived: bool,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        duration_minutes: u32,
        timezone: impl Into<String>,
        availability: WeeklyAvailability,
    ) -> Result<Self> {
        let event = Self {
            id: id.into(),
            title: String::new(),
            duration_minutes,
            timezone: timezone.into(),
            seats_per_time_slot: 1,
            availability,
            is_archived: false,
        };
        event.validate()?;
        Ok(event)
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_seats(mut self, seats: u32) -> Result<Self> {
        self.set_seats(seats)?;
        Ok(self)
    }

    /// Check every field that the slot computation depends on.
    pub fn validate(&self) -> Result<()> {
        check_duration(self.duration_minutes)?;
        check_seats(self.seats_per_time_slot)?;
        parse_timezone(&self.timezone)?;
        Ok(())
    }

    /// The event's parsed timezone.
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    // ── field-level updates ─────────────────────────────────────────────

    pub fn set_duration(&mut self, minutes: u32) -> Result<()> {
        check_duration(minutes)?;
        self.duration_minutes = minutes;
        Ok(())
    }

    pub fn set_timezone(&mut self, timezone: &str) -> Result<()> {
        parse_timezone(timezone)?;
        self.timezone = timezone.to_string();
        Ok(())
    }

    pub fn set_seats(&mut self, seats: u32) -> Result<()> {
        check_seats(seats)?;
        self.seats_per_time_slot = seats;
        Ok(())
    }

    pub fn set_availability(&mut self, availability: WeeklyAvailability) {
        self.availability = availability;
    }

    pub fn archive(&mut self) {
        self.is_archived = true;
    }

    pub fn unarchive(&mut self) {
        self.is_archived = false;
    }
}

fn check_duration(minutes: u32) -> Result<()> {
    if minutes == 0 || minutes > 24 * 60 {
        return Err(SlotError::InvalidDuration(format!(
            "slot duration must be between 1 and 1440 minutes, got {minutes}"
        )));
    }
    Ok(())
}

fn check_seats(seats: u32) -> Result<()> {
    if seats == 0 {
        return Err(SlotError::InvalidBooking(
            "an event needs at least one seat per slot".to_string(),
        ));
    }
    Ok(())
}
