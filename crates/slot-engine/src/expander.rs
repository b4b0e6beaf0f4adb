//! Weekly availability → concrete candidate slots.
//!
//! For each local date in the horizon, every availability range of that
//! weekday is cut into back-to-back slots of the event's duration, starting at
//! the range start. A slot that would run past the range end is not emitted.
//!
//! Slot boundaries are wall-clock times in the event's zone, converted to UTC.
//! On DST transition days a slot is skipped when either boundary does not exist
//! on the local clock, or when its real length differs from the configured
//! duration (the slot straddles the transition). Ambiguous boundaries resolve
//! to the earlier instant.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::availability::WeeklyAvailability;
use crate::error::{Result, SlotError};
use crate::timezone::{resolve_local, to_utc};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Longest horizon [`expand_slots`] accepts, in days.
pub const MAX_HORIZON_DAYS: u32 = 366;

/// A candidate slot before bookings are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Expand `availability` into candidate slots over `horizon_days` local dates
/// starting at `first_day`.
///
/// The result is sorted by start and free of duplicates. Past slots are not
/// removed here.
///
/// # Errors
///
/// Returns [`SlotError::InvalidDuration`] if `duration_minutes` is not in
/// `1..=1440` or `horizon_days` exceeds [`MAX_HORIZON_DAYS`].
pub fn expand_slots(
    availability: &WeeklyAvailability,
    duration_minutes: u32,
    tz: Tz,
    first_day: NaiveDate,
    horizon_days: u32,
) -> Result<Vec<CandidateSlot>> {
    if duration_minutes == 0 || duration_minutes > MINUTES_PER_DAY {
        return Err(SlotError::InvalidDuration(format!(
            "slot duration must be between 1 and {MINUTES_PER_DAY} minutes, got {duration_minutes}"
        )));
    }
    if horizon_days > MAX_HORIZON_DAYS {
        return Err(SlotError::InvalidDuration(format!(
            "horizon of {horizon_days} days exceeds {MAX_HORIZON_DAYS}"
        )));
    }

    let expected = chrono::Duration::minutes(i64::from(duration_minutes));
    let mut slots = Vec::new();
    let mut skipped = 0usize;

    for offset in 0..horizon_days {
        let Some(date) = first_day.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };

        for range in availability.day(date.weekday()) {
            let range_end = u32::from(range.end_minute());
            let mut cursor = u32::from(range.start_minute());

            while cursor + duration_minutes <= range_end {
                match slot_at(date, cursor, duration_minutes, tz) {
                    Some(slot) if slot.end - slot.start == expected => slots.push(slot),
                    _ => skipped += 1,
                }
                cursor += duration_minutes;
            }
        }
    }

    slots.sort();
    slots.dedup();

    if skipped > 0 {
        debug!(
            skipped,
            timezone = tz.name(),
            "skipped slots crossing a DST transition"
        );
    }

    Ok(slots)
}

/// Build the slot `[start_minute, start_minute + len)` on `date` in `tz`.
fn slot_at(date: NaiveDate, start_minute: u32, len: u32, tz: Tz) -> Option<CandidateSlot> {
    let start = resolve_local(wall_clock(date, start_minute)?, tz)?;
    let end = resolve_local(wall_clock(date, start_minute + len)?, tz)?;
    Some(CandidateSlot {
        start: to_utc(start),
        end: to_utc(end),
    })
}

/// Local datetime `minute` minutes after midnight of `date`. 1440 rolls to the
/// next day's midnight.
fn wall_clock(date: NaiveDate, minute: u32) -> Option<NaiveDateTime> {
    let day = date.checked_add_days(Days::new(u64::from(minute / MINUTES_PER_DAY)))?;
    let minute = minute % MINUTES_PER_DAY;
    let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)?;
    Some(day.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::TimeRange;
    use crate::timezone::parse_timezone;
    use chrono::{TimeZone, Weekday};

    /// Monday 2026-03-02.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn week(day: Weekday, ranges: &[&str]) -> WeeklyAvailability {
        WeeklyAvailability::new()
            .with_day(
                day,
                ranges.iter().map(|r| TimeRange::parse(r).unwrap()).collect(),
            )
            .unwrap()
    }

    #[test]
    fn test_one_hour_range_thirty_minute_slots() {
        let slots = expand_slots(
            &week(Weekday::Mon, &["09:00-10:00"]),
            30,
            chrono_tz::UTC,
            monday(),
            1,
        )
        .unwrap();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        assert_eq!(slots[0].end, Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
        assert_eq!(slots[1].start, Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
        assert_eq!(slots[1].end, Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_no_partial_slots() {
        let slots = expand_slots(
            &week(Weekday::Mon, &["09:00-10:00"]),
            45,
            chrono_tz::UTC,
            monday(),
            1,
        )
        .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].end, Utc.with_ymd_and_hms(2026, 3, 2, 9, 45, 0).unwrap());
    }

    #[test]
    fn test_day_without_availability_has_no_slots() {
        // Tuesday-only template, one-day horizon on a Monday
        let slots = expand_slots(
            &week(Weekday::Tue, &["09:00-17:00"]),
            30,
            chrono_tz::UTC,
            monday(),
            1,
        )
        .unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_eight_day_horizon_includes_weekday_twice() {
        let slots = expand_slots(
            &week(Weekday::Mon, &["09:00-10:00"]),
            60,
            chrono_tz::UTC,
            monday(),
            8,
        )
        .unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].start, Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_multiple_ranges_are_ordered() {
        let slots = expand_slots(
            &week(Weekday::Mon, &["14:00-15:00", "09:00-10:00"]),
            60,
            chrono_tz::UTC,
            monday(),
            1,
        )
        .unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots[0].start < slots[1].start);
    }

    #[test]
    fn test_wall_clock_interpreted_in_event_zone() {
        // 09:00 in Madrid during CET is 08:00 UTC
        let tz = parse_timezone("Europe/Madrid").unwrap();
        let slots =
            expand_slots(&week(Weekday::Mon, &["09:00-10:00"]), 60, tz, monday(), 1).unwrap();
        assert_eq!(slots[0].start, Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_range_until_midnight() {
        let slots = expand_slots(
            &week(Weekday::Mon, &["23:00-24:00"]),
            30,
            chrono_tz::UTC,
            monday(),
            1,
        )
        .unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end, Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_spring_forward_skips_missing_hour() {
        // Berlin, Sunday 2026-03-29: 02:00 → 03:00
        let tz = parse_timezone("Europe/Berlin").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();
        let slots =
            expand_slots(&week(Weekday::Sun, &["00:00-24:00"]), 60, tz, day, 1).unwrap();

        // 01:00-02:00 ends on a missing time, 02:00-03:00 starts on one
        assert_eq!(slots.len(), 22);
        assert!(slots
            .iter()
            .all(|s| s.end - s.start == chrono::Duration::minutes(60)));
    }

    #[test]
    fn test_fall_back_skips_stretched_slot() {
        // Berlin, Sunday 2026-10-25: 03:00 → 02:00
        let tz = parse_timezone("Europe/Berlin").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let slots =
            expand_slots(&week(Weekday::Sun, &["00:00-24:00"]), 60, tz, day, 1).unwrap();

        // 02:00-03:00 would last two real hours
        assert_eq!(slots.len(), 23);
        assert!(slots
            .iter()
            .all(|s| s.end - s.start == chrono::Duration::minutes(60)));
    }

    #[test]
    fn test_zero_duration_is_error() {
        let err = expand_slots(
            &week(Weekday::Mon, &["09:00-10:00"]),
            0,
            chrono_tz::UTC,
            monday(),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, SlotError::InvalidDuration(_)));
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let slots = expand_slots(
            &week(Weekday::Mon, &["09:00-10:00"]),
            30,
            chrono_tz::UTC,
            monday(),
            0,
        )
        .unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_oversized_duration_is_error() {
        let availability = week(Weekday::Mon, &["00:00-24:00"]);
        for duration in [1441, u32::MAX] {
            let err = expand_slots(&availability, duration, chrono_tz::UTC, monday(), 1)
                .unwrap_err();
            assert!(matches!(err, SlotError::InvalidDuration(_)), "{duration}");
        }

        // A whole day is still one slot
        let slots = expand_slots(&availability, 1440, chrono_tz::UTC, monday(), 1).unwrap();
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn test_horizon_is_capped() {
        let availability = week(Weekday::Mon, &["09:00-10:00"]);
        let err = expand_slots(&availability, 30, chrono_tz::UTC, monday(), u32::MAX)
            .unwrap_err();
        assert!(matches!(err, SlotError::InvalidDuration(_)));

        let slots =
            expand_slots(&availability, 30, chrono_tz::UTC, monday(), MAX_HORIZON_DAYS).unwrap();
        assert_eq!(slots.len(), 2 * 53);
    }
}
