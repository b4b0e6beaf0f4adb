//! Weekly availability templates.
//!
//! A [`WeeklyAvailability`] holds, for each ISO weekday (Monday first), an
//! ordered list of non-overlapping wall-clock [`TimeRange`]s. Values are
//! interpreted in the owning event's timezone; this module knows nothing about
//! zones or instants.
//!
//! Two input shapes are accepted:
//!
//! - **Named**: `{"monday": [{"start": "09:00", "end": "12:00"}], ...}`. Days
//!   missing from the map are unavailable.
//! - **Legacy**: exactly seven positional strings, index 0 = Monday, each
//!   holding zero or more `"HH:MM-HH:MM"` ranges separated by `,`. An empty or
//!   `null` entry means the day is unavailable.
//!
//! Both shapes are validated on construction. Malformed input is an error,
//! never an empty day.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

const MINUTES_PER_DAY: u16 = 24 * 60;

/// All weekdays in ISO order (Monday = index 0).
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Lower-case English name of a weekday, as used in the named representation.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

// ── TimeRange ───────────────────────────────────────────────────────────────

/// A wall-clock range within one day, stored as minutes after midnight.
///
/// `end` may be `24:00` (1440) to mean "until the end of the day".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct TimeRange {
    start: u16,
    end: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRange {
    start: String,
    end: String,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = SlotError;

    fn try_from(raw: RawRange) -> Result<Self> {
        let start = parse_clock(&raw.start, false)?;
        let end = parse_clock(&raw.end, true)?;
        TimeRange::new(start, end)
    }
}

impl From<TimeRange> for RawRange {
    fn from(range: TimeRange) -> Self {
        RawRange {
            start: format_clock(range.start),
            end: format_clock(range.end),
        }
    }
}

impl TimeRange {
    /// Build a range from minute offsets. Requires `start < end <= 1440`.
    pub fn new(start_minute: u16, end_minute: u16) -> Result<Self> {
        if end_minute > MINUTES_PER_DAY {
            return Err(SlotError::InvalidAvailability(format!(
                "range end {} is past midnight",
                format_clock(end_minute)
            )));
        }
        if start_minute >= end_minute {
            return Err(SlotError::InvalidAvailability(format!(
                "range start {} is not before end {}",
                format_clock(start_minute),
                format_clock(end_minute)
            )));
        }
        Ok(Self {
            start: start_minute,
            end: end_minute,
        })
    }

    /// Parse a single `"HH:MM-HH:MM"` range.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (start, end) = s.split_once('-').ok_or_else(|| {
            SlotError::InvalidAvailability(format!("expected 'HH:MM-HH:MM', got '{s}'"))
        })?;
        let start = parse_clock(start.trim(), false)?;
        let end = parse_clock(end.trim(), true)?;
        Self::new(start, end)
    }

    /// Minutes after local midnight at which the range opens.
    pub fn start_minute(&self) -> u16 {
        self.start
    }

    /// Minutes after local midnight at which the range closes (exclusive).
    pub fn end_minute(&self) -> u16 {
        self.end
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end - self.start
    }

    /// Whether the half-open interval `[start, start + len)` lies inside the range.
    pub fn contains_interval(&self, start_minute: u16, len_minutes: u16) -> bool {
        start_minute >= self.start
            && u32::from(start_minute) + u32::from(len_minutes) <= u32::from(self.end)
    }

    fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_clock(self.start), format_clock(self.end))
    }
}

// ── WeeklyAvailability ──────────────────────────────────────────────────────

/// Per-weekday availability ranges, Monday first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WeekInput", into = "NamedWeek")]
pub struct WeeklyAvailability {
    days: [Vec<TimeRange>; 7],
}

impl WeeklyAvailability {
    /// An availability with no open days.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replace the ranges for one weekday.
    pub fn with_day(mut self, day: Weekday, ranges: Vec<TimeRange>) -> Result<Self> {
        self.set_day(day, ranges)?;
        Ok(self)
    }

    /// Replace the ranges for one weekday. Ranges are sorted and must not overlap.
    pub fn set_day(&mut self, day: Weekday, mut ranges: Vec<TimeRange>) -> Result<()> {
        ranges.sort();
        for pair in ranges.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(SlotError::InvalidAvailability(format!(
                    "{}: ranges {} and {} overlap",
                    weekday_name(day),
                    pair[0],
                    pair[1]
                )));
            }
        }
        self.days[day.num_days_from_monday() as usize] = ranges;
        Ok(())
    }

    /// Ranges for `day`, sorted by start. Empty when the day is unavailable.
    pub fn day(&self, day: Weekday) -> &[TimeRange] {
        &self.days[day.num_days_from_monday() as usize]
    }

    /// True if no weekday has any range.
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// Parse the legacy seven-entry positional form (Monday first).
    pub fn from_legacy<S: AsRef<str>>(entries: &[Option<S>]) -> Result<Self> {
        if entries.len() != WEEKDAYS.len() {
            return Err(SlotError::InvalidAvailability(format!(
                "expected 7 weekday entries, got {}",
                entries.len()
            )));
        }

        let mut week = Self::new();
        for (day, entry) in WEEKDAYS.iter().zip(entries) {
            let Some(entry) = entry else { continue };
            let ranges = parse_day_ranges(*day, entry.as_ref())?;
            week.set_day(*day, ranges)?;
        }
        Ok(week)
    }

    /// Render back to the legacy positional form. Unavailable days become `None`.
    pub fn to_legacy(&self) -> Vec<Option<String>> {
        self.days
            .iter()
            .map(|ranges| {
                if ranges.is_empty() {
                    None
                } else {
                    Some(
                        ranges
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(","),
                    )
                }
            })
            .collect()
    }
}

/// Parse one legacy day entry (`"09:00-12:00,13:00-17:00"`).
fn parse_day_ranges(day: Weekday, entry: &str) -> Result<Vec<TimeRange>> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Ok(Vec::new());
    }

    entry
        .split(',')
        .map(|part| {
            TimeRange::parse(part).map_err(|e| match e {
                SlotError::InvalidAvailability(msg) => {
                    SlotError::InvalidAvailability(format!("{}: {msg}", weekday_name(day)))
                }
                other => other,
            })
        })
        .collect()
}

// ── serde shapes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NamedWeek {
    #[serde(skip_serializing_if = "Option::is_none")]
    monday: Option<Vec<TimeRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tuesday: Option<Vec<TimeRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wednesday: Option<Vec<TimeRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thursday: Option<Vec<TimeRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    friday: Option<Vec<TimeRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saturday: Option<Vec<TimeRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sunday: Option<Vec<TimeRange>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WeekInput {
    Legacy(Vec<Option<String>>),
    Named(NamedWeek),
}

impl TryFrom<WeekInput> for WeeklyAvailability {
    type Error = SlotError;

    fn try_from(input: WeekInput) -> Result<Self> {
        match input {
            WeekInput::Legacy(entries) => Self::from_legacy(&entries),
            WeekInput::Named(named) => {
                let per_day = [
                    named.monday,
                    named.tuesday,
                    named.wednesday,
                    named.thursday,
                    named.friday,
                    named.saturday,
                    named.sunday,
                ];
                let mut week = Self::new();
                for (day, ranges) in WEEKDAYS.iter().zip(per_day) {
                    week.set_day(*day, ranges.unwrap_or_default())?;
                }
                Ok(week)
            }
        }
    }
}

impl From<WeeklyAvailability> for NamedWeek {
    fn from(week: WeeklyAvailability) -> Self {
        let [mon, tue, wed, thu, fri, sat, sun] =
            week.days.map(|r| if r.is_empty() { None } else { Some(r) });
        NamedWeek {
            monday: mon,
            tuesday: tue,
            wednesday: wed,
            thursday: thu,
            friday: fri,
            saturday: sat,
            sunday: sun,
        }
    }
}

// ── clock helpers ───────────────────────────────────────────────────────────

/// Parse `"HH:MM"` into minutes after midnight. `"24:00"` is accepted only
/// when `allow_end_of_day` is set.
fn parse_clock(s: &str, allow_end_of_day: bool) -> Result<u16> {
    let invalid = || SlotError::InvalidAvailability(format!("invalid time '{s}', expected HH:MM"));

    let (hours, minutes) = s.split_once(':').ok_or_else(invalid)?;
    if hours.is_empty()
        || hours.len() > 2
        || minutes.len() != 2
        || !hours.bytes().all(|b| b.is_ascii_digit())
        || !minutes.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let hours: u16 = hours.parse().map_err(|_| invalid())?;
    let minutes: u16 = minutes.parse().map_err(|_| invalid())?;

    if minutes >= 60 {
        return Err(invalid());
    }
    if hours == 24 && minutes == 0 && allow_end_of_day {
        return Ok(MINUTES_PER_DAY);
    }
    if hours >= 24 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Format minutes after midnight as `"HH:MM"`.
pub(crate) fn format_clock(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
