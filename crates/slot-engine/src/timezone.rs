//! Conversion between stored UTC instants and an event's IANA timezone.
//!
//! Everything persisted is UTC. Wall-clock values only exist at two edges:
//! availability templates (interpreted in the event's zone when slots are
//! expanded) and the presentation layer. All conversions go through
//! `chrono-tz`, so DST transitions are handled by the zone database rather
//! than fixed offsets.

use chrono::{DateTime, Datelike, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{Result, SlotError};

/// An instant rendered in a specific timezone, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalInstant {
    /// The instant in UTC (RFC 3339).
    pub utc: String,
    /// The instant in the target timezone (RFC 3339 with offset).
    pub local: String,
    /// The IANA timezone name used.
    pub timezone: String,
    /// The UTC offset at this instant (e.g., "-05:00").
    pub utc_offset: String,
    /// Whether Daylight Saving Time is active at this instant.
    pub dst_active: bool,
}

/// Parse an IANA timezone name. Unknown names are an error, never UTC.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| SlotError::InvalidTimezone(format!("'{}'", name)))
}

/// Parse an RFC 3339 datetime string into `DateTime<Utc>`.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SlotError::InvalidDatetime(format!("'{}': {}", s, e)))
}

/// Express a stored instant in `tz`.
pub fn to_zone(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// Inverse of [`to_zone`]. The round trip is exact.
pub fn to_utc(local: DateTime<Tz>) -> DateTime<Utc> {
    local.with_timezone(&Utc)
}

/// Resolve a wall-clock datetime in `tz` to a UTC instant.
///
/// During a fall-back overlap the earlier instant is chosen. A wall-clock time
/// skipped by a spring-forward transition does not exist and is an error.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    resolve_local(naive, tz).map(to_utc).ok_or_else(|| {
        SlotError::InvalidDatetime(format!(
            "{} does not exist in {}",
            naive.format("%Y-%m-%d %H:%M"),
            tz.name()
        ))
    })
}

/// Like [`local_to_utc`] but returns `None` for nonexistent local times.
pub(crate) fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

/// Convert a stored instant for display in the named timezone.
///
/// # Errors
///
/// Returns [`SlotError::InvalidTimezone`] if `timezone` is not a valid IANA name.
pub fn convert_instant(instant: DateTime<Utc>, timezone: &str) -> Result<LocalInstant> {
    let tz = parse_timezone(timezone)?;
    let local = to_zone(instant, tz);

    Ok(LocalInstant {
        utc: instant.to_rfc3339(),
        local: local.to_rfc3339(),
        timezone: timezone.to_string(),
        utc_offset: format_utc_offset(&local),
        dst_active: is_dst_active(&local, &tz),
    })
}

/// Determine if DST is active for a datetime in a timezone.
fn is_dst_active<T: TimeZone>(dt: &DateTime<T>, tz: &Tz) -> bool {
    // Compare the January and July offsets: whichever is smaller is standard
    // time, so this also holds in the southern hemisphere.
    let utc = dt.with_timezone(&Utc);
    let year = utc.year();

    let offset_at = |month: u32| {
        Utc.with_ymd_and_hms(year, month, 1, 12, 0, 0)
            .single()
            .map(|sample| sample.with_timezone(tz).offset().fix().local_minus_utc())
    };

    let current = dt.offset().fix().local_minus_utc();
    match (offset_at(1), offset_at(7)) {
        (Some(jan), Some(jul)) if jan != jul => current == jan.max(jul),
        _ => false,
    }
}

/// Format the UTC offset as a string (e.g., "-05:00", "+09:00").
pub(crate) fn format_utc_offset<T: TimeZone>(dt: &DateTime<T>) -> String {
    let offset_secs = dt.offset().fix().local_minus_utc();
    let sign = if offset_secs >= 0 { "+" } else { "-" };
    let abs_secs = offset_secs.unsigned_abs();
    let hours = abs_secs / 3600;
    let minutes = (abs_secs % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}
