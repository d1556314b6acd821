//! Day-boundary normalization across time zones.
//!
//! Exception keys, occurrence lookup keys, and the "until" bound of a series
//! are all compared at day granularity. These helpers decide which day an
//! instant belongs to: either the plain UTC day ([`normalize_to_day`]) or the
//! calendar day the instant falls on in the series' calculation zone
//! ([`local_day`], [`normalize_until`]).
//!
//! All results are expressed as UTC midnight instants, matching the epoch
//! millisecond values the storage layer persists.

use chrono::{
    DateTime, Months, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

use crate::error::{RecurrenceError, Result};

/// Milliseconds in one (UTC) day.
pub const DAY_MILLIS: i64 = 86_400_000;

const DAY_SECONDS: i64 = 86_400;

/// Truncate an instant to the start of its UTC calendar day.
///
/// Equivalent to `t - t mod DAY_MILLIS`, flooring for instants before the epoch.
pub fn normalize_to_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Whether the UTC time of day of `instant` plus the offset of `zone` at that
/// instant leaves the `[0, 24h)` window, i.e. the local calendar day differs
/// from the UTC calendar day.
///
/// The sum is taken in seconds so zones with half-hour offsets are handled.
pub fn exceeds_hour_of_day(instant: DateTime<Utc>, zone: &Tz) -> bool {
    !(0..DAY_SECONDS).contains(&local_seconds_of_day(instant, zone))
}

/// Normalize a client-supplied "until" instant to a day boundary.
///
/// An instant already on a UTC day boundary is kept. Otherwise the instant is
/// rounded down to its UTC day, unless the zone offset moves it onto another
/// local day ([`exceeds_hour_of_day`]), in which case it is rounded to that
/// day instead: a local midnight in `Europe/Berlin` (23:00 UTC the day before)
/// rounds up to the next UTC day boundary.
///
/// The function is idempotent.
pub fn normalize_until(instant: DateTime<Utc>, zone: &Tz) -> DateTime<Utc> {
    let day = normalize_to_day(instant);
    if day == instant || !exceeds_hour_of_day(instant, zone) {
        return day;
    }
    if local_seconds_of_day(instant, zone) >= DAY_SECONDS {
        day + TimeDelta::days(1)
    } else {
        day - TimeDelta::days(1)
    }
}

/// The calendar date of `instant` in `zone`, as a UTC midnight instant.
pub fn local_day(instant: DateTime<Utc>, zone: &Tz) -> DateTime<Utc> {
    instant
        .with_timezone(zone)
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Add `years` calendar years in UTC. February 29 maps to February 28 in
/// non-leap target years. Saturates at the representable range.
pub fn add_years(base: DateTime<Utc>, years: i32) -> DateTime<Utc> {
    let months = Months::new(years.unsigned_abs().saturating_mul(12));
    if years >= 0 {
        base.checked_add_months(months)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    } else {
        base.checked_sub_months(months)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Resolve a wall-clock time in `zone` to an instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// do not exist (DST spring-forward gap) move forward by one hour.
pub fn resolve_local(zone: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    zone.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(local + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| local.and_utc())
}

/// Drop sub-millisecond precision so the instant survives an epoch-millis
/// round trip unchanged.
pub fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| RecurrenceError::InvalidTimezone(format!("'{}'", name)))
}

fn local_seconds_of_day(instant: DateTime<Utc>, zone: &Tz) -> i64 {
    let offset = zone
        .offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc();
    i64::from(instant.num_seconds_from_midnight()) + i64::from(offset)
}
