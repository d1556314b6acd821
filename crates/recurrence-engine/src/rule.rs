//! The validated, immutable representation of a recurrence pattern.
//!
//! A [`RecurrenceRule`] is only ever produced by [`RecurrenceRule::from_fields`]
//! (or the [`RuleBuilder`] that feeds it), so every rule in circulation already
//! satisfies the per-kind invariants. The kind-specific fields live in
//! [`Pattern`], which makes "weekly without weekdays" or "yearly without a
//! month" unrepresentable.
//!
//! [`RuleFields`] is the loose, legacy shape of the same data: plain integers
//! as they come out of the storage layer or the encoded rule string.

use std::fmt;
use std::ops::BitOr;

use chrono::{DateTime, Month, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{RecurrenceError, Result};
use crate::normalize::{normalize_until, truncate_to_millis};

/// Upper bound for `interval`; larger values are clamped, not rejected.
pub const MAX_INTERVAL: u32 = 999;

/// Upper bound for `occurrence_count`; larger values are clamped, not rejected.
pub const MAX_OCCURRENCES: u32 = 999;

/// Legacy numeric type ids as persisted in the `t` token.
pub mod type_id {
    pub const NONE: i64 = 0;
    pub const DAILY: i64 = 1;
    pub const WEEKLY: i64 = 2;
    pub const MONTHLY: i64 = 3;
    pub const YEARLY: i64 = 4;
    /// Historical id for monthly, renumbered to [`MONTHLY`].
    pub const LEGACY_MONTHLY: i64 = 5;
    /// Historical id for yearly, renumbered to [`YEARLY`].
    pub const LEGACY_YEARLY: i64 = 6;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    None,
    Daily,
    Weekly,
    MonthlyByDay,
    MonthlyByWeekday,
    YearlyByDay,
    YearlyByWeekday,
}

impl RecurrenceKind {
    /// The compressed legacy type id: both monthly variants share `3`, both
    /// yearly variants share `4`.
    pub fn legacy_type_id(self) -> i64 {
        match self {
            RecurrenceKind::None => type_id::NONE,
            RecurrenceKind::Daily => type_id::DAILY,
            RecurrenceKind::Weekly => type_id::WEEKLY,
            RecurrenceKind::MonthlyByDay | RecurrenceKind::MonthlyByWeekday => type_id::MONTHLY,
            RecurrenceKind::YearlyByDay | RecurrenceKind::YearlyByWeekday => type_id::YEARLY,
        }
    }
}

// ── Weekday mask ────────────────────────────────────────────────────────────

/// Bitmask of weekdays, Sunday = 1 through Saturday = 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    pub const SUNDAY: Self = Self(1);
    pub const MONDAY: Self = Self(2);
    pub const TUESDAY: Self = Self(4);
    pub const WEDNESDAY: Self = Self(8);
    pub const THURSDAY: Self = Self(16);
    pub const FRIDAY: Self = Self(32);
    pub const SATURDAY: Self = Self(64);
    /// Monday through Friday.
    pub const WEEKDAYS: Self = Self(62);
    /// Saturday and Sunday.
    pub const WEEKEND: Self = Self(65);
    pub const ALL_DAYS: Self = Self(127);

    /// Accepts any non-empty combination of the seven day bits.
    pub fn from_bits(bits: i64) -> Option<Self> {
        u8::try_from(bits)
            .ok()
            .filter(|b| (1..=Self::ALL_DAYS.0).contains(b))
            .map(Self)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::from(day).0 != 0
    }

    /// Number of days set.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Days set in the mask, Monday first.
    pub fn days(self) -> impl Iterator<Item = Weekday> {
        MONDAY_FIRST.into_iter().filter(move |d| self.contains(*d))
    }
}

const MONDAY_FIRST: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl From<Weekday> for WeekdayMask {
    fn from(day: Weekday) -> Self {
        Self(1 << day.num_days_from_sunday())
    }
}

impl BitOr for WeekdayMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ── Ordinal ─────────────────────────────────────────────────────────────────

/// Which matching day of the month a "by weekday" pattern selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl Ordinal {
    /// Legacy values 1..=4 count from the start of the month, 5 means last.
    pub fn from_legacy(value: i64) -> Option<Self> {
        match value {
            1 => Some(Ordinal::First),
            2 => Some(Ordinal::Second),
            3 => Some(Ordinal::Third),
            4 => Some(Ordinal::Fourth),
            5 => Some(Ordinal::Last),
            _ => None,
        }
    }

    pub fn legacy_value(self) -> u8 {
        match self {
            Ordinal::First => 1,
            Ordinal::Second => 2,
            Ordinal::Third => 3,
            Ordinal::Fourth => 4,
            Ordinal::Last => 5,
        }
    }
}

// ── Pattern ─────────────────────────────────────────────────────────────────

/// Kind-specific fields of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    None,
    Daily,
    Weekly {
        days: WeekdayMask,
    },
    MonthlyByDay {
        day: u8,
    },
    MonthlyByWeekday {
        ordinal: Ordinal,
        days: WeekdayMask,
    },
    YearlyByDay {
        month: Month,
        day: u8,
    },
    YearlyByWeekday {
        month: Month,
        ordinal: Ordinal,
        days: WeekdayMask,
    },
}

impl Pattern {
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Pattern::None => RecurrenceKind::None,
            Pattern::Daily => RecurrenceKind::Daily,
            Pattern::Weekly { .. } => RecurrenceKind::Weekly,
            Pattern::MonthlyByDay { .. } => RecurrenceKind::MonthlyByDay,
            Pattern::MonthlyByWeekday { .. } => RecurrenceKind::MonthlyByWeekday,
            Pattern::YearlyByDay { .. } => RecurrenceKind::YearlyByDay,
            Pattern::YearlyByWeekday { .. } => RecurrenceKind::YearlyByWeekday,
        }
    }
}

// ── Raw legacy fields ───────────────────────────────────────────────────────

/// Discrete rule fields as plain integers, before validation.
///
/// Instants are epoch milliseconds. `None` means the field was not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFields {
    pub kind: Option<i64>,
    pub interval: Option<i64>,
    pub weekday_mask: Option<i64>,
    pub day_in_month: Option<i64>,
    pub month: Option<i64>,
    pub series_start: Option<i64>,
    pub until: Option<i64>,
    pub occurrence_count: Option<i64>,
}

// ── RecurrenceRule ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pattern: Pattern,
    interval: u32,
    series_start: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
    occurrence_count: Option<u32>,
    zone: Tz,
}

impl RecurrenceRule {
    /// Start a typed builder anchored at `series_start`. The calculation zone
    /// defaults to UTC.
    pub fn builder(series_start: DateTime<Utc>) -> RuleBuilder {
        RuleBuilder::new(series_start)
    }

    /// Validate legacy discrete fields and build a rule.
    ///
    /// Type ids `5` and `6` are read as `3` and `4`. A monthly or yearly rule
    /// with a non-zero weekday mask is the "by weekday" variant, and its
    /// `day_in_month` is the ordinal. `interval` and `occurrence_count` above
    /// 999 are clamped to 999; all other violations are errors. Fields the
    /// kind does not use are ignored. `until` is normalized to a day boundary
    /// in `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidRule`] for a missing or out-of-range
    /// field.
    pub fn from_fields(fields: &RuleFields, zone: Tz) -> Result<Self> {
        let kind = match fields.kind {
            Some(type_id::LEGACY_MONTHLY) => type_id::MONTHLY,
            Some(type_id::LEGACY_YEARLY) => type_id::YEARLY,
            Some(id) => id,
            None => return Err(invalid("missing recurrence type")),
        };

        let series_start = fields
            .series_start
            .ok_or_else(|| invalid("missing series start"))
            .and_then(|ms| millis_to_instant(ms, "series start"))?;

        if kind == type_id::NONE {
            return Ok(Self {
                pattern: Pattern::None,
                interval: 1,
                series_start,
                until: None,
                occurrence_count: None,
                zone,
            });
        }

        let pattern = match kind {
            type_id::DAILY => Pattern::Daily,
            type_id::WEEKLY => Pattern::Weekly {
                days: required_mask(fields.weekday_mask)?,
            },
            type_id::MONTHLY => match present_mask(fields.weekday_mask) {
                Some(mask) => Pattern::MonthlyByWeekday {
                    ordinal: required_ordinal(fields.day_in_month)?,
                    days: required_mask(Some(mask))?,
                },
                None => Pattern::MonthlyByDay {
                    day: required_day(fields.day_in_month)?,
                },
            },
            type_id::YEARLY => {
                let month = required_month(fields.month)?;
                match present_mask(fields.weekday_mask) {
                    Some(mask) => Pattern::YearlyByWeekday {
                        month,
                        ordinal: required_ordinal(fields.day_in_month)?,
                        days: required_mask(Some(mask))?,
                    },
                    None => Pattern::YearlyByDay {
                        month,
                        day: required_day(fields.day_in_month)?,
                    },
                }
            }
            other => return Err(invalid(format!("unknown recurrence type {other}"))),
        };

        let interval = match fields.interval {
            None => return Err(invalid("missing interval")),
            Some(i) if i < 1 => return Err(invalid(format!("interval must be positive, got {i}"))),
            Some(i) => clamp_to(i, MAX_INTERVAL),
        };

        let occurrence_count = match fields.occurrence_count {
            None => None,
            Some(n) if n < 1 => {
                return Err(invalid(format!(
                    "occurrence count must be positive, got {n}"
                )))
            }
            Some(n) => Some(clamp_to(n, MAX_OCCURRENCES)),
        };

        let until = fields
            .until
            .map(|ms| millis_to_instant(ms, "until").map(|t| normalize_until(t, &zone)))
            .transpose()?;

        Ok(Self {
            pattern,
            interval,
            series_start,
            until,
            occurrence_count,
            zone,
        })
    }

    /// The legacy discrete fields of this rule, limited to the ones its kind
    /// uses. Feeding the result back into [`RecurrenceRule::from_fields`] with
    /// the same zone yields an equal rule.
    pub fn to_fields(&self) -> RuleFields {
        let mut fields = RuleFields {
            kind: Some(self.kind().legacy_type_id()),
            series_start: Some(self.series_start.timestamp_millis()),
            ..RuleFields::default()
        };
        if self.pattern == Pattern::None {
            return fields;
        }

        fields.interval = Some(i64::from(self.interval));
        fields.weekday_mask = self.weekday_mask().map(|m| i64::from(m.bits()));
        fields.day_in_month = self.day_in_month().map(i64::from);
        fields.month = self.month().map(i64::from);
        fields.until = self.until.map(|t| t.timestamp_millis());
        fields.occurrence_count = self.occurrence_count.map(i64::from);
        fields
    }

    pub fn kind(&self) -> RecurrenceKind {
        self.pattern.kind()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_recurring(&self) -> bool {
        self.pattern != Pattern::None
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn weekday_mask(&self) -> Option<WeekdayMask> {
        match self.pattern {
            Pattern::Weekly { days }
            | Pattern::MonthlyByWeekday { days, .. }
            | Pattern::YearlyByWeekday { days, .. } => Some(days),
            _ => None,
        }
    }

    /// The day of month for the "by day" kinds, the ordinal (1..=5) for the
    /// "by weekday" kinds.
    pub fn day_in_month(&self) -> Option<u8> {
        match self.pattern {
            Pattern::MonthlyByDay { day } | Pattern::YearlyByDay { day, .. } => Some(day),
            Pattern::MonthlyByWeekday { ordinal, .. }
            | Pattern::YearlyByWeekday { ordinal, .. } => Some(ordinal.legacy_value()),
            _ => None,
        }
    }

    /// Zero-based month (January = 0) of yearly rules.
    pub fn month(&self) -> Option<u8> {
        match self.pattern {
            Pattern::YearlyByDay { month, .. } | Pattern::YearlyByWeekday { month, .. } => {
                u8::try_from(month.number_from_month() - 1).ok()
            }
            _ => None,
        }
    }

    pub fn series_start(&self) -> DateTime<Utc> {
        self.series_start
    }

    /// Inclusive end day, as the UTC midnight of that day in the calculation zone.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }

    pub fn occurrence_count(&self) -> Option<u32> {
        self.occurrence_count
    }

    pub fn calculation_time_zone(&self) -> Tz {
        self.zone
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::encode(self))
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Typed front end for [`RecurrenceRule::from_fields`].
///
/// Values are taken as given and only checked in [`RuleBuilder::build`], so an
/// out-of-range ordinal or day fails there with
/// [`RecurrenceError::InvalidRule`].
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    fields: RuleFields,
    zone: Tz,
}

impl RuleBuilder {
    fn new(series_start: DateTime<Utc>) -> Self {
        Self {
            fields: RuleFields {
                kind: Some(type_id::NONE),
                interval: Some(1),
                series_start: Some(truncate_to_millis(series_start).timestamp_millis()),
                ..RuleFields::default()
            },
            zone: Tz::UTC,
        }
    }

    pub fn daily(mut self) -> Self {
        self.set_shape(type_id::DAILY, None, None, None);
        self
    }

    pub fn weekly(mut self, days: WeekdayMask) -> Self {
        self.set_shape(type_id::WEEKLY, Some(days), None, None);
        self
    }

    pub fn monthly_by_day(mut self, day: u32) -> Self {
        self.set_shape(type_id::MONTHLY, None, Some(day), None);
        self
    }

    pub fn monthly_by_weekday(mut self, ordinal: u32, days: WeekdayMask) -> Self {
        self.set_shape(type_id::MONTHLY, Some(days), Some(ordinal), None);
        self
    }

    /// `month` is zero-based (January = 0).
    pub fn yearly_by_day(mut self, month: u32, day: u32) -> Self {
        self.set_shape(type_id::YEARLY, None, Some(day), Some(month));
        self
    }

    /// `month` is zero-based (January = 0).
    pub fn yearly_by_weekday(mut self, month: u32, ordinal: u32, days: WeekdayMask) -> Self {
        self.set_shape(type_id::YEARLY, Some(days), Some(ordinal), Some(month));
        self
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.fields.interval = Some(i64::from(interval));
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.fields.until = Some(until.timestamp_millis());
        self
    }

    pub fn occurrence_count(mut self, count: u32) -> Self {
        self.fields.occurrence_count = Some(i64::from(count));
        self
    }

    pub fn zone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    pub fn build(self) -> Result<RecurrenceRule> {
        RecurrenceRule::from_fields(&self.fields, self.zone)
    }

    fn set_shape(
        &mut self,
        kind: i64,
        days: Option<WeekdayMask>,
        day_in_month: Option<u32>,
        month: Option<u32>,
    ) {
        self.fields.kind = Some(kind);
        self.fields.weekday_mask = days.map(|d| i64::from(d.bits()));
        self.fields.day_in_month = day_in_month.map(i64::from);
        self.fields.month = month.map(i64::from);
    }
}

// ── Validation helpers ──────────────────────────────────────────────────────

fn invalid(message: impl Into<String>) -> RecurrenceError {
    RecurrenceError::InvalidRule(message.into())
}

fn clamp_to(value: i64, max: u32) -> u32 {
    u32::try_from(value).map_or(max, |v| v.min(max))
}

fn millis_to_instant(ms: i64, what: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| invalid(format!("{what} {ms} out of range")))
}

/// Zero counts as "no mask" in the legacy fields.
fn present_mask(mask: Option<i64>) -> Option<i64> {
    mask.filter(|m| *m != 0)
}

fn required_mask(mask: Option<i64>) -> Result<WeekdayMask> {
    match mask {
        None | Some(0) => Err(invalid("missing weekday mask")),
        Some(bits) => WeekdayMask::from_bits(bits)
            .ok_or_else(|| invalid(format!("weekday mask {bits} out of range 1..=127"))),
    }
}

fn required_day(day: Option<i64>) -> Result<u8> {
    let day = day.ok_or_else(|| invalid("missing day in month"))?;
    u8::try_from(day)
        .ok()
        .filter(|d| (1..=31).contains(d))
        .ok_or_else(|| invalid(format!("day in month {day} out of range 1..=31")))
}

fn required_ordinal(ordinal: Option<i64>) -> Result<Ordinal> {
    let ordinal = ordinal.ok_or_else(|| invalid("missing weekday ordinal"))?;
    Ordinal::from_legacy(ordinal)
        .ok_or_else(|| invalid(format!("weekday ordinal {ordinal} out of range 1..=5")))
}

fn required_month(month: Option<i64>) -> Result<Month> {
    let month = month.ok_or_else(|| invalid("missing month"))?;
    u8::try_from(month + 1)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| invalid(format!("month {month} out of range 0..=11")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
    }

    fn fields(kind: i64) -> RuleFields {
        RuleFields {
            kind: Some(kind),
            interval: Some(1),
            series_start: Some(start().timestamp_millis()),
            ..RuleFields::default()
        }
    }

    #[test]
    fn test_weekday_mask_bits_follow_sunday_first_layout() {
        assert_eq!(WeekdayMask::from(Weekday::Sun), WeekdayMask::SUNDAY);
        assert_eq!(WeekdayMask::from(Weekday::Sat), WeekdayMask::SATURDAY);
        assert_eq!(
            WeekdayMask::MONDAY | WeekdayMask::TUESDAY | WeekdayMask::WEDNESDAY
                | WeekdayMask::THURSDAY | WeekdayMask::FRIDAY,
            WeekdayMask::WEEKDAYS
        );
    }

    #[test]
    fn test_weekday_mask_days_are_monday_first() {
        let days: Vec<_> = (WeekdayMask::SUNDAY | WeekdayMask::WEDNESDAY | WeekdayMask::MONDAY)
            .days()
            .collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
    }

    #[test]
    fn test_weekday_mask_rejects_empty_and_overflow() {
        assert!(WeekdayMask::from_bits(0).is_none());
        assert!(WeekdayMask::from_bits(128).is_none());
        assert_eq!(WeekdayMask::from_bits(127), Some(WeekdayMask::ALL_DAYS));
    }

    #[test]
    fn test_builder_weekly() {
        let rule = RecurrenceRule::builder(start())
            .weekly(WeekdayMask::MONDAY | WeekdayMask::WEDNESDAY)
            .interval(2)
            .build()
            .unwrap();
        assert_eq!(rule.kind(), RecurrenceKind::Weekly);
        assert_eq!(rule.interval(), 2);
        assert_eq!(rule.weekday_mask().map(WeekdayMask::bits), Some(10));
        assert_eq!(rule.day_in_month(), None);
    }

    #[test]
    fn test_monthly_type_disambiguated_by_mask() {
        let mut by_day = fields(type_id::MONTHLY);
        by_day.day_in_month = Some(15);
        let rule = RecurrenceRule::from_fields(&by_day, Tz::UTC).unwrap();
        assert_eq!(rule.kind(), RecurrenceKind::MonthlyByDay);

        let mut by_weekday = by_day.clone();
        by_weekday.day_in_month = Some(2);
        by_weekday.weekday_mask = Some(i64::from(WeekdayMask::TUESDAY.bits()));
        let rule = RecurrenceRule::from_fields(&by_weekday, Tz::UTC).unwrap();
        assert_eq!(rule.kind(), RecurrenceKind::MonthlyByWeekday);
        assert_eq!(rule.day_in_month(), Some(2));
    }

    #[test]
    fn test_legacy_type_ids_are_remapped() {
        let mut monthly = fields(type_id::LEGACY_MONTHLY);
        monthly.day_in_month = Some(1);
        assert_eq!(
            RecurrenceRule::from_fields(&monthly, Tz::UTC).unwrap().kind(),
            RecurrenceKind::MonthlyByDay
        );

        let mut yearly = fields(type_id::LEGACY_YEARLY);
        yearly.day_in_month = Some(1);
        yearly.month = Some(0);
        assert_eq!(
            RecurrenceRule::from_fields(&yearly, Tz::UTC).unwrap().kind(),
            RecurrenceKind::YearlyByDay
        );
    }

    #[test]
    fn test_interval_and_count_above_limit_are_clamped() {
        let mut f = fields(type_id::DAILY);
        f.interval = Some(5000);
        f.occurrence_count = Some(1000);
        let rule = RecurrenceRule::from_fields(&f, Tz::UTC).unwrap();
        assert_eq!(rule.interval(), 999);
        assert_eq!(rule.occurrence_count(), Some(999));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut f = fields(type_id::DAILY);
        f.interval = Some(0);
        let err = RecurrenceRule::from_fields(&f, Tz::UTC).unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidRule(_)), "got: {err}");
    }

    #[test]
    fn test_weekly_without_mask_is_rejected() {
        let err = RecurrenceRule::from_fields(&fields(type_id::WEEKLY), Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("weekday mask"), "got: {err}");
    }

    #[test]
    fn test_ordinal_six_is_rejected() {
        let err = RecurrenceRule::builder(start())
            .monthly_by_weekday(6, WeekdayMask::MONDAY)
            .build()
            .unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidRule(_)), "got: {err}");
    }

    #[test]
    fn test_day_in_month_out_of_range_is_rejected() {
        assert!(RecurrenceRule::builder(start())
            .monthly_by_day(32)
            .build()
            .is_err());
        assert!(RecurrenceRule::builder(start())
            .monthly_by_day(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_yearly_month_out_of_range_is_rejected() {
        let err = RecurrenceRule::builder(start())
            .yearly_by_day(12, 1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("month 12"), "got: {err}");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = RecurrenceRule::from_fields(&fields(9), Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("unknown recurrence type 9"), "got: {err}");
    }

    #[test]
    fn test_until_is_normalized_in_zone() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let local_midnight = Utc.with_ymd_and_hms(2026, 3, 9, 23, 0, 0).unwrap();
        let rule = RecurrenceRule::builder(start())
            .daily()
            .until(local_midnight)
            .zone(berlin)
            .build()
            .unwrap();
        assert_eq!(
            rule.until(),
            Some(Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_none_rule_ignores_other_fields() {
        let mut f = fields(type_id::NONE);
        f.interval = Some(0);
        f.weekday_mask = Some(999);
        let rule = RecurrenceRule::from_fields(&f, Tz::UTC).unwrap();
        assert!(!rule.is_recurring());
        assert_eq!(rule.to_fields(), RuleFields {
            kind: Some(0),
            series_start: Some(start().timestamp_millis()),
            ..RuleFields::default()
        });
    }

    #[test]
    fn test_to_fields_round_trips() {
        let rule = RecurrenceRule::builder(start())
            .yearly_by_weekday(10, 5, WeekdayMask::THURSDAY)
            .interval(3)
            .occurrence_count(4)
            .build()
            .unwrap();
        let back = RecurrenceRule::from_fields(&rule.to_fields(), Tz::UTC).unwrap();
        assert_eq!(back, rule);
        assert_eq!(rule.month(), Some(10));
    }
}
