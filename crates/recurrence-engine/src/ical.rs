//! RFC 5545 export of recurrence rules.
//!
//! The legacy fields map onto RRULE parts one to one, with two adjustments
//! that keep the exported rule meaning the same dates:
//!
//! - weeks start on Monday, so weekly rules carry `WKST=MO`;
//! - a day in month above 28 is clamped to the last day of shorter months,
//!   which RRULE expresses as `BYMONTHDAY=28,29,..,d;BYSETPOS=-1`.
//!
//! `UNTIL` is always written in UTC, as the last second of the inclusive
//! until day in the calculation zone. An RRULE cannot hold both `COUNT` and
//! `UNTIL`; a rule with both exports whichever of the two ends the series
//! first.

use chrono::{TimeDelta, Weekday};
use rrule::RRuleSet;

use crate::calculator::{OccurrenceCalculator, Query, RecurringSeries};
use crate::error::{RecurrenceError, Result};
use crate::exceptions::ExceptionSet;
use crate::normalize::resolve_local;
use crate::rule::{Ordinal, Pattern, RecurrenceRule, WeekdayMask};

/// The RRULE value of `rule`, or `None` for a non-recurring rule.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use recurrence_engine::{ical, RecurrenceRule, WeekdayMask};
///
/// let rule = RecurrenceRule::builder(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap())
///     .weekly(WeekdayMask::MONDAY | WeekdayMask::WEDNESDAY)
///     .interval(2)
///     .occurrence_count(5)
///     .build()
///     .unwrap();
/// assert_eq!(
///     ical::to_rrule_string(&rule).as_deref(),
///     Some("FREQ=WEEKLY;INTERVAL=2;WKST=MO;BYDAY=MO,WE;COUNT=5")
/// );
/// ```
pub fn to_rrule_string(rule: &RecurrenceRule) -> Option<String> {
    let mut parts: Vec<String> = Vec::with_capacity(6);
    let freq = match rule.pattern() {
        Pattern::None => return None,
        Pattern::Daily => "DAILY",
        Pattern::Weekly { .. } => "WEEKLY",
        Pattern::MonthlyByDay { .. } | Pattern::MonthlyByWeekday { .. } => "MONTHLY",
        Pattern::YearlyByDay { .. } | Pattern::YearlyByWeekday { .. } => "YEARLY",
    };
    parts.push(format!("FREQ={freq}"));
    parts.push(format!("INTERVAL={}", rule.interval()));

    match *rule.pattern() {
        Pattern::None | Pattern::Daily => {}
        Pattern::Weekly { days } => {
            parts.push("WKST=MO".to_string());
            parts.push(by_day(days));
        }
        Pattern::MonthlyByDay { day } => parts.extend(by_month_day(day)),
        Pattern::MonthlyByWeekday { ordinal, days } => {
            parts.push(by_day(days));
            parts.push(by_set_pos(ordinal));
        }
        Pattern::YearlyByDay { month, day } => {
            parts.push(format!("BYMONTH={}", month.number_from_month()));
            parts.extend(by_month_day(day));
        }
        Pattern::YearlyByWeekday {
            month,
            ordinal,
            days,
        } => {
            parts.push(format!("BYMONTH={}", month.number_from_month()));
            parts.push(by_day(days));
            parts.push(by_set_pos(ordinal));
        }
    }

    match (rule.occurrence_count(), rule.until()) {
        (Some(count), Some(_)) if count_ends_first(rule, count) => {
            parts.push(format!("COUNT={count}"));
        }
        (Some(count), None) => parts.push(format!("COUNT={count}")),
        (_, Some(until)) => {
            let last_second = until.date_naive().and_hms_opt(23, 59, 59)?;
            let value = resolve_local(&rule.calculation_time_zone(), last_second);
            parts.push(format!("UNTIL={}", value.format("%Y%m%dT%H%M%SZ")));
        }
        (None, None) => {}
    }

    Some(parts.join(";"))
}

/// Whether the `count`-th occurrence still lies on or before the until day.
fn count_ends_first(rule: &RecurrenceRule, count: u32) -> bool {
    let Ok(series) = RecurringSeries::new(rule.clone(), ExceptionSet::new(), TimeDelta::zero())
    else {
        return true;
    };
    let Ok(query) = Query::position(count) else {
        return true;
    };
    // At most 999 steps are walked, well inside the default operation ceiling
    OccurrenceCalculator::default()
        .calculate(&series, query, 0, true)
        .map_or(true, |found| !found.is_empty())
}

/// Parse `rule` into an [`RRuleSet`] anchored at its series start in its
/// calculation zone.
///
/// # Errors
///
/// Returns [`RecurrenceError::InvalidRule`] for a non-recurring rule or if
/// the `rrule` crate rejects the generated text.
pub fn to_rrule_set(rule: &RecurrenceRule) -> Result<RRuleSet> {
    let rrule = to_rrule_string(rule).ok_or_else(|| {
        RecurrenceError::InvalidRule("a non-recurring rule has no RRULE".to_string())
    })?;
    let zone = rule.calculation_time_zone();
    let dtstart = rule
        .series_start()
        .with_timezone(&zone)
        .format("%Y%m%dT%H%M%S");
    let text = format!("DTSTART;TZID={}:{}\nRRULE:{}", zone.name(), dtstart, rrule);
    text.parse::<RRuleSet>()
        .map_err(|e| RecurrenceError::InvalidRule(format!("{e}")))
}

fn by_day(days: WeekdayMask) -> String {
    let codes: Vec<&str> = days.days().map(weekday_code).collect();
    format!("BYDAY={}", codes.join(","))
}

fn by_set_pos(ordinal: Ordinal) -> String {
    match ordinal {
        Ordinal::Last => "BYSETPOS=-1".to_string(),
        other => format!("BYSETPOS={}", other.legacy_value()),
    }
}

fn by_month_day(day: u8) -> Vec<String> {
    if day <= 28 {
        return vec![format!("BYMONTHDAY={day}")];
    }
    let days: Vec<String> = (28..=day).map(|d| d.to_string()).collect();
    vec![
        format!("BYMONTHDAY={}", days.join(",")),
        "BYSETPOS=-1".to_string(),
    ]
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
