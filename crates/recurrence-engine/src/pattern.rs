//! Candidate dates of a pattern, one step at a time.
//!
//! A step is one application of the interval: one day block for daily rules,
//! one `7 × interval` day block for weekly rules, one month or year for the
//! monthly and yearly rules. Step `k` always lies after step `k - 1`, and
//! every date inside a step is emitted in ascending order, so the calculator
//! sees candidates in strictly increasing order.

use chrono::{Datelike, Days, NaiveDate};

use crate::rule::{Ordinal, Pattern, WeekdayMask};

#[derive(Debug, Clone)]
pub(crate) struct Stepper {
    pattern: Pattern,
    interval: u64,
    anchor: NaiveDate,
}

impl Stepper {
    /// `anchor` is the local calendar date of the series start.
    pub(crate) fn new(pattern: Pattern, interval: u32, anchor: NaiveDate) -> Self {
        Self {
            pattern,
            interval: u64::from(interval.max(1)),
            anchor,
        }
    }

    /// Append the candidate dates of step `step` to `out`.
    ///
    /// Returns `false` once the series has no such step, either because the
    /// pattern is not recurring or because the step lies outside the
    /// representable calendar.
    pub(crate) fn dates(&self, step: u64, out: &mut Vec<NaiveDate>) -> bool {
        let Some(offset) = step.checked_mul(self.interval) else {
            return false;
        };
        let date = match self.pattern {
            Pattern::None => (step == 0).then_some(self.anchor),
            Pattern::Daily => self.anchor.checked_add_days(Days::new(offset)),
            Pattern::Weekly { days } => return self.week_dates(offset, days, out),
            Pattern::MonthlyByDay { day } => self
                .shift_months(offset)
                .and_then(|(y, m)| clamped_day(y, m, day)),
            Pattern::MonthlyByWeekday { ordinal, days } => self
                .shift_months(offset)
                .and_then(|(y, m)| nth_matching_day(y, m, ordinal, days)),
            Pattern::YearlyByDay { month, day } => self
                .shift_years(offset)
                .and_then(|y| clamped_day(y, month.number_from_month(), day)),
            Pattern::YearlyByWeekday {
                month,
                ordinal,
                days,
            } => self
                .shift_years(offset)
                .and_then(|y| nth_matching_day(y, month.number_from_month(), ordinal, days)),
        };
        match date {
            Some(date) => {
                out.push(date);
                true
            }
            None => false,
        }
    }

    /// Occurrences contributed by every step after the first. Step 0 may be
    /// partial because dates before the series start are dropped.
    pub(crate) fn per_step(&self) -> u64 {
        match self.pattern {
            Pattern::None => 0,
            Pattern::Weekly { days } => u64::from(days.count()),
            _ => 1,
        }
    }

    /// Number of leading steps that lie entirely before `date`.
    pub(crate) fn steps_before(&self, date: NaiveDate) -> u64 {
        let units = match self.pattern {
            Pattern::None => return 0,
            Pattern::Daily => (date - self.anchor).num_days(),
            Pattern::Weekly { .. } => (date - week_start(self.anchor)).num_days() / 7,
            Pattern::MonthlyByDay { .. } | Pattern::MonthlyByWeekday { .. } => {
                month_index(date) - month_index(self.anchor)
            }
            Pattern::YearlyByDay { .. } | Pattern::YearlyByWeekday { .. } => {
                i64::from(date.year()) - i64::from(self.anchor.year())
            }
        };
        u64::try_from(units).map_or(0, |u| u / self.interval)
    }

    fn week_dates(&self, offset: u64, days: WeekdayMask, out: &mut Vec<NaiveDate>) -> bool {
        let Some(block) = offset
            .checked_mul(7)
            .and_then(|d| week_start(self.anchor).checked_add_days(Days::new(d)))
        else {
            return false;
        };
        let before = out.len();
        out.extend(days.days().filter_map(|day| {
            block.checked_add_days(Days::new(u64::from(day.num_days_from_monday())))
        }));
        out.len() > before
    }

    fn shift_months(&self, offset: u64) -> Option<(i32, u32)> {
        let index = month_index(self.anchor).checked_add(i64::try_from(offset).ok()?)?;
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
        Some((year, month))
    }

    fn shift_years(&self, offset: u64) -> Option<i32> {
        self.anchor.year().checked_add(i32::try_from(offset).ok()?)
    }
}

/// Monday of the week containing `date`.
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(date)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|last| last.day())
}

/// `day` of the month, or the month's last day when the month is shorter.
fn clamped_day(year: i32, month: u32, day: u8) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, u32::from(day).min(last))
}

/// The `ordinal`-th day of the month whose weekday is in `days`.
fn nth_matching_day(
    year: i32,
    month: u32,
    ordinal: Ordinal,
    days: WeekdayMask,
) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    let mut matching = (1..=last)
        .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .filter(|d| days.contains(d.weekday()));
    match ordinal {
        Ordinal::Last => matching.last(),
        other => matching.nth(usize::from(other.legacy_value()) - 1),
    }
}
