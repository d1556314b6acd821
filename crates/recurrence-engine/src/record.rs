//! The appointment-shaped record the CRUD layer hands to the engine.
//!
//! Timestamps are epoch milliseconds, exception lists are the stored
//! comma-separated columns, and the rule is either the persisted encoded text
//! or the discrete recurrence columns.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calculator::RecurringSeries;
use crate::codec::decode_or_derive;
use crate::error::Result;
use crate::exceptions::ExceptionSet;
use crate::normalize::parse_timezone;
use crate::rule::{RecurrenceRule, RuleFields};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    /// Legacy type id; absent means a single appointment.
    #[serde(default)]
    pub recurrence_type: i64,
    #[serde(default)]
    pub interval: Option<i64>,
    /// Weekday mask.
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub day_in_month: Option<i64>,
    #[serde(default)]
    pub month: Option<i64>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub until: Option<DateTime<Utc>>,
    /// Occurrence count.
    #[serde(default)]
    pub occurrence: Option<i64>,
    /// Persisted encoded rule; takes precedence over the discrete columns.
    #[serde(default)]
    pub recurrence_pattern: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub full_time: bool,
    #[serde(default)]
    pub change_exceptions: Option<String>,
    #[serde(default)]
    pub delete_exceptions: Option<String>,
}

impl SeriesRecord {
    /// Full-time series and records without a zone are calculated in UTC.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidTimezone`](crate::RecurrenceError::InvalidTimezone)
    /// for an unknown zone id.
    pub fn calculation_zone(&self) -> Result<Tz> {
        match self.timezone.as_deref().map(str::trim) {
            Some(name) if !self.full_time && !name.is_empty() => parse_timezone(name),
            _ => Ok(Tz::UTC),
        }
    }

    /// The discrete recurrence columns, with the record start as series start.
    pub fn rule_fields(&self) -> RuleFields {
        RuleFields {
            kind: Some(self.recurrence_type),
            interval: self.interval,
            weekday_mask: self.days,
            day_in_month: self.day_in_month,
            month: self.month,
            series_start: Some(self.start.timestamp_millis()),
            until: self.until.map(|t| t.timestamp_millis()),
            occurrence_count: self.occurrence,
        }
    }

    /// # Errors
    ///
    /// Propagates zone, decoding, and validation errors.
    pub fn rule(&self) -> Result<RecurrenceRule> {
        decode_or_derive(
            self.recurrence_pattern.as_deref(),
            &self.rule_fields(),
            self.calculation_zone()?,
        )
    }

    pub fn exceptions(&self) -> ExceptionSet {
        ExceptionSet::from_lists(
            self.change_exceptions.as_deref(),
            self.delete_exceptions.as_deref(),
        )
    }

    /// Everything a calculation needs; the occurrence length is `end - start`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`SeriesRecord::rule`], and fails with
    /// [`RecurrenceError::InvalidRule`](crate::RecurrenceError::InvalidRule)
    /// if `end` is before `start`.
    pub fn to_series(&self) -> Result<RecurringSeries> {
        RecurringSeries::from_bounds(self.rule()?, self.exceptions(), self.start, self.end)
    }
}
