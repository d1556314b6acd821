//! Change and delete exceptions of a recurring series.
//!
//! Exceptions are keyed by UTC day: an occurrence is suppressed when its start
//! falls on the same UTC day as one of the listed instants.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::normalize::normalize_to_day;

/// Day-normalized change and delete exceptions.
///
/// The two sets are disjoint; a day listed as both is kept as deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionSet {
    changed: BTreeSet<DateTime<Utc>>,
    deleted: BTreeSet<DateTime<Utc>>,
}

impl ExceptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the stored comma-separated epoch-millisecond lists.
    ///
    /// Never fails: absent lists, blank entries and entries that are not
    /// valid timestamps are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use recurrence_engine::ExceptionSet;
    ///
    /// let set = ExceptionSet::from_lists(Some("86400000, 172800000"), None);
    /// assert_eq!(set.changed().count(), 2);
    /// assert!(ExceptionSet::from_lists(None, Some("")).is_empty());
    /// ```
    pub fn from_lists(changed: Option<&str>, deleted: Option<&str>) -> Self {
        Self::from_instants(parse_list(changed), parse_list(deleted))
    }

    /// Build from typed instants; each is truncated to its UTC day.
    pub fn from_instants<C, D>(changed: C, deleted: D) -> Self
    where
        C: IntoIterator<Item = DateTime<Utc>>,
        D: IntoIterator<Item = DateTime<Utc>>,
    {
        let deleted: BTreeSet<_> = deleted.into_iter().map(normalize_to_day).collect();
        let changed = changed
            .into_iter()
            .map(normalize_to_day)
            .filter(|day| !deleted.contains(day))
            .collect();
        Self { changed, deleted }
    }

    /// Whether the UTC day of `instant` is a change or delete exception.
    pub fn is_exception(&self, instant: DateTime<Utc>) -> bool {
        let day = normalize_to_day(instant);
        self.changed.contains(&day) || self.deleted.contains(&day)
    }

    pub fn is_changed(&self, instant: DateTime<Utc>) -> bool {
        self.changed.contains(&normalize_to_day(instant))
    }

    pub fn is_deleted(&self, instant: DateTime<Utc>) -> bool {
        self.deleted.contains(&normalize_to_day(instant))
    }

    /// Changed days in ascending order.
    pub fn changed(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.changed.iter().copied()
    }

    /// Deleted days in ascending order.
    pub fn deleted(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.deleted.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len() + self.deleted.len()
    }
}

fn parse_list(list: Option<&str>) -> Vec<DateTime<Utc>> {
    list.unwrap_or_default()
        .split(',')
        .filter_map(|entry| entry.trim().parse::<i64>().ok())
        .filter_map(DateTime::from_timestamp_millis)
        .collect()
}
