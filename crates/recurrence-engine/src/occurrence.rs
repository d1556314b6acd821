//! Computed occurrences and the ordered set a calculation returns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::normalize::normalize_to_day;

/// A single concrete instance of a recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// One-based position within the series. Exceptions keep their position,
    /// so positions in a result set may have gaps.
    pub position: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `start` truncated to its UTC day; the key exceptions are matched on.
    pub normalized_key: DateTime<Utc>,
}

impl Occurrence {
    pub(crate) fn new(position: u32, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            position,
            start,
            end,
            normalized_key: normalize_to_day(start),
        }
    }
}

/// Occurrences in generation order, with lookup by position and by day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OccurrenceResultSet {
    occurrences: Vec<Occurrence>,
    #[serde(skip)]
    by_key: HashMap<DateTime<Utc>, usize>,
}

impl OccurrenceResultSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            occurrences: Vec::with_capacity(capacity),
            by_key: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, occurrence: Occurrence) {
        self.by_key
            .entry(occurrence.normalized_key)
            .or_insert(self.occurrences.len());
        self.occurrences.push(occurrence);
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Occurrence> {
        self.occurrences.iter()
    }

    pub fn first(&self) -> Option<&Occurrence> {
        self.occurrences.first()
    }

    pub fn last(&self) -> Option<&Occurrence> {
        self.occurrences.last()
    }

    /// The occurrence with the given one-based series position, if it is in
    /// this result set.
    pub fn by_position(&self, position: u32) -> Option<&Occurrence> {
        self.occurrences
            .binary_search_by_key(&position, |o| o.position)
            .ok()
            .map(|idx| &self.occurrences[idx])
    }

    /// The occurrence starting on the UTC day of `instant`.
    pub fn by_normalized_key(&self, instant: DateTime<Utc>) -> Option<&Occurrence> {
        self.by_key
            .get(&normalize_to_day(instant))
            .map(|&idx| &self.occurrences[idx])
    }

    pub fn positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.occurrences.iter().map(|o| o.position)
    }

    pub fn as_slice(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn into_vec(self) -> Vec<Occurrence> {
        self.occurrences
    }
}

impl IntoIterator for OccurrenceResultSet {
    type Item = Occurrence;
    type IntoIter = std::vec::IntoIter<Occurrence>;

    fn into_iter(self) -> Self::IntoIter {
        self.occurrences.into_iter()
    }
}

impl<'a> IntoIterator for &'a OccurrenceResultSet {
    type Item = &'a Occurrence;
    type IntoIter = std::slice::Iter<'a, Occurrence>;

    fn into_iter(self) -> Self::IntoIter {
        self.occurrences.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn occurrence(position: u32, day: u32) -> Occurrence {
        let start = Utc.with_ymd_and_hms(2026, 4, day, 10, 0, 0).unwrap();
        Occurrence::new(position, start, start + TimeDelta::hours(1))
    }

    fn sample() -> OccurrenceResultSet {
        let mut set = OccurrenceResultSet::with_capacity(3);
        set.push(occurrence(1, 1));
        set.push(occurrence(2, 2));
        set.push(occurrence(4, 4));
        set
    }

    #[test]
    fn test_normalized_key_is_utc_day() {
        let o = occurrence(1, 9);
        assert_eq!(o.normalized_key, Utc.with_ymd_and_hms(2026, 4, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_lookup_by_position_with_gap() {
        let set = sample();
        assert_eq!(set.by_position(4).map(|o| o.start.format("%d").to_string()), Some("04".into()));
        assert!(set.by_position(3).is_none());
        assert_eq!(set.positions().collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn test_lookup_by_normalized_key() {
        let set = sample();
        let any_time_that_day = Utc.with_ymd_and_hms(2026, 4, 2, 23, 59, 0).unwrap();
        assert_eq!(set.by_normalized_key(any_time_that_day).map(|o| o.position), Some(2));
        assert!(set
            .by_normalized_key(Utc.with_ymd_and_hms(2026, 4, 3, 0, 0, 0).unwrap())
            .is_none());
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let json = serde_json::to_value(sample()).unwrap();
        let items = json.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["position"], 4);
        assert_eq!(items[0]["start"], "2026-04-01T10:00:00Z");
    }
}
