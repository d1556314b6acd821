//! # recurrence-engine
//!
//! Deterministic occurrence calculation for recurring groupware appointments.
//!
//! Given a recurrence rule, the change and delete exceptions of its series,
//! and the length of one appointment, the engine computes concrete
//! occurrences: every occurrence overlapping a time range, the occurrence at
//! a one-based position, or the first occurrence. Exceptions suppress
//! occurrences without shifting the positions of the others, and every
//! calculation is bounded by a fixed operation ceiling.
//!
//! ## Modules
//!
//! - [`rule`] — validated recurrence rule, its legacy fields, and a typed builder
//! - [`codec`] — legacy `key|value|` rule text, byte-compatible with stored rows
//! - [`normalize`] — UTC day keys, until-date normalization, local calendar days
//! - [`exceptions`] — day-keyed change/delete exception sets
//! - [`calculator`] — range, position, and first-occurrence queries
//! - [`occurrence`] — computed occurrences and the ordered result set
//! - [`record`] — the appointment-shaped input as the storage layer provides it
//! - [`ical`] — RFC 5545 RRULE export
//! - [`config`] — calculation limits
//! - [`error`] — Error types

pub mod calculator;
pub mod codec;
pub mod config;
pub mod error;
pub mod exceptions;
pub mod ical;
pub mod normalize;
pub mod occurrence;
mod pattern;
pub mod record;
pub mod rule;

pub use calculator::{OccurrenceCalculator, Query, RecurringSeries};
pub use codec::{decode, decode_or_derive, encode, encode_fields};
pub use config::CalculationConfig;
pub use error::{RecurrenceError, Result};
pub use exceptions::ExceptionSet;
pub use normalize::{exceeds_hour_of_day, local_day, normalize_to_day, normalize_until};
pub use occurrence::{Occurrence, OccurrenceResultSet};
pub use record::SeriesRecord;
pub use rule::{
    Ordinal, Pattern, RecurrenceKind, RecurrenceRule, RuleBuilder, RuleFields, WeekdayMask,
};
