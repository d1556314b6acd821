//! Occurrence expansion.
//!
//! [`OccurrenceCalculator`] walks the candidates of a rule in generation order
//! and decides for each one, in this order:
//!
//! 1. past the rule's `until` day → the series has ended, stop;
//! 2. past the rule's occurrence count → stop;
//! 3. an exception day (unless exceptions are ignored) → skip it, but the
//!    candidate still takes its position, so positions never shift;
//! 4. inside the queried range, or at the queried position → emit it.
//!
//! Candidates are generated on the calendar of the rule's calculation zone,
//! keeping the wall-clock time of the series start across DST changes.
//! Every candidate evaluation counts against
//! [`CalculationConfig::max_operations`]; exceeding it fails the call with
//! [`RecurrenceError::PatternTooComplex`] instead of returning a partial
//! result.

use std::num::NonZeroU32;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::config::CalculationConfig;
use crate::error::{RecurrenceError, Result};
use crate::exceptions::ExceptionSet;
use crate::normalize::{add_years, local_day, resolve_local};
use crate::occurrence::{Occurrence, OccurrenceResultSet};
use crate::pattern::Stepper;
use crate::rule::RecurrenceRule;

// ── Inputs ──────────────────────────────────────────────────────────────────

/// Everything one calculation reads: the rule, its exceptions, and the length
/// of a single occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringSeries {
    rule: RecurrenceRule,
    exceptions: ExceptionSet,
    duration: TimeDelta,
}

impl RecurringSeries {
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidRule`] if `duration` is negative.
    pub fn new(
        rule: RecurrenceRule,
        exceptions: ExceptionSet,
        duration: TimeDelta,
    ) -> Result<Self> {
        if duration < TimeDelta::zero() {
            return Err(RecurrenceError::InvalidRule(format!(
                "occurrence duration must not be negative, got {}s",
                duration.num_seconds()
            )));
        }
        Ok(Self {
            rule,
            exceptions,
            duration,
        })
    }

    /// Take the occurrence length from the original appointment's start and end.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidRule`] if `end` is before `start`.
    pub fn from_bounds(
        rule: RecurrenceRule,
        exceptions: ExceptionSet,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        Self::new(rule, exceptions, end - start)
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    pub fn exceptions(&self) -> &ExceptionSet {
        &self.exceptions
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }
}

/// What a calculation should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Every occurrence whose `[start, end)` overlaps `[start, end)`.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// The occurrence at this one-based position, if it exists and is not an
    /// exception.
    Position(NonZeroU32),
    /// Same as `Position(1)`.
    First,
}

impl Query {
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Query::Range { start, end }
    }

    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidQuery`] for position 0.
    pub fn position(position: u32) -> Result<Self> {
        NonZeroU32::new(position).map(Query::Position).ok_or_else(|| {
            RecurrenceError::InvalidQuery("positions are one-based, got 0".to_string())
        })
    }

    /// Map the loose parameters of the request layer onto a query.
    ///
    /// A position wins over a range. A range needs both bounds and is ignored
    /// when both are the epoch (the request layer's "unset"). Anything else
    /// asks for the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidQuery`] for position 0.
    pub fn from_parts(
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
        position: Option<u32>,
    ) -> Result<Self> {
        if let Some(position) = position {
            return Self::position(position);
        }
        match (range_start, range_end) {
            (Some(start), Some(end))
                if start.timestamp_millis() != 0 || end.timestamp_millis() != 0 =>
            {
                Ok(Query::Range { start, end })
            }
            _ => Ok(Query::First),
        }
    }
}

// ── Calculator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OccurrenceCalculator {
    config: CalculationConfig,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Position(u32),
    FirstSurviving,
}

impl OccurrenceCalculator {
    pub fn new(config: CalculationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalculationConfig {
        &self.config
    }

    /// Compute the occurrences `query` asks for.
    ///
    /// `max_results` limits range queries; `0` means the configured maximum,
    /// and larger values are capped at it. Position queries return at most one
    /// occurrence, and none when the position is past the end of the series or
    /// is an exception (unless `ignore_exceptions`).
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::PatternTooComplex`] when the operation
    /// ceiling is hit before the query is answered.
    pub fn calculate(
        &self,
        series: &RecurringSeries,
        query: Query,
        max_results: usize,
        ignore_exceptions: bool,
    ) -> Result<OccurrenceResultSet> {
        let cap = match max_results {
            0 => self.config.max_occurrences,
            n => n.min(self.config.max_occurrences),
        };
        let target = match query {
            Query::Range { start, end } => Target::Range { start, end },
            Query::Position(position) => Target::Position(position.get()),
            Query::First => Target::Position(1),
        };
        debug!(
            kind = ?series.rule.kind(),
            ?query,
            cap,
            ignore_exceptions,
            "calculating occurrences"
        );
        self.expand(series, target, cap, ignore_exceptions)
    }

    /// The earliest occurrence that is not an exception.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::NoOccurrence`] if the series ends (or the
    /// search horizon is reached) without one, and
    /// [`RecurrenceError::PatternTooComplex`] if the operation ceiling is hit.
    pub fn calculate_first(&self, series: &RecurringSeries) -> Result<Occurrence> {
        self.expand(series, Target::FirstSurviving, 1, false)?
            .first()
            .copied()
            .ok_or_else(|| {
                RecurrenceError::NoOccurrence("unable to calculate first occurrence".to_string())
            })
    }

    fn expand(
        &self,
        series: &RecurringSeries,
        target: Target,
        cap: usize,
        ignore_exceptions: bool,
    ) -> Result<OccurrenceResultSet> {
        let rule = &series.rule;
        let zone = rule.calculation_time_zone();
        let local_start = rule.series_start().with_timezone(&zone).naive_local();
        let stepper = Stepper::new(*rule.pattern(), rule.interval(), local_start.date());
        let mut walk = Walk {
            series,
            zone,
            local_start,
            max_operations: self.config.max_operations,
            operations: 0,
        };

        let horizon = match target {
            Target::Range { .. } => None,
            _ if rule.until().is_some() || rule.occurrence_count().is_some() => None,
            _ => Some(add_years(
                rule.series_start(),
                i32::try_from(self.config.search_horizon_years).unwrap_or(i32::MAX),
            )),
        };

        let (mut position, mut step) = match target {
            Target::Range { start, .. } if self.config.fast_fetch => {
                walk.fast_forward(&stepper, start)?
            }
            _ => (0, 0),
        };

        let mut results = OccurrenceResultSet::with_capacity(cap.min(64));
        let mut dates = Vec::with_capacity(7);

        'steps: loop {
            dates.clear();
            if !stepper.dates(step, &mut dates) {
                break;
            }
            for &date in &dates {
                let Some(start) = walk.candidate(date)? else {
                    continue;
                };
                if rule
                    .until()
                    .is_some_and(|until| local_day(start, &zone) > until)
                {
                    break 'steps;
                }
                if horizon.is_some_and(|limit| start > limit) {
                    break 'steps;
                }
                position = position.saturating_add(1);
                if rule.occurrence_count().is_some_and(|count| position > count) {
                    break 'steps;
                }

                let excluded = !ignore_exceptions && series.exceptions.is_exception(start);
                let end = start
                    .checked_add_signed(series.duration)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);

                match target {
                    Target::Range {
                        start: from,
                        end: to,
                    } => {
                        if start >= to {
                            break 'steps;
                        }
                        if !excluded && overlaps(start, end, from, to) {
                            results.push(Occurrence::new(position, start, end));
                            if results.len() >= cap {
                                break 'steps;
                            }
                        }
                    }
                    Target::Position(wanted) => {
                        if position == wanted {
                            if !excluded {
                                results.push(Occurrence::new(position, start, end));
                            }
                            break 'steps;
                        }
                    }
                    Target::FirstSurviving => {
                        if !excluded {
                            results.push(Occurrence::new(position, start, end));
                            break 'steps;
                        }
                    }
                }
            }
            step += 1;
        }

        Ok(results)
    }
}

/// Whether `[start, end)` overlaps `[from, to)`. A zero-length occurrence
/// counts as inside when `from <= start < to`.
fn overlaps(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> bool {
    start < to && (end > from || (start == end && start >= from))
}

/// Per-call walking state: the operation counter and the local anchor.
struct Walk<'a> {
    series: &'a RecurringSeries,
    zone: Tz,
    local_start: NaiveDateTime,
    max_operations: usize,
    operations: usize,
}

impl Walk<'_> {
    /// Resolve one candidate date to its start instant, or `None` if it lies
    /// before the series start.
    fn candidate(&mut self, date: NaiveDate) -> Result<Option<DateTime<Utc>>> {
        self.operations += 1;
        if self.operations > self.max_operations {
            warn!(
                operations = self.max_operations,
                kind = ?self.series.rule.kind(),
                interval = self.series.rule.interval(),
                "recurrence calculation hit the operation ceiling"
            );
            return Err(RecurrenceError::PatternTooComplex {
                operations: self.max_operations,
            });
        }

        let local = date.and_time(self.local_start.time());
        if local < self.local_start {
            return Ok(None);
        }
        if local == self.local_start {
            return Ok(Some(self.series.rule.series_start()));
        }
        Ok(Some(resolve_local(&self.zone, local)))
    }

    /// Skip the pattern steps that end before `range_start` can be reached,
    /// returning the position reached and the first step still to walk.
    ///
    /// Step 0 is evaluated because candidates before the series start carry
    /// no position; every later step contributes a fixed count.
    fn fast_forward(
        &mut self,
        stepper: &Stepper,
        range_start: DateTime<Utc>,
    ) -> Result<(u32, u64)> {
        let lower = range_start
            .checked_sub_signed(self.series.duration)
            .and_then(|t| t.checked_sub_signed(TimeDelta::days(1)))
            .unwrap_or(range_start);
        let skip = stepper.steps_before(lower.with_timezone(&self.zone).date_naive());
        if skip < 2 {
            return Ok((0, 0));
        }

        let mut first_step = Vec::with_capacity(7);
        stepper.dates(0, &mut first_step);
        let mut leading = 0u64;
        for date in first_step {
            if self.candidate(date)?.is_some() {
                leading += 1;
            }
        }

        let credited = (skip - 1)
            .saturating_mul(stepper.per_step())
            .saturating_add(leading);
        debug!(skip, credited, "fast-forwarding range query");
        Ok((u32::try_from(credited).unwrap_or(u32::MAX), skip))
    }
}
