//! Calculation limits and toggles.
//!
//! A [`CalculationConfig`] is loaded once at startup (typically from the
//! server's JSON settings) and handed to an
//! [`OccurrenceCalculator`](crate::OccurrenceCalculator). It is never mutated
//! afterwards; tests override individual fields with struct update syntax.

use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};
use crate::rule::MAX_OCCURRENCES;

/// Default ceiling on candidate evaluations per calculation (999 × 50).
pub const DEFAULT_MAX_OPERATIONS: usize = 49_950;

/// Default number of years a position or first-occurrence search looks ahead
/// when the series has neither an until date nor an occurrence count.
pub const DEFAULT_SEARCH_HORIZON_YEARS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalculationConfig {
    /// Most occurrences one call may return.
    pub max_occurrences: usize,
    /// Most candidate evaluations one call may perform before giving up with
    /// a "pattern too complex" error.
    pub max_operations: usize,
    /// Let range queries skip whole pattern steps that end before the range.
    ///
    /// Skipping never changes which occurrences are found, but skipped steps
    /// cost no operations: a range far from the series start can fail with
    /// [`RecurrenceError::PatternTooComplex`] when this is off and succeed
    /// when it is on.
    pub fast_fetch: bool,
    pub search_horizon_years: u32,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            max_occurrences: MAX_OCCURRENCES as usize,
            max_operations: DEFAULT_MAX_OPERATIONS,
            fast_fetch: true,
            search_horizon_years: DEFAULT_SEARCH_HORIZON_YEARS,
        }
    }
}

impl CalculationConfig {
    /// Parse a JSON object; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidConfig`] for malformed JSON, unknown
    /// keys, or limits that fail [`CalculationConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use recurrence_engine::CalculationConfig;
    ///
    /// let config = CalculationConfig::from_json(r#"{ "fast_fetch": false }"#).unwrap();
    /// assert!(!config.fast_fetch);
    /// assert_eq!(config.max_occurrences, 999);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RecurrenceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidConfig`] if a limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_occurrences == 0 {
            return Err(RecurrenceError::InvalidConfig(
                "max_occurrences must be at least 1".to_string(),
            ));
        }
        if self.max_operations == 0 {
            return Err(RecurrenceError::InvalidConfig(
                "max_operations must be at least 1".to_string(),
            ));
        }
        if self.search_horizon_years == 0 {
            return Err(RecurrenceError::InvalidConfig(
                "search_horizon_years must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
