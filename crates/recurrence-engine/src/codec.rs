//! Legacy pipe-delimited rule encoding.
//!
//! A rule is persisted as a flat run of `key|value|` tokens with single
//! character keys:
//!
//! | key | field                                  |
//! |-----|----------------------------------------|
//! | `t` | type id (0 none, 1 daily, 2 weekly, 3 monthly, 4 yearly) |
//! | `i` | interval                               |
//! | `a` | weekday mask                           |
//! | `b` | day in month, or ordinal               |
//! | `c` | month, zero-based                      |
//! | `s` | series start, epoch millis             |
//! | `e` | until, epoch millis                    |
//! | `o` | occurrence count                       |
//!
//! For example a rule repeating every other Monday and Wednesday, five times,
//! encodes as `t|2|i|2|a|10|s|1767603600000|o|5|`. The text is stored
//! verbatim, so [`encode`] must stay byte-compatible with existing rows.

use chrono_tz::Tz;

use crate::error::{RecurrenceError, Result};
use crate::rule::{RecurrenceRule, RuleFields};

pub const DELIMITER: char = '|';

type FieldSetter = fn(&mut RuleFields, i64);

/// Decoding dispatch: every key the format knows and the field it fills.
const FIELD_SETTERS: &[(&str, FieldSetter)] = &[
    ("t", |f: &mut RuleFields, v: i64| f.kind = Some(v)),
    ("i", |f: &mut RuleFields, v: i64| f.interval = Some(v)),
    ("a", |f: &mut RuleFields, v: i64| f.weekday_mask = Some(v)),
    ("b", |f: &mut RuleFields, v: i64| f.day_in_month = Some(v)),
    ("c", |f: &mut RuleFields, v: i64| f.month = Some(v)),
    ("s", |f: &mut RuleFields, v: i64| f.series_start = Some(v)),
    ("e", |f: &mut RuleFields, v: i64| f.until = Some(v)),
    ("o", |f: &mut RuleFields, v: i64| f.occurrence_count = Some(v)),
];

/// Encode a rule. Only the fields its kind uses are written, in the fixed
/// order `t i a b c s e o`.
pub fn encode(rule: &RecurrenceRule) -> String {
    encode_tokens(&rule.to_fields())
}

/// Validate raw fields and encode the resulting rule.
///
/// Applies the same checks and the same two clamps (interval and occurrence
/// count above 999) as [`RecurrenceRule::from_fields`].
///
/// # Errors
///
/// Returns [`RecurrenceError::InvalidRule`] if the fields do not describe a
/// valid rule.
pub fn encode_fields(fields: &RuleFields, zone: Tz) -> Result<String> {
    RecurrenceRule::from_fields(fields, zone).map(|rule| encode(&rule))
}

/// Decode an encoded rule. The calculation zone is not part of the text and
/// must be supplied by the caller; it decides how `until` is normalized.
///
/// `decode(&encode(&r), r.calculation_time_zone()) == Ok(r)` for every rule.
///
/// # Errors
///
/// Returns [`RecurrenceError::MalformedEncoding`] for an unknown key, a key
/// without a value, a non-numeric value, or a missing `t` / `s` token, and
/// [`RecurrenceError::InvalidRule`] if the decoded fields fail validation.
pub fn decode(encoded: &str, zone: Tz) -> Result<RecurrenceRule> {
    let fields = parse_fields(encoded)?;
    if fields.kind.is_none() {
        return Err(malformed("missing type token 't'"));
    }
    if fields.series_start.is_none() {
        return Err(malformed("missing series start token 's'"));
    }
    RecurrenceRule::from_fields(&fields, zone)
}

/// Build a rule from what the storage layer has: the encoded text when one
/// was persisted, otherwise the discrete columns.
///
/// # Errors
///
/// Propagates the errors of [`decode`] or [`RecurrenceRule::from_fields`].
pub fn decode_or_derive(
    encoded: Option<&str>,
    fields: &RuleFields,
    zone: Tz,
) -> Result<RecurrenceRule> {
    match encoded.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => decode(text, zone),
        None => RecurrenceRule::from_fields(fields, zone),
    }
}

/// Tokenize an encoded rule into raw fields without validating them.
///
/// A later duplicate key overwrites an earlier one. The trailing delimiter is
/// optional.
///
/// # Errors
///
/// Returns [`RecurrenceError::MalformedEncoding`] on an unknown key, a
/// dangling key, or a value that is not an integer.
pub fn parse_fields(encoded: &str) -> Result<RuleFields> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty rule string"));
    }
    let body = trimmed.strip_suffix(DELIMITER).unwrap_or(trimmed);
    let tokens: Vec<&str> = body.split(DELIMITER).collect();

    let mut fields = RuleFields::default();
    for pair in tokens.chunks(2) {
        let &[key, value] = pair else {
            return Err(malformed(format!("key '{}' has no value", pair[0])));
        };
        let setter = FIELD_SETTERS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, setter)| setter)
            .ok_or_else(|| malformed(format!("unknown key '{key}'")))?;
        let value: i64 = value
            .trim()
            .parse()
            .map_err(|_| malformed(format!("value '{value}' of key '{key}' is not an integer")))?;
        setter(&mut fields, value);
    }
    Ok(fields)
}

fn encode_tokens(fields: &RuleFields) -> String {
    let tokens = [
        ("t", fields.kind),
        ("i", fields.interval),
        ("a", fields.weekday_mask),
        ("b", fields.day_in_month),
        ("c", fields.month),
        ("s", fields.series_start),
        ("e", fields.until),
        ("o", fields.occurrence_count),
    ];

    let mut out = String::new();
    for (key, value) in tokens {
        if let Some(value) = value {
            out.push_str(&format!("{key}{DELIMITER}{value}{DELIMITER}"));
        }
    }
    out
}

fn malformed(message: impl Into<String>) -> RecurrenceError {
    RecurrenceError::MalformedEncoding(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RecurrenceKind, WeekdayMask};
    use chrono::{DateTime, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
    }

    fn ms(t: DateTime<Utc>) -> i64 {
        t.timestamp_millis()
    }

    #[test]
    fn test_encode_weekly_exact_text() {
        let rule = RecurrenceRule::builder(start())
            .weekly(WeekdayMask::MONDAY | WeekdayMask::WEDNESDAY)
            .interval(2)
            .occurrence_count(5)
            .build()
            .unwrap();
        assert_eq!(encode(&rule), "t|2|i|2|a|10|s|1767603600000|o|5|");
    }

    #[test]
    fn test_encode_yearly_by_weekday_exact_text() {
        let until = Utc.with_ymd_and_hms(2030, 12, 31, 0, 0, 0).unwrap();
        let rule = RecurrenceRule::builder(start())
            .yearly_by_weekday(10, 4, WeekdayMask::THURSDAY)
            .until(until)
            .build()
            .unwrap();
        assert_eq!(
            encode(&rule),
            format!("t|4|i|1|a|16|b|4|c|10|s|{}|e|{}|", ms(start()), ms(until))
        );
    }

    #[test]
    fn test_encode_none_rule() {
        let rule = RecurrenceRule::builder(start()).build().unwrap();
        assert_eq!(encode(&rule), format!("t|0|s|{}|", ms(start())));
    }

    #[test]
    fn test_display_matches_encode() {
        let rule = RecurrenceRule::builder(start()).daily().build().unwrap();
        assert_eq!(rule.to_string(), encode(&rule));
    }

    #[test]
    fn test_decode_daily() {
        let text = format!("t|1|i|3|s|{}|o|10|", ms(start()));
        let rule = decode(&text, Tz::UTC).unwrap();
        assert_eq!(rule.kind(), RecurrenceKind::Daily);
        assert_eq!(rule.interval(), 3);
        assert_eq!(rule.series_start(), start());
        assert_eq!(rule.occurrence_count(), Some(10));
        assert_eq!(rule.until(), None);
    }

    #[test]
    fn test_decode_accepts_missing_trailing_delimiter() {
        let text = format!("t|1|i|1|s|{}", ms(start()));
        assert!(decode(&text, Tz::UTC).is_ok());
    }

    #[test]
    fn test_decode_remaps_legacy_monthly_and_yearly_ids() {
        let monthly = decode(&format!("t|5|i|1|b|15|s|{}|", ms(start())), Tz::UTC).unwrap();
        assert_eq!(monthly.kind(), RecurrenceKind::MonthlyByDay);
        assert_eq!(monthly.kind().legacy_type_id(), 3);
        assert!(encode(&monthly).starts_with("t|3|"));

        let yearly = decode(&format!("t|6|i|1|a|2|b|1|c|8|s|{}|", ms(start())), Tz::UTC).unwrap();
        assert_eq!(yearly.kind(), RecurrenceKind::YearlyByWeekday);
        assert!(encode(&yearly).starts_with("t|4|"));
    }

    #[test]
    fn test_decode_clamps_interval_and_occurrences() {
        let text = format!("t|1|i|5000|s|{}|o|1200|", ms(start()));
        let rule = decode(&text, Tz::UTC).unwrap();
        assert_eq!(rule.interval(), 999);
        assert_eq!(rule.occurrence_count(), Some(999));
    }

    #[test]
    fn test_decode_unknown_key_is_malformed() {
        let err = decode(&format!("t|1|i|1|z|4|s|{}|", ms(start())), Tz::UTC).unwrap_err();
        assert!(matches!(err, RecurrenceError::MalformedEncoding(_)), "got: {err}");
        assert!(err.to_string().contains("unknown key 'z'"), "got: {err}");
    }

    #[test]
    fn test_decode_dangling_key_is_malformed() {
        let err = decode("t|1|i|1|s", Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("key 's' has no value"), "got: {err}");
    }

    #[test]
    fn test_decode_non_numeric_value_is_malformed() {
        let err = decode("t|1|i|x|s|0|", Tz::UTC).unwrap_err();
        assert!(matches!(err, RecurrenceError::MalformedEncoding(_)), "got: {err}");
    }

    #[test]
    fn test_decode_requires_type_and_start() {
        let err = decode("i|1|s|0|", Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("'t'"), "got: {err}");
        let err = decode("t|1|i|1|", Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("'s'"), "got: {err}");
        assert!(decode("   ", Tz::UTC).is_err());
    }

    #[test]
    fn test_decode_invalid_fields_are_invalid_rule() {
        let err = decode(&format!("t|3|i|1|a|2|b|6|s|{}|", ms(start())), Tz::UTC).unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidRule(_)), "got: {err}");
    }

    #[test]
    fn test_round_trip_in_non_utc_zone() {
        let zone: Tz = "America/New_York".parse().unwrap();
        let rule = RecurrenceRule::builder(start())
            .monthly_by_weekday(5, WeekdayMask::FRIDAY)
            .interval(2)
            .until(Utc.with_ymd_and_hms(2026, 12, 1, 5, 0, 0).unwrap())
            .zone(zone)
            .build()
            .unwrap();
        assert_eq!(decode(&encode(&rule), zone).unwrap(), rule);
    }

    #[test]
    fn test_encode_fields_validates() {
        let fields = RuleFields {
            kind: Some(2),
            interval: Some(1),
            series_start: Some(0),
            ..RuleFields::default()
        };
        assert!(matches!(
            encode_fields(&fields, Tz::UTC),
            Err(RecurrenceError::InvalidRule(_))
        ));
    }

    #[test]
    fn test_encode_fields_clamps_and_drops_unused_fields() {
        let fields = RuleFields {
            kind: Some(1),
            interval: Some(1500),
            month: Some(4),
            series_start: Some(0),
            ..RuleFields::default()
        };
        assert_eq!(encode_fields(&fields, Tz::UTC).unwrap(), "t|1|i|999|s|0|");
    }

    #[test]
    fn test_decode_or_derive_prefers_encoded_text() {
        let fields = RuleFields {
            kind: Some(1),
            interval: Some(7),
            series_start: Some(0),
            ..RuleFields::default()
        };
        let from_text = decode_or_derive(Some("t|1|i|2|s|0|"), &fields, Tz::UTC).unwrap();
        assert_eq!(from_text.interval(), 2);

        let from_fields = decode_or_derive(Some("  "), &fields, Tz::UTC).unwrap();
        assert_eq!(from_fields.interval(), 7);
        assert_eq!(decode_or_derive(None, &fields, Tz::UTC).unwrap(), from_fields);
    }
}
