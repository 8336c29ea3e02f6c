//! # Start specifiers and duration text.
//!
//! A descriptor's `start` is either empty, absolute (`"1500ms"`) or relative
//! (`"+250ms"`). Empty means relative `+1ms`.
//!
//! Durations use unit-suffixed decimal numbers and may be compound:
//! `300ms`, `1.5s`, `2m30s`, `1h`, `10us`/`10µs`. A bare `0` is zero.
//! [`format_duration`] prints the largest exact unit so a parsed value formats
//! back to text that parses to the same value.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Offset used when a descriptor has no `start`.
pub const DEFAULT_RELATIVE: Duration = Duration::from_millis(1);

/// Why a duration string was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid duration {input:?}: {reason}")]
pub struct DurationError {
    input: String,
    reason: &'static str,
}

impl DurationError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// When a task fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartSpec {
    /// Offset from journey start.
    Absolute(Duration),
    /// Offset from the completion of the preceding task.
    Relative(Duration),
}

impl StartSpec {
    /// Parses a `start` field. Empty text is `Relative(1ms)`.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use cuj_runner::StartSpec;
    ///
    /// assert_eq!(StartSpec::parse("1500ms").unwrap(), StartSpec::Absolute(Duration::from_millis(1500)));
    /// assert_eq!(StartSpec::parse("+2s").unwrap(), StartSpec::Relative(Duration::from_secs(2)));
    /// assert_eq!(StartSpec::parse("").unwrap(), StartSpec::Relative(Duration::from_millis(1)));
    /// ```
    pub fn parse(raw: &str) -> Result<Self, DurationError> {
        if raw.is_empty() {
            return Ok(StartSpec::Relative(DEFAULT_RELATIVE));
        }
        match raw.strip_prefix('+') {
            Some(rel) => parse_duration(rel).map(StartSpec::Relative),
            None => parse_duration(raw).map(StartSpec::Absolute),
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, StartSpec::Relative(_))
    }

    pub fn offset(&self) -> Duration {
        match *self {
            StartSpec::Absolute(d) | StartSpec::Relative(d) => d,
        }
    }
}

impl fmt::Display for StartSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StartSpec::Absolute(d) => f.write_str(&format_duration(d)),
            StartSpec::Relative(d) => write!(f, "+{}", format_duration(d)),
        }
    }
}

const NANOS_PER_UNIT: [(&str, u128); 6] = [
    ("h", 3_600_000_000_000),
    ("m", 60_000_000_000),
    ("s", 1_000_000_000),
    ("ms", 1_000_000),
    ("us", 1_000),
    ("ns", 1),
];

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "µs" | "μs" => Some(1_000),
        _ => NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, n)| *n),
    }
}

/// Parses unit-suffixed duration text (`"250ms"`, `"1m30s"`, `"1.5s"`).
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err(DurationError::new(input, "empty duration"));
    }

    let mut rest = input;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);
        rest = after_int;

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DurationError::new(input, "missing number"));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (unit, after_unit) = rest.split_at(unit_len);
        rest = after_unit;
        if unit.is_empty() {
            return Err(DurationError::new(input, "missing unit"));
        }
        let per_unit = unit_nanos(unit).ok_or_else(|| DurationError::new(input, "unknown unit"))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| DurationError::new(input, "number out of range"))?
        };
        let mut nanos = whole
            .checked_mul(per_unit)
            .ok_or_else(|| DurationError::new(input, "duration out of range"))?;

        if !frac_part.is_empty() {
            // Digits past nanosecond precision of the largest unit carry no weight.
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits
                .parse()
                .map_err(|_| DurationError::new(input, "number out of range"))?;
            nanos += frac * per_unit / 10u128.pow(digits.len() as u32);
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| DurationError::new(input, "duration out of range"))?;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| DurationError::new(input, "duration out of range"))
}

/// Formats a duration using the largest unit that divides it exactly.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cuj_runner::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
/// assert_eq!(format_duration(Duration::from_secs(120)), "2m");
/// assert_eq!(format_duration(Duration::ZERO), "0s");
/// ```
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    NANOS_PER_UNIT
        .iter()
        .find(|(_, per)| nanos % per == 0)
        .map(|(unit, per)| format!("{}{unit}", nanos / per))
        .unwrap_or_else(|| format!("{nanos}ns"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("250ms").unwrap(), ms(250));
        assert_eq!(parse_duration("2s").unwrap(), ms(2000));
        assert_eq!(parse_duration("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("15ns").unwrap(), Duration::from_nanos(15));
    }

    #[test]
    fn test_parse_micro_spellings() {
        let want = Duration::from_micros(10);
        assert_eq!(parse_duration("10us").unwrap(), want);
        assert_eq!(parse_duration("10µs").unwrap(), want);
        assert_eq!(parse_duration("10μs").unwrap(), want);
    }

    #[test]
    fn test_parse_fraction_and_compound() {
        assert_eq!(parse_duration("1.5s").unwrap(), ms(1500));
        assert_eq!(parse_duration(".5s").unwrap(), ms(500));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h2m3s4ms").unwrap(), Duration::from_millis(3_723_004));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "5", "ms", "1.5", "10 s", "1d", "-1s", "+1s", "s1", "1..5s"] {
            assert!(parse_duration(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse_duration("99999999999999999999999h").is_err());
        assert!(parse_duration("9999999999h").is_err());
    }

    #[test]
    fn test_start_spec_classification() {
        assert_eq!(StartSpec::parse("0s").unwrap(), StartSpec::Absolute(Duration::ZERO));
        assert_eq!(StartSpec::parse("+0s").unwrap(), StartSpec::Relative(Duration::ZERO));
        assert_eq!(StartSpec::parse("").unwrap(), StartSpec::Relative(ms(1)));
        assert!(StartSpec::parse("+").is_err());
        assert!(StartSpec::parse("++1s").is_err());

        let rel = StartSpec::parse("+250ms").unwrap();
        assert!(rel.is_relative());
        assert_eq!(rel.offset(), ms(250));
        let abs = StartSpec::parse("2s").unwrap();
        assert!(!abs.is_relative());
        assert_eq!(abs.offset(), Duration::from_secs(2));
    }

    #[test]
    fn test_format_is_reparseable() {
        for d in [ms(1), ms(1500), Duration::from_secs(60), Duration::from_nanos(7), Duration::from_micros(1001)] {
            let text = format_duration(d);
            assert_eq!(parse_duration(&text).unwrap(), d, "{text}");
        }
        assert_eq!(StartSpec::Relative(ms(250)).to_string(), "+250ms");
        assert_eq!(StartSpec::Absolute(Duration::from_secs(2)).to_string(), "2s");
    }
}
