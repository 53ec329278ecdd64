//! Duration argument parsing for `--older-than`
//!
//! Accepts `<int><unit>` where the unit is d (day), w (week, 7d),
//! m (month, 30d) or y (year, 365d). The result is a whole number of
//! days; retention math never needs finer resolution.

use thiserror::Error;

/// A malformed duration argument. Always a user error, never a panic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    /// Empty string or unit with no number.
    #[error("duration must be <number><unit>, got '{0}'")]
    Malformed(String),

    /// The numeric part is not a valid non-negative integer.
    #[error("invalid number in duration '{0}'")]
    BadNumber(String),

    /// Unit other than d/w/m/y.
    #[error("unknown duration unit '{unit}' in '{input}' (expected d, w, m or y)")]
    BadUnit {
        /// The offending unit character(s).
        unit: String,
        /// The full argument as given.
        input: String,
    },

    /// The day count overflows u32.
    #[error("duration '{0}' is out of range")]
    Overflow(String),
}

/// Parse a duration like `30d`, `4w`, `6m` or `1y` into days.
pub fn parse_duration(input: &str) -> Result<u32, DurationError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| DurationError::Malformed(trimmed.to_string()))?;
    let (number, unit) = trimmed.split_at(split);
    if number.is_empty() {
        return Err(DurationError::Malformed(trimmed.to_string()));
    }

    let value: u32 = number
        .parse()
        .map_err(|_| DurationError::BadNumber(trimmed.to_string()))?;

    let days_per_unit: u32 = match unit {
        "d" => 1,
        "w" => 7,
        "m" => 30,
        "y" => 365,
        other => {
            return Err(DurationError::BadUnit {
                unit: other.to_string(),
                input: trimmed.to_string(),
            })
        }
    };

    value
        .checked_mul(days_per_unit)
        .ok_or_else(|| DurationError::Overflow(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_all_units() {
        assert_eq!(parse_duration("30d"), Ok(30));
        assert_eq!(parse_duration("4w"), Ok(28));
        assert_eq!(parse_duration("6m"), Ok(180));
        assert_eq!(parse_duration("1y"), Ok(365));
        assert_eq!(parse_duration("0d"), Ok(0));
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(parse_duration(" 7d "), Ok(7));
    }

    #[test]
    fn rejects_missing_parts() {
        assert!(matches!(parse_duration(""), Err(DurationError::Malformed(_))));
        assert!(matches!(parse_duration("30"), Err(DurationError::Malformed(_))));
        assert!(matches!(parse_duration("d"), Err(DurationError::Malformed(_))));
    }

    #[test]
    fn rejects_bad_unit() {
        assert!(matches!(
            parse_duration("30h"),
            Err(DurationError::BadUnit { .. })
        ));
        assert!(matches!(
            parse_duration("30 d"),
            Err(DurationError::BadUnit { .. })
        ));
    }

    #[test]
    fn rejects_negative_and_fractional() {
        assert!(parse_duration("-5d").is_err());
        assert!(parse_duration("1.5d").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(matches!(
            parse_duration("4294967295y"),
            Err(DurationError::BadNumber(_)) | Err(DurationError::Overflow(_))
        ));
        assert!(matches!(
            parse_duration("700000000y"),
            Err(DurationError::Overflow(_))
        ));
    }

    proptest! {
        #[test]
        fn valid_durations_always_parse(value in 0u32..1_000_000, unit in "[dwmy]") {
            let input = format!("{}{}", value, unit);
            let days = parse_duration(&input).unwrap();
            let factor = match unit.as_str() {
                "d" => 1,
                "w" => 7,
                "m" => 30,
                _ => 365,
            };
            prop_assert_eq!(days, value * factor);
        }

        #[test]
        fn parser_never_panics(input in ".{0,16}") {
            let _ = parse_duration(&input);
        }
    }
}
