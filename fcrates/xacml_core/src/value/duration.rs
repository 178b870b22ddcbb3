//! I define the two XACML duration datatypes, which XML Schema's
//! `xs:duration` splits apart: [`DayTimeDuration`] (days/hours/minutes/
//! seconds) and [`YearMonthDuration`] (years/months). Neither maps onto
//! [`chrono::Duration`] directly because XACML keeps them comparable only
//! within their own kind (no "3 months == 90 days" widening).

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

/// `urn:oasis:names:tc:xacml:2.0:data-type:dayTimeDuration`.
#[derive(Debug, Clone, Copy)]
pub struct DayTimeDuration {
    negative: bool,
    days: u64,
    hours: u64,
    minutes: u64,
    /// Whole seconds; fractional seconds are not modeled (no XACML standard
    /// function observes them).
    seconds: u64,
}

impl DayTimeDuration {
    /// Total signed seconds, used for equality, ordering, and arithmetic.
    fn total_seconds(&self) -> i64 {
        let total = (self.days as i64) * 86_400
            + (self.hours as i64) * 3_600
            + (self.minutes as i64) * 60
            + self.seconds as i64;
        if self.negative {
            -total
        } else {
            total
        }
    }
}

/// XML-Schema value equality: `PT1H` and `PT60M` name the same duration and
/// must compare equal, per XACML §A.3's `dayTimeDuration-equal`.
impl PartialEq for DayTimeDuration {
    fn eq(&self, other: &Self) -> bool {
        self.total_seconds() == other.total_seconds()
    }
}

impl Eq for DayTimeDuration {}

impl Hash for DayTimeDuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.total_seconds().hash(state);
    }
}

impl PartialOrd for DayTimeDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_seconds().cmp(&other.total_seconds()))
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "P{}DT{}H{}M{}S", self.days, self.hours, self.minutes, self.seconds)
    }
}

impl FromStr for DayTimeDuration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let rest = rest
            .strip_prefix('P')
            .ok_or(DurationParseError::MissingPeriodMarker)?;
        let (date_part, time_part) = match rest.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (rest, None),
        };
        let days = match date_part.strip_suffix('D') {
            Some(n) if !n.is_empty() => n.parse().map_err(|_| DurationParseError::InvalidNumber)?,
            Some(_) => return Err(DurationParseError::InvalidNumber),
            None if date_part.is_empty() => 0,
            None => return Err(DurationParseError::UnexpectedDateComponent),
        };
        let mut hours = 0;
        let mut minutes = 0;
        let mut seconds = 0;
        if let Some(time_part) = time_part {
            let mut remaining = time_part;
            if let Some(idx) = remaining.find('H') {
                hours = remaining[..idx]
                    .parse()
                    .map_err(|_| DurationParseError::InvalidNumber)?;
                remaining = &remaining[idx + 1..];
            }
            if let Some(idx) = remaining.find('M') {
                minutes = remaining[..idx]
                    .parse()
                    .map_err(|_| DurationParseError::InvalidNumber)?;
                remaining = &remaining[idx + 1..];
            }
            if let Some(idx) = remaining.find('S') {
                seconds = remaining[..idx]
                    .parse()
                    .map_err(|_| DurationParseError::InvalidNumber)?;
                remaining = &remaining[idx + 1..];
            }
            if !remaining.is_empty() {
                return Err(DurationParseError::TrailingGarbage);
            }
        }
        Ok(Self {
            negative,
            days,
            hours,
            minutes,
            seconds,
        })
    }
}

/// `urn:oasis:names:tc:xacml:2.0:data-type:yearMonthDuration`.
#[derive(Debug, Clone, Copy)]
pub struct YearMonthDuration {
    negative: bool,
    years: u64,
    months: u64,
}

impl YearMonthDuration {
    /// Total signed months, used for equality, ordering, and arithmetic.
    fn total_months(&self) -> i64 {
        let total = (self.years as i64) * 12 + self.months as i64;
        if self.negative {
            -total
        } else {
            total
        }
    }
}

/// XML-Schema value equality: `P1Y` and `P12M` name the same duration and
/// must compare equal, per XACML §A.3's `yearMonthDuration-equal`.
impl PartialEq for YearMonthDuration {
    fn eq(&self, other: &Self) -> bool {
        self.total_months() == other.total_months()
    }
}

impl Eq for YearMonthDuration {}

impl Hash for YearMonthDuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.total_months().hash(state);
    }
}

impl PartialOrd for YearMonthDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_months().cmp(&other.total_months()))
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "P{}Y{}M", self.years, self.months)
    }
}

impl FromStr for YearMonthDuration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut remaining = rest
            .strip_prefix('P')
            .ok_or(DurationParseError::MissingPeriodMarker)?;
        let mut years = 0;
        let mut months = 0;
        if let Some(idx) = remaining.find('Y') {
            years = remaining[..idx]
                .parse()
                .map_err(|_| DurationParseError::InvalidNumber)?;
            remaining = &remaining[idx + 1..];
        }
        if let Some(idx) = remaining.find('M') {
            months = remaining[..idx]
                .parse()
                .map_err(|_| DurationParseError::InvalidNumber)?;
            remaining = &remaining[idx + 1..];
        }
        if !remaining.is_empty() {
            return Err(DurationParseError::TrailingGarbage);
        }
        Ok(Self {
            negative,
            years,
            months,
        })
    }
}

/// Error parsing a duration lexical form.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum DurationParseError {
    /// Lexical form did not start with (optional `-` then) `P`.
    #[error("duration lexical form must start with 'P' (after an optional '-')")]
    MissingPeriodMarker,
    /// A numeric field failed to parse as an unsigned integer.
    #[error("invalid numeric duration field")]
    InvalidNumber,
    /// dayTimeDuration's date part had content other than a `D` field.
    #[error("dayTimeDuration date component must be a plain day count")]
    UnexpectedDateComponent,
    /// Characters remained after the last recognized field.
    #[error("trailing characters after duration fields")]
    TrailingGarbage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_time_duration() {
        let d: DayTimeDuration = "P1DT2H30M5S".parse().unwrap();
        assert_eq!(d.to_string(), "P1DT2H30M5S");
    }

    #[test]
    fn day_time_duration_ordering() {
        let a: DayTimeDuration = "P1D".parse().unwrap();
        let b: DayTimeDuration = "PT25H".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn parses_year_month_duration() {
        let d: YearMonthDuration = "-P1Y6M".parse().unwrap();
        assert_eq!(d.to_string(), "-P1Y6M");
    }
}
