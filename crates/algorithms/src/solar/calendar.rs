//! UTC timestamps broken into the calendar fields the solar formulas use

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;
use sunraster_core::{Error, Result};

/// Calendar fields of a UTC instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// 1-366
    pub day_of_year: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Every fourth year is a leap year.
///
/// Century years are not special-cased: 1900 and 2100 count as leap
/// years here. At NOAA-approximation accuracy the difference is negligible.
pub fn is_leap_year(year: i32) -> bool {
    year.rem_euclid(4) == 0
}

/// Days in `year` under [`is_leap_year`]
pub fn year_length(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

impl TimeFields {
    /// Parse `YYYY-MM-DDTHH:MM:SS`.
    ///
    /// A space may replace the `T`, seconds may be omitted, a trailing `Z`
    /// is accepted and a bare `YYYY-MM-DD` means midnight.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |field: &'static str, reason: &str| Error::InvalidTimestamp {
            input: input.to_string(),
            field,
            reason: reason.to_string(),
        };

        let text = input.trim();
        let text = text.strip_suffix('Z').unwrap_or(text);
        let (date, time) = match text.split_once(['T', ' ']) {
            Some((d, t)) => (d, Some(t)),
            None => (text, None),
        };

        let date_parts: Vec<&str> = date.split('-').collect();
        let [year, month, day] = date_parts[..] else {
            return Err(invalid("format", "expected YYYY-MM-DD[THH:MM:SS]"));
        };
        let year: i32 = number(year).ok_or_else(|| invalid("year", "is not a number"))?;
        let month: u32 = number(month).ok_or_else(|| invalid("month", "is not a number"))?;
        let day: u32 = number(day).ok_or_else(|| invalid("day", "is not a number"))?;

        let (hour, minute, second) = match time {
            None => (0, 0, 0),
            Some(t) => {
                let parts: Vec<&str> = t.split(':').collect();
                let (h, m, s) = match parts[..] {
                    [h, m] => (h, m, "0"),
                    [h, m, s] => (h, m, s),
                    _ => return Err(invalid("format", "expected HH:MM[:SS]")),
                };
                (
                    number::<u32>(h).ok_or_else(|| invalid("hour", "is not a number"))?,
                    number::<u32>(m).ok_or_else(|| invalid("minute", "is not a number"))?,
                    number::<u32>(s).ok_or_else(|| invalid("second", "is not a number"))?,
                )
            }
        };

        if !(1..=12).contains(&month) {
            return Err(invalid("month", "must be 1-12"));
        }
        if hour > 23 {
            return Err(invalid("hour", "must be 0-23"));
        }
        if minute > 59 {
            return Err(invalid("minute", "must be 0-59"));
        }
        if second > 59 {
            return Err(invalid("second", "must be 0-59"));
        }

        let datetime = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| invalid("day", "does not exist in that month"))?
            .and_hms_opt(hour, minute, second)
            .ok_or_else(|| invalid("format", "invalid time of day"))?;

        Ok(Self::from_datetime(datetime))
    }

    /// Fields of a naive UTC date-time
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            day_of_year: dt.ordinal(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }

    /// Back to a naive UTC date-time
    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, self.second))
            .ok_or_else(|| Error::InvalidTimestamp {
                input: self.to_string(),
                field: "format",
                reason: "fields do not form a valid date-time".into(),
            })
    }

    /// The instant `minutes` later (earlier if negative)
    pub fn advance_minutes(&self, minutes: i64) -> Result<Self> {
        let overflow = || Error::InvalidTimestamp {
            input: self.to_string(),
            field: "minute",
            reason: format!("advancing by {} minutes leaves the calendar range", minutes),
        };
        let delta = Duration::try_minutes(minutes).ok_or_else(overflow)?;
        let dt = self
            .to_datetime()?
            .checked_add_signed(delta)
            .ok_or_else(overflow)?;
        Ok(Self::from_datetime(dt))
    }

    /// Days in this timestamp's year
    pub fn year_length(&self) -> u32 {
        year_length(self.year)
    }

    /// Minutes since midnight, fractional seconds included
    pub fn minutes_of_day(&self) -> f64 {
        self.hour as f64 * 60.0 + self.minute as f64 + self.second as f64 / 60.0
    }

    /// Orbital angle γ in radians, centred so that noon of day 1 is 0
    pub fn fractional_year(&self) -> f64 {
        let hours = self.hour as f64 + self.minute as f64 / 60.0 + self.second as f64 / 3600.0;
        TAU / self.year_length() as f64 * (self.day_of_year as f64 - 1.0 + (hours - 12.0) / 24.0)
    }
}

fn number<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for TimeFields {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_year_length_every_four_years() {
        assert_eq!(year_length(2024), 366);
        assert_eq!(year_length(2023), 365);
        assert_eq!(year_length(2000), 366);
        assert_eq!(year_length(1900), 366);
    }

    #[test]
    fn test_parse_iso() {
        let t = TimeFields::parse("2022-09-23T12:00:00").unwrap();
        assert_eq!((t.year, t.month, t.day), (2022, 9, 23));
        assert_eq!(t.day_of_year, 266);
        assert_eq!((t.hour, t.minute, t.second), (12, 0, 0));
        assert_eq!(t.to_string(), "2022-09-23T12:00:00");
    }

    #[test]
    fn test_parse_variants() {
        let space: TimeFields = "2024-12-31 23:59:30".parse().unwrap();
        assert_eq!(space.day_of_year, 366);
        assert_eq!(space.second, 30);

        let bare = TimeFields::parse("2024-03-01").unwrap();
        assert_eq!((bare.hour, bare.minute, bare.second), (0, 0, 0));

        let zulu = TimeFields::parse("2024-03-01T06:30Z").unwrap();
        assert_eq!((zulu.hour, zulu.minute), (6, 30));
    }

    #[test]
    fn test_parse_names_offending_field() {
        let field = |s: &str| match TimeFields::parse(s) {
            Err(Error::InvalidTimestamp { field, .. }) => field,
            other => panic!("expected InvalidTimestamp for {s}, got {other:?}"),
        };
        assert_eq!(field("2022-13-01T00:00:00"), "month");
        assert_eq!(field("2023-02-29T00:00:00"), "day");
        assert_eq!(field("2022-01-01T24:00:00"), "hour");
        assert_eq!(field("2022-01-01T10:60:00"), "minute");
        assert_eq!(field("2022-01-01T10:00:61"), "second");
        assert_eq!(field("yesterday"), "format");
        assert_eq!(field("2022-01-xx"), "day");
        assert_eq!(field("2022-01-01T10"), "format");
    }

    #[test]
    fn test_fractional_year_zero_at_noon_day_one() {
        let t = TimeFields::parse("2023-01-01T12:00:00").unwrap();
        assert_relative_eq!(t.fractional_year(), 0.0, epsilon = 1e-15);

        let t = TimeFields::parse("2024-01-02T00:00:00").unwrap();
        assert_relative_eq!(t.fractional_year(), TAU / 366.0 * 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_advance_minutes_crosses_day() {
        let t = TimeFields::parse("2022-12-31T23:50:00").unwrap();
        let next = t.advance_minutes(20).unwrap();
        assert_eq!(next.to_string(), "2023-01-01T00:10:00");
        assert_eq!(next.day_of_year, 1);
        assert_eq!(next.advance_minutes(-20).unwrap(), t);
        assert_relative_eq!(next.minutes_of_day(), 10.0);
    }
}
