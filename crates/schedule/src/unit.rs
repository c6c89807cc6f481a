//! Calendar steps used to roll a periodic window forward or back.

use std::fmt;
use std::str::FromStr;

use cad_domain::{Error, Result};
use chrono::{DateTime, Months, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::calendar::{resolve_local, within_range};

/// The calendar field a [`CalendarUnit`] steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalendarField {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for CalendarField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "millisecond" | "milliseconds" | "ms" => Ok(Self::Millisecond),
            "second" | "seconds" | "s" => Ok(Self::Second),
            "minute" | "minutes" | "m" => Ok(Self::Minute),
            "hour" | "hours" | "h" => Ok(Self::Hour),
            "day" | "days" | "d" => Ok(Self::Day),
            "week" | "weeks" | "w" => Ok(Self::Week),
            "month" | "months" => Ok(Self::Month),
            "year" | "years" | "y" => Ok(Self::Year),
            other => Err(Error::Config(format!("unknown calendar field '{other}'"))),
        }
    }
}

impl fmt::Display for CalendarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Millisecond => "millisecond",
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        };
        f.write_str(name)
    }
}

/// A period step such as `+1 month`.
///
/// Day and longer steps move the local calendar date in the evaluation zone
/// and keep the wall-clock time, so a day across a DST change is 23 or 25
/// hours and a month is however long that month is.  Shorter steps are
/// fixed durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CalendarUnit {
    field: CalendarField,
    value: i32,
}

impl CalendarUnit {
    /// Fails on a zero magnitude, which could never advance a window.
    pub fn new(field: CalendarField, value: i32) -> Result<Self> {
        if value == 0 {
            return Err(Error::Config(format!("calendar unit of 0 {field}s never advances")));
        }
        Ok(Self { field, value })
    }

    /// Resolve a unit written as `"month"`, `"2 weeks"` or `"-1 day"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (value, field) = match s.split_once(char::is_whitespace) {
            Some((n, field)) => {
                let value = n
                    .parse::<i32>()
                    .map_err(|_| Error::Config(format!("invalid calendar unit '{s}'")))?;
                (value, field)
            }
            None => (1, s),
        };
        Self::new(field.parse()?, value)
    }

    pub const fn day() -> Self {
        Self { field: CalendarField::Day, value: 1 }
    }

    pub const fn week() -> Self {
        Self { field: CalendarField::Week, value: 1 }
    }

    pub const fn month() -> Self {
        Self { field: CalendarField::Month, value: 1 }
    }

    pub const fn year() -> Self {
        Self { field: CalendarField::Year, value: 1 }
    }

    pub fn field(&self) -> CalendarField {
        self.field
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    /// Move `instant` by `times` steps in `tz`.  `None` when the result
    /// falls outside the representable range.
    pub fn step(&self, instant: DateTime<Utc>, tz: Tz, times: i32) -> Option<DateTime<Utc>> {
        let n = i64::from(self.value).checked_mul(i64::from(times))?;
        let fixed = |delta: Option<TimeDelta>| instant.checked_add_signed(delta?);

        match self.field {
            CalendarField::Millisecond => fixed(TimeDelta::try_milliseconds(n)),
            CalendarField::Second => fixed(TimeDelta::try_seconds(n)),
            CalendarField::Minute => fixed(TimeDelta::try_minutes(n)),
            CalendarField::Hour => fixed(TimeDelta::try_hours(n)),
            CalendarField::Day => shift_days(instant, tz, n),
            CalendarField::Week => shift_days(instant, tz, n.checked_mul(7)?),
            CalendarField::Month => shift_months(instant, tz, n),
            CalendarField::Year => shift_months(instant, tz, n.checked_mul(12)?),
        }
    }
}

impl fmt::Display for CalendarUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+} {}", self.value, self.field)
    }
}

fn shift_days(instant: DateTime<Utc>, tz: Tz, days: i64) -> Option<DateTime<Utc>> {
    if !within_range(instant) {
        return None;
    }
    let local = instant.with_timezone(&tz).naive_local();
    let shifted = local.checked_add_signed(TimeDelta::try_days(days)?)?;
    within_range(shifted.and_utc()).then(|| resolve_local(tz, shifted))
}

fn shift_months(instant: DateTime<Utc>, tz: Tz, months: i64) -> Option<DateTime<Utc>> {
    if !within_range(instant) {
        return None;
    }
    let local = instant.with_timezone(&tz).naive_local();
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    let shifted = if months >= 0 {
        local.checked_add_months(magnitude)?
    } else {
        local.checked_sub_months(magnitude)?
    };
    within_range(shifted.and_utc()).then(|| resolve_local(tz, shifted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn parse_forms() {
        assert_eq!(CalendarUnit::parse("month").unwrap(), CalendarUnit::month());
        assert_eq!(
            CalendarUnit::parse("2 weeks").unwrap(),
            CalendarUnit::new(CalendarField::Week, 2).unwrap()
        );
        assert_eq!(CalendarUnit::parse("-1 day").unwrap().value(), -1);
    }

    #[test]
    fn unresolvable_units_are_config_errors() {
        assert!(matches!(CalendarUnit::parse("fortnight"), Err(Error::Config(_))));
        assert!(matches!(CalendarUnit::parse("x days"), Err(Error::Config(_))));
        assert!(matches!(
            CalendarUnit::new(CalendarField::Day, 0),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn month_step_clamps_to_short_month() {
        let jan31 = utc(2023, 1, 31, 12);
        let step = CalendarUnit::month().step(jan31, chrono_tz::UTC, 1).unwrap();
        assert_eq!(step, utc(2023, 2, 28, 12));
        let back = CalendarUnit::month().step(utc(2024, 3, 31, 12), chrono_tz::UTC, -1);
        assert_eq!(back, Some(utc(2024, 2, 29, 12)));
    }

    #[test]
    fn year_step_from_leap_day() {
        let leap = utc(2024, 2, 29, 0);
        let step = CalendarUnit::year().step(leap, chrono_tz::UTC, 1).unwrap();
        assert_eq!(step, utc(2025, 2, 28, 0));
    }

    #[test]
    fn day_step_keeps_wall_clock_across_dst() {
        let tz = chrono_tz::America::New_York;
        // 2024-03-09 09:00 EST = 14:00 UTC; next day 09:00 EDT = 13:00 UTC.
        let before = utc(2024, 3, 9, 14);
        let after = CalendarUnit::day().step(before, tz, 1).unwrap();
        assert_eq!(after, utc(2024, 3, 10, 13));
    }

    #[test]
    fn hour_step_is_fixed() {
        let unit = CalendarUnit::new(CalendarField::Hour, 6).unwrap();
        assert_eq!(unit.step(utc(2024, 1, 1, 0), chrono_tz::UTC, -2), Some(utc(2023, 12, 31, 12)));
    }

    #[test]
    fn display_shows_sign() {
        assert_eq!(CalendarUnit::month().to_string(), "+1 month");
    }
}
