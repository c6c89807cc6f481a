//! Daily, weekly, monthly and yearly windows.
//!
//! Each constructor supplies the two boundary functions the engine needs.
//! Bounds are inclusive ordinals (a Monday-to-Friday window ends at the
//! start of Saturday); an absent bound is the start or end of the period.
//! A `from` after `to` wraps into the next period.

use cad_domain::config::{
    validate_day_of_month, validate_iso_weekday, validate_month, validate_span,
};
use cad_domain::{Error, Result};
use chrono::NaiveTime;

use crate::calendar;
use crate::constrained::ConstrainedSchedule;
use crate::unit::CalendarUnit;

fn check(what: &str, result: std::result::Result<(), String>) -> Result<()> {
    result.map_err(|message| Error::Config(format!("{what}: {message}")))
}

/// Between two wall-clock times each day.  Equal times describe a single
/// instant.
pub fn daily(from: Option<NaiveTime>, to: Option<NaiveTime>) -> ConstrainedSchedule {
    let name = match (from, to) {
        (None, None) => "daily".to_string(),
        _ => format!(
            "daily {}-{}",
            from.map(|t| t.to_string()).unwrap_or_default(),
            to.map(|t| t.to_string()).unwrap_or_default()
        ),
    };
    ConstrainedSchedule::new(
        name,
        move |t, tz| match from {
            Some(time) => calendar::time_of_day(t, tz, time),
            None => calendar::start_of_day(t, tz),
        },
        move |t, tz| match to {
            Some(time) => calendar::time_of_day(t, tz, time),
            None => calendar::end_of_day(t, tz),
        },
        CalendarUnit::day(),
    )
}

/// From ISO weekday `from` through `to` inclusive (Monday = 1).
pub fn weekly(from: Option<u32>, to: Option<u32>) -> Result<ConstrainedSchedule> {
    for day in from.iter().chain(to.iter()) {
        check("weekly", validate_iso_weekday(*day))?;
    }
    check("weekly", validate_span(from.map(i64::from), to.map(i64::from)))?;

    Ok(ConstrainedSchedule::new(
        format!("weekly {}-{}", from.unwrap_or(1), to.unwrap_or(7)),
        move |t, tz| match from {
            Some(day) => calendar::day_of_week(t, tz, day),
            None => calendar::start_of_week(t, tz),
        },
        move |t, tz| match to {
            Some(day) => calendar::day_of_week(t, tz, day + 1),
            None => calendar::end_of_week(t, tz),
        },
        CalendarUnit::week(),
    ))
}

/// From day `from` through day `to` of the month inclusive.  Negative days
/// count back from the month end (`-1` is the last day); days past the end
/// of a short month carry into the next one.
pub fn monthly(from: Option<i32>, to: Option<i32>) -> Result<ConstrainedSchedule> {
    for day in from.iter().chain(to.iter()) {
        check("monthly", validate_day_of_month(*day))?;
    }
    check("monthly", validate_span(from.map(i64::from), to.map(i64::from)))?;

    Ok(ConstrainedSchedule::new(
        format!("monthly {}-{}", from.unwrap_or(1), to.unwrap_or(-1)),
        move |t, tz| match from {
            Some(day) => calendar::day_of_month(t, tz, day),
            None => calendar::start_of_month(t, tz),
        },
        move |t, tz| match to {
            Some(-1) | None => calendar::end_of_month(t, tz),
            Some(day) => calendar::day_of_month(t, tz, day + 1),
        },
        CalendarUnit::month(),
    ))
}

/// From month `from` through month `to` inclusive (January = 1).
pub fn yearly(from: Option<u32>, to: Option<u32>) -> Result<ConstrainedSchedule> {
    for month in from.iter().chain(to.iter()) {
        check("yearly", validate_month(*month))?;
    }
    check("yearly", validate_span(from.map(i64::from), to.map(i64::from)))?;

    Ok(ConstrainedSchedule::new(
        format!("yearly {}-{}", from.unwrap_or(1), to.unwrap_or(12)),
        move |t, tz| match from {
            Some(month) => calendar::month_of_year(t, tz, month),
            None => calendar::start_of_year(t, tz),
        },
        move |t, tz| match to {
            Some(month) => calendar::month_of_year(t, tz, month + 1),
            None => calendar::end_of_year(t, tz),
        },
        CalendarUnit::year(),
    ))
}
