//! Civil-calendar boundaries for an instant in a zone.
//!
//! Every function maps `(instant, zone)` to the start of some calendar
//! period containing or relative to the instant's local date.  `end_of_*`
//! returns the exclusive end, i.e. the start of the following period.
//! Ordinals past the end of a period carry into the next one, the way a
//! lenient civil calendar does (day 31 of February is early March).

use chrono::{
    DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Map a local wall-clock time to an instant.
///
/// **DST handling:**
/// - Fall-back overlaps: the earliest (pre-transition) mapping is chosen.
/// - Spring-forward gaps: the local time is read with the offset in force
///   before the gap, which lands the same distance past the transition.
///   That offset is taken a day earlier; no zone has two transitions that
///   close together.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        chrono::LocalResult::None => {
            use chrono::Offset;
            let before_gap = local.checked_sub_signed(TimeDelta::days(1)).unwrap_or(local);
            let offset = tz.offset_from_utc_datetime(&before_gap).fix().local_minus_utc();
            let utc = local
                .checked_sub_signed(TimeDelta::seconds(i64::from(offset)))
                .unwrap_or(local);
            Utc.from_utc_datetime(&utc)
        }
    }
}

/// Days kept clear of either end of the representable range.  Boundaries
/// derived from an anchor reach at most two years past it.
const EDGE_MARGIN_DAYS: i64 = 1_000;

/// Whether calendar arithmetic around `instant` stays representable in
/// every zone.  Instants near [`crate::START_OF_TIME`] or
/// [`crate::END_OF_TIME`] have no local calendar to speak of.
pub fn within_range(instant: DateTime<Utc>) -> bool {
    let margin = TimeDelta::days(EDGE_MARGIN_DAYS);
    instant.checked_add_signed(margin).is_some() && instant.checked_sub_signed(margin).is_some()
}

/// The instant's date on the local calendar of `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// ISO weekday of the instant in `tz`: Monday = 1 .. Sunday = 7.
pub fn iso_weekday(instant: DateTime<Utc>, tz: Tz) -> u32 {
    local_date(instant, tz).weekday().number_from_monday()
}

/// Convert a Sunday-based weekday number (Sunday = 0 .. Saturday = 6, as
/// used by cron and most C libraries) to ISO numbering.
pub fn iso_from_sunday_based(day: u32) -> u32 {
    match day % 7 {
        0 => 7,
        d => d,
    }
}

/// Local midnight of `date` as an instant.
pub fn start_of_date(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(NaiveTime::MIN))
}

/// `date` at the local wall-clock `time`.
pub fn at_time(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(time))
}

/// The instant's local date at wall-clock `time`.
pub fn time_of_day(instant: DateTime<Utc>, tz: Tz, time: NaiveTime) -> DateTime<Utc> {
    at_time(local_date(instant, tz), time, tz)
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let saturated = if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX };
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(saturated)
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// `first` advanced by a 1-based ordinal; non-positive ordinals count back
/// from `next_first`, so `-1` is the last day before it.
fn ordinal_from(first: NaiveDate, next_first: NaiveDate, n: i32) -> NaiveDate {
    if n > 0 {
        add_days(first, i64::from(n) - 1)
    } else if n < 0 {
        add_days(next_first, i64::from(n))
    } else {
        add_days(first, -1)
    }
}

// ── Day ──────────────────────────────────────────────────────────────

pub fn start_of_day(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(local_date(instant, tz), tz)
}

pub fn end_of_day(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(add_days(local_date(instant, tz), 1), tz)
}

// ── Week (ISO, Monday first) ─────────────────────────────────────────

fn monday_of(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.weekday().num_days_from_monday()))
}

pub fn start_of_week(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(monday_of(local_date(instant, tz)), tz)
}

pub fn end_of_week(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(add_days(monday_of(local_date(instant, tz)), 7), tz)
}

/// Start of ISO weekday `day` (Monday = 1) in the instant's week.  `8` is
/// the following Monday.
pub fn day_of_week(instant: DateTime<Utc>, tz: Tz, day: u32) -> DateTime<Utc> {
    let monday = monday_of(local_date(instant, tz));
    start_of_date(add_days(monday, i64::from(day) - 1), tz)
}

// ── Month ────────────────────────────────────────────────────────────

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn start_of_month(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(first_of_month(local_date(instant, tz)), tz)
}

pub fn end_of_month(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(add_months(first_of_month(local_date(instant, tz)), 1), tz)
}

/// Start of day `n` of the instant's month; `-1` is the last day.
pub fn day_of_month(instant: DateTime<Utc>, tz: Tz, n: i32) -> DateTime<Utc> {
    let first = first_of_month(local_date(instant, tz));
    start_of_date(ordinal_from(first, add_months(first, 1), n), tz)
}

// ── Year ─────────────────────────────────────────────────────────────

fn first_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

pub fn start_of_year(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(first_of_year(local_date(instant, tz)), tz)
}

pub fn end_of_year(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_date(add_months(first_of_year(local_date(instant, tz)), 12), tz)
}

/// Start of day `n` of the instant's year; `-1` is 31 December.
pub fn day_of_year(instant: DateTime<Utc>, tz: Tz, n: i32) -> DateTime<Utc> {
    let first = first_of_year(local_date(instant, tz));
    start_of_date(ordinal_from(first, add_months(first, 12), n), tz)
}

/// First instant of `month` (January = 1) in the instant's year.  `13` is
/// January of the following year.
pub fn month_of_year(instant: DateTime<Utc>, tz: Tz, month: u32) -> DateTime<Utc> {
    let first = first_of_year(local_date(instant, tz));
    start_of_date(add_months(first, month.saturating_sub(1)), tz)
}
