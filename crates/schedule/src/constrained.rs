//! The periodic-window engine.
//!
//! A constrained schedule is described by two boundary functions, each
//! mapping `(instant, zone)` to the start or the exclusive end of the window
//! in the period containing the instant, and a [`CalendarUnit`] step.  When
//! the window's start falls after its end (an overnight window, Friday to
//! Monday, December to February) the window wraps into the next period.
//!
//! Rolling to another period re-derives both boundaries from a reference
//! instant moved by the calendar step, never by adding a fixed duration to
//! a boundary, so month and year lengths come out right.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::calendar::within_range;
use crate::context::ScheduleContext;
use crate::interval::{Interval, IntervalTo};
use crate::schedule::{Schedule, ScheduleResult};
use crate::unit::CalendarUnit;

/// Maps `(instant, zone)` to a window boundary.
pub type Boundary = Arc<dyn Fn(DateTime<Utc>, Tz) -> DateTime<Utc> + Send + Sync>;

/// Outer windows tried before a refinement that never fits gives up.
const MAX_REFINEMENT_WINDOWS: usize = 1_000;

#[derive(Clone)]
pub struct ConstrainedSchedule {
    name: String,
    from: Boundary,
    to: Boundary,
    unit: CalendarUnit,
    refinement: Option<Arc<dyn Schedule>>,
}

impl fmt::Debug for ConstrainedSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstrainedSchedule")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("refinement", &self.refinement)
            .finish()
    }
}

impl ConstrainedSchedule {
    pub fn new(
        name: impl Into<String>,
        from: impl Fn(DateTime<Utc>, Tz) -> DateTime<Utc> + Send + Sync + 'static,
        to: impl Fn(DateTime<Utc>, Tz) -> DateTime<Utc> + Send + Sync + 'static,
        unit: CalendarUnit,
    ) -> Self {
        Self {
            name: name.into(),
            from: Arc::new(from),
            to: Arc::new(to),
            unit,
            refinement: None,
        }
    }

    /// Narrow every window with a nested schedule.
    pub fn with_refinement(mut self, refinement: Arc<dyn Schedule>) -> Self {
        self.refinement = Some(refinement);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> CalendarUnit {
        self.unit
    }

    pub fn refinement(&self) -> Option<&Arc<dyn Schedule>> {
        self.refinement.as_ref()
    }

    fn from_at(&self, anchor: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        (self.from)(anchor, tz)
    }

    fn to_at(&self, anchor: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        (self.to)(anchor, tz)
    }

    fn shifted(&self, now: DateTime<Utc>, tz: Tz, periods: i32) -> Option<DateTime<Utc>> {
        self.unit.step(now, tz, periods)
    }

    /// The window containing `context.date()`, or the next one to open.
    pub fn next_interval(&self, context: &ScheduleContext) -> Option<IntervalTo> {
        let now = context.date()?;
        if !within_range(now) {
            tracing::debug!(schedule = %self.name, %now, "date outside the calendar range");
            return None;
        }
        let tz = context.zone();
        let from = self.from_at(now, tz);
        let to = self.to_at(now, tz);
        let passed = has_passed(now, from, to);

        let (from, to) = if from > to {
            if passed {
                (from, self.to_at(self.shifted(now, tz, 1)?, tz))
            } else {
                (self.from_at(self.shifted(now, tz, -1)?, tz), to)
            }
        } else if passed {
            let next = self.shifted(now, tz, 1)?;
            (self.from_at(next, tz), self.to_at(next, tz))
        } else {
            (from, to)
        };

        Some(IntervalTo::new(from, to))
    }

    /// The window containing `context.date()`, or the most recent one to
    /// have opened before it.
    pub fn last_interval(&self, context: &ScheduleContext) -> Option<IntervalTo> {
        let now = context.date()?;
        if !within_range(now) {
            tracing::debug!(schedule = %self.name, %now, "date outside the calendar range");
            return None;
        }
        let tz = context.zone();
        let from = self.from_at(now, tz);
        let to = self.to_at(now, tz);

        let (from, to) = if from > to {
            if now < from {
                (self.from_at(self.shifted(now, tz, -1)?, tz), to)
            } else {
                (from, self.to_at(self.shifted(now, tz, 1)?, tz))
            }
        } else if now < from {
            let previous = self.shifted(now, tz, -1)?;
            (self.from_at(previous, tz), self.to_at(previous, tz))
        } else {
            (from, to)
        };

        Some(IntervalTo::new(from, to))
    }
}

/// A window `[from, to)` is over once `now` reaches `to`.  Equal boundaries
/// describe a single instant, which is over only after that millisecond.
fn has_passed(now: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    if from == to {
        now > to
    } else {
        now >= to
    }
}

impl Schedule for ConstrainedSchedule {
    fn next_due(&self, context: &ScheduleContext) -> Option<ScheduleResult> {
        match &self.refinement {
            Some(refinement) => refine(self, refinement.as_ref(), context),
            None => self.next_interval(context).map(ScheduleResult::new),
        }
    }
}

/// Evaluate `refinement` inside the windows of `outer`.
///
/// A refinement window still open inside the most recent outer window wins
/// over the next outer window, so evaluation never skips past `now` while a
/// sub-window is active.  Otherwise outer windows are tried in order until
/// the refinement yields something inside one of them.
pub fn refine(
    outer: &ConstrainedSchedule,
    refinement: &dyn Schedule,
    context: &ScheduleContext,
) -> Option<ScheduleResult> {
    let now = context.date()?;
    let mut window = outer.next_interval(context)?;

    if now < window.from_date() {
        if let Some(last) = outer.last_interval(context) {
            let current = within(refinement, &context.spawn(last), &last)
                .filter(|result| now < result.interval().up_to_date());
            if let Some(result) = current {
                tracing::debug!(schedule = %outer.name, window = %last, "refinement still open in last window");
                return Some(result);
            }
        }
    }

    for _ in 0..MAX_REFINEMENT_WINDOWS {
        let date = now.max(window.from_date());
        if let Some(result) = within(refinement, &context.spawn_at(date, window), &window) {
            return Some(result);
        }
        window = outer.next_interval(&context.move_to(Some(window.up_to_date())))?;
    }

    tracing::warn!(
        schedule = %outer.name,
        windows = MAX_REFINEMENT_WINDOWS,
        "refinement never due inside outer windows; giving up"
    );
    None
}

fn within(
    refinement: &dyn Schedule,
    context: &ScheduleContext,
    window: &IntervalTo,
) -> Option<ScheduleResult> {
    refinement.next_due(context)?.limit(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;
    use crate::schedules::IntervalSchedule;
    use chrono::{NaiveTime, TimeDelta, TimeZone};

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, h, m, 0).unwrap()
    }

    fn hours(from: u32, to: u32) -> ConstrainedSchedule {
        let from = NaiveTime::from_hms_opt(from, 0, 0).unwrap();
        let to = NaiveTime::from_hms_opt(to, 0, 0).unwrap();
        ConstrainedSchedule::new(
            "hours",
            move |t, tz| calendar::time_of_day(t, tz, from),
            move |t, tz| calendar::time_of_day(t, tz, to),
            CalendarUnit::day(),
        )
    }

    fn ctx(at: DateTime<Utc>) -> ScheduleContext {
        ScheduleContext::new(at).with_zone(chrono_tz::UTC)
    }

    fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> IntervalTo {
        IntervalTo::new(from, to)
    }

    /// (now, expected next window) for a plain 09:00–17:00 window.
    #[test]
    fn next_interval_table_plain() {
        let s = hours(9, 17);
        let cases = [
            (utc(15, 8, 0), window(utc(15, 9, 0), utc(15, 17, 0))),
            (utc(15, 9, 0), window(utc(15, 9, 0), utc(15, 17, 0))),
            (utc(15, 12, 0), window(utc(15, 9, 0), utc(15, 17, 0))),
            (utc(15, 17, 0) - TimeDelta::milliseconds(1), window(utc(15, 9, 0), utc(15, 17, 0))),
            (utc(15, 17, 0), window(utc(16, 9, 0), utc(16, 17, 0))),
            (utc(15, 23, 0), window(utc(16, 9, 0), utc(16, 17, 0))),
        ];
        for (now, expected) in cases {
            assert_eq!(s.next_interval(&ctx(now)), Some(expected), "now = {now}");
        }
    }

    /// (now, expected next window) for an overnight 22:00–06:00 window.
    #[test]
    fn next_interval_table_wrapping() {
        let s = hours(22, 6);
        let cases = [
            (utc(15, 0, 0), window(utc(14, 22, 0), utc(15, 6, 0))),
            (utc(15, 3, 0), window(utc(14, 22, 0), utc(15, 6, 0))),
            (utc(15, 6, 0) - TimeDelta::milliseconds(1), window(utc(14, 22, 0), utc(15, 6, 0))),
            (utc(15, 6, 0), window(utc(15, 22, 0), utc(16, 6, 0))),
            (utc(15, 12, 0), window(utc(15, 22, 0), utc(16, 6, 0))),
            (utc(15, 22, 0), window(utc(15, 22, 0), utc(16, 6, 0))),
            (utc(15, 23, 59), window(utc(15, 22, 0), utc(16, 6, 0))),
        ];
        for (now, expected) in cases {
            assert_eq!(s.next_interval(&ctx(now)), Some(expected), "now = {now}");
        }
    }

    #[test]
    fn last_interval_table() {
        let plain = hours(9, 17);
        assert_eq!(
            plain.last_interval(&ctx(utc(15, 8, 0))),
            Some(window(utc(14, 9, 0), utc(14, 17, 0)))
        );
        assert_eq!(
            plain.last_interval(&ctx(utc(15, 12, 0))),
            Some(window(utc(15, 9, 0), utc(15, 17, 0)))
        );
        assert_eq!(
            plain.last_interval(&ctx(utc(15, 18, 0))),
            Some(window(utc(15, 9, 0), utc(15, 17, 0)))
        );

        let wrapping = hours(22, 6);
        assert_eq!(
            wrapping.last_interval(&ctx(utc(15, 3, 0))),
            Some(window(utc(14, 22, 0), utc(15, 6, 0)))
        );
        assert_eq!(
            wrapping.last_interval(&ctx(utc(15, 12, 0))),
            Some(window(utc(14, 22, 0), utc(15, 6, 0)))
        );
        assert_eq!(
            wrapping.last_interval(&ctx(utc(15, 23, 0))),
            Some(window(utc(15, 22, 0), utc(16, 6, 0)))
        );
    }

    #[test]
    fn instant_window_is_a_point() {
        let s = hours(9, 9);
        assert_eq!(s.next_interval(&ctx(utc(15, 9, 0))), Some(IntervalTo::point(utc(15, 9, 0))));
        assert_eq!(
            s.next_interval(&ctx(utc(15, 9, 1))),
            Some(IntervalTo::point(utc(16, 9, 0)))
        );
    }

    #[test]
    fn moving_to_end_yields_increasing_disjoint_windows() {
        let s = hours(22, 6);
        let mut context = ctx(utc(10, 12, 0));
        let mut previous: Option<IntervalTo> = None;
        for _ in 0..10 {
            let next = s.next_interval(&context).unwrap();
            if let Some(prev) = previous {
                assert!(next.from_date() > prev.to_date());
                assert!(prev.limit(&next).is_none());
            }
            context = context.move_to(Some(next.up_to_date()));
            previous = Some(next);
        }
    }

    #[test]
    fn absent_date_is_never_due() {
        let s = hours(9, 17);
        let context = ctx(utc(15, 9, 0)).move_to(None);
        assert!(s.next_interval(&context).is_none());
        assert!(s.last_interval(&context).is_none());
        assert!(s.next_due(&context).is_none());
    }

    #[test]
    fn refinement_inside_window() {
        let every = Arc::new(IntervalSchedule::new(TimeDelta::minutes(30)));
        let s = hours(9, 17).with_refinement(every);

        // Before the window: first slot at the window start.
        let r = s.next_due(&ctx(utc(15, 7, 0))).unwrap();
        assert_eq!(r.interval(), &window(utc(15, 9, 0), utc(15, 9, 30)));

        // Inside: slot starts at now.
        let r = s.next_due(&ctx(utc(15, 10, 10))).unwrap();
        assert_eq!(r.interval(), &window(utc(15, 10, 10), utc(15, 10, 40)));

        // Near the end: clipped to the window.
        let r = s.next_due(&ctx(utc(15, 16, 45))).unwrap();
        assert_eq!(r.interval(), &window(utc(15, 16, 45), utc(15, 17, 0)));
        assert_eq!(r.use_next(), Some(utc(15, 17, 0)));

        // At the end: tomorrow.
        let r = s.next_due(&ctx(utc(15, 17, 0))).unwrap();
        assert_eq!(r.interval(), &window(utc(16, 9, 0), utc(16, 9, 30)));
    }

    #[test]
    fn refinement_that_misses_a_window_moves_on() {
        // Outer 09:00–17:00, refined by 18:00–19:00: never overlaps.
        let s = hours(9, 17).with_refinement(Arc::new(hours(18, 19)));
        assert!(s.next_due(&ctx(utc(15, 8, 0))).is_none());

        // Outer 09:00–17:00, refined by 16:00–20:00: clipped to 16:00–17:00.
        let s = hours(9, 17).with_refinement(Arc::new(hours(16, 20)));
        let r = s.next_due(&ctx(utc(15, 17, 30))).unwrap();
        assert_eq!(r.interval(), &window(utc(16, 16, 0), utc(16, 17, 0)));
    }

    #[test]
    fn refinement_across_outer_boundary_is_clipped() {
        // A weekly window Mon 00:00–Tue 00:00 refined by an overnight
        // 22:00–06:00 window: at Mon 23:00 the Mon 22:00 slot is open.
        let monday = ConstrainedSchedule::new(
            "monday",
            |t, tz| calendar::day_of_week(t, tz, 1),
            |t, tz| calendar::day_of_week(t, tz, 2),
            CalendarUnit::week(),
        )
        .with_refinement(Arc::new(hours(22, 6)));

        // 2024-06-10 is a Monday.
        let r = monday.next_due(&ctx(utc(10, 23, 0))).unwrap();
        assert_eq!(r.interval(), &window(utc(10, 22, 0), utc(11, 0, 0)));

        // Tuesday 01:00: the outer window is over, next Monday's 00:00 slot
        // (the tail of Sunday night's window) comes next.
        let r = monday.next_due(&ctx(utc(11, 1, 0))).unwrap();
        assert_eq!(r.interval(), &window(utc(17, 0, 0), utc(17, 6, 0)));
    }

    #[test]
    fn open_refinement_in_last_window_wins() {
        // "Day 31" of February carries to 3 March.  On 3 March the next
        // window computed from March is the 31st, but February's carried
        // window is still open and its refinement slot is current.
        let day_31 = ConstrainedSchedule::new(
            "day-31",
            |t, tz| calendar::day_of_month(t, tz, 31),
            |t, tz| calendar::day_of_month(t, tz, 32),
            CalendarUnit::month(),
        );
        let now = Utc.with_ymd_and_hms(2023, 3, 3, 12, 0, 0).unwrap();
        let next = day_31.next_interval(&ctx(now)).unwrap();
        assert_eq!(next.from_date(), Utc.with_ymd_and_hms(2023, 3, 31, 0, 0, 0).unwrap());
        let last = day_31.last_interval(&ctx(now)).unwrap();
        assert!(last.contains(now));

        let refined = day_31.with_refinement(Arc::new(IntervalSchedule::new(TimeDelta::hours(1))));
        let r = refined.next_due(&ctx(now)).unwrap();
        assert_eq!(r.interval(), &IntervalTo::new(now, now + TimeDelta::hours(1)));
    }
}
