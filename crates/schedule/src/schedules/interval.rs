use chrono::TimeDelta;

use crate::context::ScheduleContext;
use crate::interval::IntervalTo;
use crate::schedule::{Schedule, ScheduleResult};

/// `[now, now + every)`, so successive evaluations from each `use_next`
/// tile time with windows of equal length.  A zero length is the point at
/// `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSchedule {
    every: TimeDelta,
}

impl IntervalSchedule {
    pub fn new(every: TimeDelta) -> Self {
        Self {
            every: every.abs(),
        }
    }

    pub fn every(&self) -> TimeDelta {
        self.every
    }
}

impl Schedule for IntervalSchedule {
    fn next_due(&self, context: &ScheduleContext) -> Option<ScheduleResult> {
        let now = context.date()?;
        if self.every.is_zero() {
            return Some(ScheduleResult::new(IntervalTo::point(now)));
        }
        let end = now.checked_add_signed(self.every)?;
        Some(ScheduleResult::new(IntervalTo::new(now, end)))
    }
}
