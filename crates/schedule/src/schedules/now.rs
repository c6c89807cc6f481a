use crate::context::ScheduleContext;
use crate::interval::IntervalTo;
use crate::schedule::{Schedule, ScheduleResult};

/// Due once, at the reference instant.  The result carries no `use_next`,
/// so an evaluation chain that follows it is never due again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NowSchedule;

impl Schedule for NowSchedule {
    fn next_due(&self, context: &ScheduleContext) -> Option<ScheduleResult> {
        let now = context.date()?;
        Some(ScheduleResult::new(IntervalTo::point(now)).with_use_next(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn fires_once() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let ctx = ScheduleContext::new(now);
        let r = NowSchedule.next_due(&ctx).unwrap();
        assert_eq!(r.interval(), &IntervalTo::point(now));
        assert_eq!(r.use_next(), None);
        assert!(NowSchedule.next_due(&ctx.move_to(r.use_next())).is_none());
    }
}
