use std::sync::Arc;

use crate::context::ScheduleContext;
use crate::interval::Interval;
use crate::schedule::{Schedule, ScheduleResult};

/// The earliest-starting result among several schedules.
///
/// Every child is evaluated against the same context and clipped to the
/// context's enclosing window.  Ties go to the child declared first.  An
/// empty list passes the enclosing window through unchanged, and is never
/// due without one.
#[derive(Debug, Clone, Default)]
pub struct ScheduleList {
    schedules: Vec<Arc<dyn Schedule>>,
}

impl ScheduleList {
    pub fn new(schedules: Vec<Arc<dyn Schedule>>) -> Self {
        Self { schedules }
    }

    pub fn push(&mut self, schedule: Arc<dyn Schedule>) {
        self.schedules.push(schedule);
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

impl Schedule for ScheduleList {
    fn next_due(&self, context: &ScheduleContext) -> Option<ScheduleResult> {
        let parent = context.parent_interval();
        if self.schedules.is_empty() {
            return parent.map(|window| ScheduleResult::new(*window));
        }

        let mut best: Option<ScheduleResult> = None;
        for schedule in &self.schedules {
            let Some(result) = schedule.next_due(context) else {
                continue;
            };
            let Some(result) = (match parent {
                Some(window) => result.limit(window),
                None => Some(result),
            }) else {
                continue;
            };
            let earlier = best.map_or(true, |current| {
                result.interval().from_date() < current.interval().from_date()
            });
            if earlier {
                best = Some(result);
            }
        }
        best
    }
}
