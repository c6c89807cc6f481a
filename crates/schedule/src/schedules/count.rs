use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ScheduleContext;
use crate::interval::{Interval, IntervalTo};
use crate::schedule::{Schedule, ScheduleResult};

/// Progress for one enclosing window, kept in the context's state map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Progress {
    issued: u32,
    last_from: Option<DateTime<Utc>>,
}

/// At most `count` occurrences inside each enclosing window.
///
/// Occurrences come from the refinement, or are the point at the reference
/// instant when there is none.  Progress lives in the shared state map under
/// a key made of this schedule's id and the enclosing window's start, so
/// re-evaluating the same occurrence does not use up another one and a new
/// enclosing window starts from zero.
#[derive(Debug, Clone)]
pub struct CountSchedule {
    id: Uuid,
    count: u32,
    refinement: Option<Arc<dyn Schedule>>,
}

impl CountSchedule {
    pub fn new(count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            count,
            refinement: None,
        }
    }

    pub fn with_refinement(mut self, refinement: Arc<dyn Schedule>) -> Self {
        self.refinement = Some(refinement);
        self
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    fn prefix(&self) -> String {
        format!("count:{}:", self.id)
    }

    fn key(&self, parent: Option<&IntervalTo>) -> String {
        match parent {
            Some(window) => format!("{}{}", self.prefix(), window.from_date().timestamp_millis()),
            None => format!("{}*", self.prefix()),
        }
    }

    fn candidate(&self, context: &ScheduleContext) -> Option<ScheduleResult> {
        let result = match &self.refinement {
            Some(refinement) => refinement.next_due(context)?,
            None => ScheduleResult::new(IntervalTo::point(context.date()?)),
        };
        match context.parent_interval() {
            Some(parent) => result.limit(parent),
            None => Some(result),
        }
    }
}

impl Schedule for CountSchedule {
    fn next_due(&self, context: &ScheduleContext) -> Option<ScheduleResult> {
        if self.count == 0 {
            return None;
        }
        let candidate = self.candidate(context)?;
        let key = self.key(context.parent_interval());
        let from = candidate.interval().from_date();

        let state = context.state();
        let mut data = state.lock();
        let mut progress: Progress = data
            .get(&key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        if progress.last_from == Some(from) {
            return Some(candidate);
        }
        if progress.issued >= self.count {
            tracing::debug!(key = %key, count = self.count, "occurrences used up for window");
            return None;
        }

        if progress.issued == 0 {
            // A new enclosing window: forget the ones before it.
            let prefix = self.prefix();
            data.retain(|k, _| !k.starts_with(&prefix));
        }
        progress.issued += 1;
        progress.last_from = Some(from);
        match serde_json::to_value(&progress) {
            Ok(value) => {
                data.insert(key, value);
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "failed to record occurrence"),
        }
        Some(candidate)
    }
}
