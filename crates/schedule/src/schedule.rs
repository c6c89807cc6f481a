//! The schedule protocol.

use std::fmt;

use cad_domain::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ScheduleContext;
use crate::interval::{Interval, IntervalTo};

/// Computes when something is next due.
///
/// Implementations are pure functions of the context, apart from the
/// context's shared state map.
pub trait Schedule: fmt::Debug + Send + Sync {
    /// The next due window relative to `context.date()`, or `None` when it
    /// will never be due again.  An absent context date is never due.
    fn next_due(&self, context: &ScheduleContext) -> Option<ScheduleResult>;
}

/// A due window plus the instant to evaluate from next time.
///
/// `use_next` defaults to the window's exclusive end but is set
/// independently by schedules that advance non-contiguously; `None` means
/// there is no following occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ResultRepr", try_from = "ResultRepr")]
pub struct ScheduleResult {
    interval: IntervalTo,
    use_next: Option<DateTime<Utc>>,
}

impl ScheduleResult {
    pub fn new(interval: IntervalTo) -> Self {
        Self {
            interval,
            use_next: Some(interval.up_to_date()),
        }
    }

    pub fn with_use_next(mut self, use_next: Option<DateTime<Utc>>) -> Self {
        self.use_next = use_next;
        self
    }

    pub fn interval(&self) -> &IntervalTo {
        &self.interval
    }

    pub fn use_next(&self) -> Option<DateTime<Utc>> {
        self.use_next
    }

    /// Clip to `window`.  A clipped result resumes at its new end; an
    /// untouched one keeps its own `use_next`.
    pub fn limit(&self, window: &impl Interval) -> Option<ScheduleResult> {
        let clipped = self.interval.limit(window)?;
        if clipped == self.interval {
            Some(*self)
        } else {
            Some(ScheduleResult::new(clipped))
        }
    }
}

impl From<IntervalTo> for ScheduleResult {
    fn from(interval: IntervalTo) -> Self {
        Self::new(interval)
    }
}

impl fmt::Display for ScheduleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interval)?;
        if self.use_next != Some(self.interval.up_to_date()) {
            match self.use_next {
                Some(next) => write!(f, " (next from {})", next.format("%Y-%m-%d %H:%M:%S"))?,
                None => write!(f, " (last)")?,
            }
        }
        Ok(())
    }
}

/// Persisted shape: from/to instants plus `use_next`.
#[derive(Clone, Serialize, Deserialize)]
struct ResultRepr {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    #[serde(default)]
    use_next: Option<DateTime<Utc>>,
}

impl From<ScheduleResult> for ResultRepr {
    fn from(result: ScheduleResult) -> Self {
        Self {
            from: result.interval.from_date(),
            to: result.interval.up_to_date(),
            use_next: result.use_next,
        }
    }
}

impl TryFrom<ResultRepr> for ScheduleResult {
    type Error = Error;

    fn try_from(repr: ResultRepr) -> Result<Self> {
        if repr.to <= repr.from {
            return Err(Error::InvalidInterval {
                from: repr.from,
                to: repr.to,
            });
        }
        Ok(ScheduleResult::new(IntervalTo::new(repr.from, repr.to)).with_use_next(repr.use_next))
    }
}
