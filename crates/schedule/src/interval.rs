//! Half-open time ranges at one-millisecond granularity.
//!
//! [`IntervalTo`] is the working type: it stores the last included
//! millisecond, so a range `[from, up_to)` keeps `to_date() == up_to - 1ms`
//! and a point instant `t` is `[t, t + 1ms)`.  [`SimpleInterval`] is a
//! strictly validated value type for externally supplied ranges.

use std::fmt;

use cad_domain::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Lower bound for open-ended ranges.
pub const START_OF_TIME: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Upper bound for open-ended ranges.
pub const END_OF_TIME: DateTime<Utc> = DateTime::<Utc>::MAX_UTC;

fn one_ms() -> TimeDelta {
    TimeDelta::milliseconds(1)
}

/// A range of instants, inclusive at both `from_date` and `to_date`.
pub trait Interval {
    fn from_date(&self) -> DateTime<Utc>;

    /// The last included millisecond.
    fn to_date(&self) -> DateTime<Utc>;

    /// The exclusive end.
    fn up_to_date(&self) -> DateTime<Utc> {
        self.to_date().checked_add_signed(one_ms()).unwrap_or(END_OF_TIME)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IntervalTo
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "IntervalRepr", try_from = "IntervalRepr")]
pub struct IntervalTo {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl IntervalTo {
    /// The range `[from, up_to)`.  An `up_to` at or before `from` collapses
    /// to the point at `from`.
    pub fn new(from: DateTime<Utc>, up_to: DateTime<Utc>) -> Self {
        if up_to <= from {
            return Self::point(from);
        }
        Self {
            from,
            to: up_to - one_ms(),
        }
    }

    /// The single millisecond starting at `at`.
    pub fn point(at: DateTime<Utc>) -> Self {
        Self { from: at, to: at }
    }

    /// `[START_OF_TIME, END_OF_TIME)`.
    pub fn forever() -> Self {
        Self::new(START_OF_TIME, END_OF_TIME)
    }

    /// True when the range covers a single millisecond.
    pub fn is_point(&self) -> bool {
        self.from == self.to
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }

    /// Intersect with `other`.  Returns `None` when the ranges are disjoint.
    pub fn limit(&self, other: &impl Interval) -> Option<IntervalTo> {
        let from = self.from.max(other.from_date());
        let to = self.to.min(other.to_date());
        (from <= to).then_some(IntervalTo { from, to })
    }
}

impl Interval for IntervalTo {
    fn from_date(&self) -> DateTime<Utc> {
        self.from
    }

    fn to_date(&self) -> DateTime<Utc> {
        self.to
    }
}

impl fmt::Display for IntervalTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_point() {
            write!(f, "at {}", render(self.from))
        } else {
            write!(f, "{} up to {}", render(self.from), render(self.up_to_date()))
        }
    }
}

/// Wire shape: the exclusive end is written, not the inclusive one.
#[derive(Clone, Serialize, Deserialize)]
struct IntervalRepr {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl From<IntervalTo> for IntervalRepr {
    fn from(interval: IntervalTo) -> Self {
        Self {
            from: interval.from,
            to: interval.up_to_date(),
        }
    }
}

impl TryFrom<IntervalRepr> for IntervalTo {
    type Error = Error;

    fn try_from(repr: IntervalRepr) -> Result<Self> {
        if repr.to <= repr.from {
            return Err(Error::InvalidInterval {
                from: repr.from,
                to: repr.to,
            });
        }
        Ok(IntervalTo::new(repr.from, repr.to))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SimpleInterval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A non-empty range `[from, to)` supplied from outside, e.g. the last
/// completed period read back from storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SimpleInterval {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl SimpleInterval {
    /// Fails unless `from` is strictly before `to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from >= to {
            return Err(Error::InvalidInterval { from, to });
        }
        Ok(Self { from, to })
    }
}

impl Interval for SimpleInterval {
    fn from_date(&self) -> DateTime<Utc> {
        self.from
    }

    fn to_date(&self) -> DateTime<Utc> {
        self.to - one_ms()
    }

    fn up_to_date(&self) -> DateTime<Utc> {
        self.to
    }
}

impl From<SimpleInterval> for IntervalTo {
    fn from(interval: SimpleInterval) -> Self {
        IntervalTo::new(interval.from, interval.to)
    }
}

impl fmt::Display for SimpleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} up to {}", render(self.from), render(self.to))
    }
}

/// Sub-second digits are shown only when the instant is not on a whole second.
fn render(at: DateTime<Utc>) -> String {
    if at.timestamp_subsec_nanos() == 0 {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}
