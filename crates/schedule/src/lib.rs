//! Due-interval computation for recurring jobs.
//!
//! A caller builds a [`ScheduleContext`] around a reference instant and a
//! zone, hands it to a [`Schedule`] and gets back a [`ScheduleResult`]: the
//! half-open window during which the job is due plus the instant to feed
//! back as the next reference.  [`ScheduleCalculator`] wraps that protocol
//! with the normal/retry session state a scheduling loop needs.
//!
//! - [`interval`] — half-open time ranges and their intersection
//! - [`calendar`] — civil-calendar boundaries in a zone
//! - [`unit`] — calendar steps used to roll periodic windows
//! - [`context`] — evaluation input and its derivations
//! - [`schedule`] — the `Schedule` trait and its result type
//! - [`constrained`] — the periodic-window engine and refinement
//! - [`schedules`] — concrete schedules built on the engine
//! - [`calculator`] — stateful normal/retry orchestration
//! - [`definition`] — building schedules from configuration

pub mod calculator;
pub mod calendar;
pub mod clock;
pub mod constrained;
pub mod context;
pub mod definition;
pub mod interval;
pub mod schedule;
pub mod schedules;
pub mod unit;

pub use calculator::{ScheduleCalculator, ScheduleCalculatorBuilder, ScheduleListener, ScheduleType};
pub use clock::{Clock, ManualClock, SystemClock};
pub use constrained::ConstrainedSchedule;
pub use context::{system_zone, ScheduleContext, StateMap};
pub use definition::build_schedule;
pub use interval::{Interval, IntervalTo, SimpleInterval, END_OF_TIME, START_OF_TIME};
pub use schedule::{Schedule, ScheduleResult};
pub use unit::{CalendarField, CalendarUnit};
