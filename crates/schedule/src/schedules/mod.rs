//! Concrete schedules.
//!
//! - [`periodic`] — daily, weekly, monthly and yearly windows built on
//!   [`ConstrainedSchedule`](crate::ConstrainedSchedule)
//! - [`interval`] — back-to-back fixed-length windows
//! - [`now`] — due once, immediately
//! - [`count`] — a bounded number of occurrences per enclosing window
//! - [`list`] — earliest of several schedules

pub mod count;
pub mod interval;
pub mod list;
pub mod now;
pub mod periodic;

pub use count::CountSchedule;
pub use interval::IntervalSchedule;
pub use list::ScheduleList;
pub use now::NowSchedule;
pub use periodic::{daily, monthly, weekly, yearly};
