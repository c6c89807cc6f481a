//! Turn a configured [`ScheduleDef`] into a schedule.

use std::sync::Arc;

use cad_domain::config::{parse_duration, parse_time_of_day, ScheduleDef};
use cad_domain::{Error, Result};
use chrono::NaiveTime;

use crate::constrained::ConstrainedSchedule;
use crate::schedule::Schedule;
use crate::schedules::{periodic, CountSchedule, IntervalSchedule, NowSchedule, ScheduleList};

/// Build the schedule a definition describes, refinements included.
/// Field values that do not parse are [`Error::Config`].
pub fn build_schedule(def: &ScheduleDef) -> Result<Arc<dyn Schedule>> {
    let schedule: Arc<dyn Schedule> = match def {
        ScheduleDef::Now => Arc::new(NowSchedule),
        ScheduleDef::Daily { from, to, refinement } => {
            let from = time_of_day(from.as_deref())?;
            let to = time_of_day(to.as_deref())?;
            constrained(periodic::daily(from, to), refinement.as_deref())?
        }
        ScheduleDef::Weekly { from, to, refinement } => {
            constrained(periodic::weekly(*from, *to)?, refinement.as_deref())?
        }
        ScheduleDef::Monthly { from, to, refinement } => {
            constrained(periodic::monthly(*from, *to)?, refinement.as_deref())?
        }
        ScheduleDef::Yearly { from, to, refinement } => {
            constrained(periodic::yearly(*from, *to)?, refinement.as_deref())?
        }
        ScheduleDef::Interval { every } => {
            let every = parse_duration(every).map_err(Error::Config)?;
            Arc::new(IntervalSchedule::new(every))
        }
        ScheduleDef::Count { count, refinement } => {
            let mut schedule = CountSchedule::new(*count);
            if let Some(refinement) = refinement {
                schedule = schedule.with_refinement(build_schedule(refinement)?);
            }
            Arc::new(schedule)
        }
        ScheduleDef::List { schedules } => {
            let children = schedules
                .iter()
                .map(build_schedule)
                .collect::<Result<Vec<_>>>()?;
            Arc::new(ScheduleList::new(children))
        }
    };
    tracing::debug!(kind = def.kind(), schedule = ?schedule, "built schedule");
    Ok(schedule)
}

fn time_of_day(value: Option<&str>) -> Result<Option<NaiveTime>> {
    value
        .map(|s| parse_time_of_day(s).map_err(Error::Config))
        .transpose()
}

fn constrained(
    schedule: ConstrainedSchedule,
    refinement: Option<&ScheduleDef>,
) -> Result<Arc<dyn Schedule>> {
    Ok(match refinement {
        Some(def) => Arc::new(schedule.with_refinement(build_schedule(def)?)),
        None => Arc::new(schedule),
    })
}
