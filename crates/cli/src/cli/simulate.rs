//! Replay run outcomes against a calculator on a manual clock.

use std::collections::HashMap;
use std::sync::Arc;

use cad_domain::config::Config;
use cad_schedule::{
    build_schedule, Clock, IntervalTo, ManualClock, ScheduleCalculator, ScheduleListener,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::ValueEnum;
use parking_lot::Mutex;

/// The result of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Outcome {
    Ok,
    Fail,
}

/// Collects one line per notification.
#[derive(Default)]
struct Transcript {
    lines: Mutex<Vec<String>>,
}

fn stamp(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "never".into(),
    }
}

impl ScheduleListener for Transcript {
    fn initialised(&self, date: Option<DateTime<Utc>>) {
        self.lines.lock().push(format!("initialised  next {}", stamp(date)));
    }

    fn complete(&self, date: Option<DateTime<Utc>>, last: Option<IntervalTo>) {
        let last = last.map(|i| i.to_string()).unwrap_or_else(|| "nothing".into());
        self.lines
            .lock()
            .push(format!("complete     {last}; next {}", stamp(date)));
    }

    fn retry(&self, date: Option<DateTime<Utc>>, retry_date: DateTime<Utc>) {
        self.lines.lock().push(format!(
            "retry        window {}; retry by {}",
            stamp(date),
            stamp(Some(retry_date))
        ));
    }

    fn failed(&self, date: Option<DateTime<Utc>>) {
        self.lines.lock().push(format!("failed       next {}", stamp(date)));
    }
}

/// Run a calculator session for `config` starting at `start` and return
/// the notification transcript.  Before each outcome the clock moves to
/// the instant the calculator says it is next due; the session ends early
/// when nothing is due any more.
pub fn simulate(
    config: &Config,
    zone: Tz,
    start: DateTime<Utc>,
    outcomes: &[Outcome],
) -> anyhow::Result<Vec<String>> {
    let clock = Arc::new(ManualClock::new(start));
    let mut builder = ScheduleCalculator::builder()
        .clock(clock.clone())
        .schedule(build_schedule(&config.schedule)?)
        .zone(zone);
    if let Some(retry) = &config.retry {
        builder = builder.retry(build_schedule(retry)?);
    }
    let calculator = builder.build()?;

    let transcript = Arc::new(Transcript::default());
    calculator.add_listener(transcript.clone());
    calculator.initialise(None, HashMap::new())?;

    for outcome in outcomes {
        let Some(due) = calculator.next_due() else {
            tracing::info!("schedule is never due again; stopping");
            break;
        };
        if due > clock.now() {
            clock.set(due);
        }
        tracing::debug!(at = %clock.now(), ?outcome, kind = %calculator.current_schedule_type(), "run finished");
        match outcome {
            Outcome::Ok => calculator.calculate_complete()?,
            Outcome::Fail => calculator.calculate_retry()?,
        };
    }

    let lines = std::mem::take(&mut *transcript.lines.lock());
    Ok(lines)
}
