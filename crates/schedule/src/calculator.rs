//! The normal/retry session that a scheduling loop drives.
//!
//! A [`ScheduleCalculator`] holds one normal schedule and an optional retry
//! schedule.  After each run the caller reports the outcome:
//! [`calculate_complete`](ScheduleCalculator::calculate_complete) moves on
//! to the next normal window, [`calculate_retry`](ScheduleCalculator::calculate_retry)
//! switches to (or continues on) the retry schedule, whose windows are kept
//! inside the normal window that failed.  When the retry schedule runs out
//! the session falls back to the normal schedule and reports a failure.
//!
//! Every mutating call runs under one lock.  Listeners are notified after
//! the lock is released, from a snapshot of the registrations, in
//! registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cad_domain::trace::TraceEvent;
use cad_domain::{Error, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde_json::Value;

use crate::clock::Clock;
use crate::context::{system_zone, ScheduleContext};
use crate::interval::{Interval, IntervalTo};
use crate::schedule::{Schedule, ScheduleResult};
use crate::schedules::NowSchedule;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Listener protocol
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Receives calculator events.
///
/// `date` is always the start of the normal window the calculator holds
/// once the operation is done, or `None` when the normal schedule will
/// never be due again.
pub trait ScheduleListener: Send + Sync {
    fn initialised(&self, _date: Option<DateTime<Utc>>) {}

    /// `last` is the normal window that just completed.
    fn complete(&self, _date: Option<DateTime<Utc>>, _last: Option<IntervalTo>) {}

    /// `retry_date` is the end of the current retry window.
    fn retry(&self, _date: Option<DateTime<Utc>>, _retry_date: DateTime<Utc>) {}

    fn failed(&self, _date: Option<DateTime<Utc>>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleType {
    Normal,
    Retry,
    /// Not initialised yet.
    Undefined,
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "Normal",
            Self::Retry => "Retry",
            Self::Undefined => "Undefined",
        };
        f.write_str(name)
    }
}

enum Notice {
    Initialised(Option<DateTime<Utc>>),
    Complete(Option<DateTime<Utc>>, Option<IntervalTo>),
    Retry(Option<DateTime<Utc>>, DateTime<Utc>),
    Failed(Option<DateTime<Utc>>),
}

impl Notice {
    fn deliver(&self, listener: &dyn ScheduleListener) {
        match *self {
            Self::Initialised(date) => listener.initialised(date),
            Self::Complete(date, last) => listener.complete(date, last),
            Self::Retry(date, retry_date) => listener.retry(date, retry_date),
            Self::Failed(date) => listener.failed(date),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fluent builder for [`ScheduleCalculator`].
///
/// ```rust
/// # use std::sync::Arc;
/// # use cad_schedule::{ScheduleCalculator, SystemClock};
/// let calculator = ScheduleCalculator::builder()
///     .clock(Arc::new(SystemClock))
///     .zone(chrono_tz::Europe::London)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct ScheduleCalculatorBuilder {
    clock: Option<Arc<dyn Clock>>,
    schedule: Option<Arc<dyn Schedule>>,
    retry: Option<Arc<dyn Schedule>>,
    zone: Option<Tz>,
}

impl ScheduleCalculatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// The normal schedule (default: due once, now).
    pub fn schedule(mut self, schedule: Arc<dyn Schedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn retry(mut self, retry: Arc<dyn Schedule>) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Zone for calendar boundaries (default: the system zone).
    pub fn zone(mut self, zone: Tz) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn build(self) -> Result<ScheduleCalculator> {
        let clock = self
            .clock
            .ok_or_else(|| Error::Config("schedule calculator needs a clock".into()))?;
        Ok(ScheduleCalculator {
            clock,
            schedule: self.schedule.unwrap_or_else(|| Arc::new(NowSchedule)),
            retry: self.retry,
            zone: self.zone.unwrap_or_else(system_zone),
            session: Mutex::new(Session::default()),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Calculator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct Session {
    current: Option<ScheduleType>,
    normal_context: Option<ScheduleContext>,
    normal_result: Option<ScheduleResult>,
    retry_context: Option<ScheduleContext>,
    retry_result: Option<ScheduleResult>,
    listeners: Vec<Arc<dyn ScheduleListener>>,
}

impl Session {
    fn normal_start(&self) -> Option<DateTime<Utc>> {
        self.normal_result.map(|r| r.interval().from_date())
    }

    /// The remembered normal window when retries must stay inside it.
    fn retry_bounds(&self) -> Option<IntervalTo> {
        self.normal_result
            .map(|r| *r.interval())
            .filter(|window| !window.is_point())
    }

    fn switch(&mut self, to: ScheduleType) {
        let from = self.current.unwrap_or(ScheduleType::Undefined);
        if from != to {
            TraceEvent::ScheduleSwitched {
                from: from.to_string(),
                to: to.to_string(),
            }
            .emit();
        }
        self.current = Some(to);
    }
}

pub struct ScheduleCalculator {
    clock: Arc<dyn Clock>,
    schedule: Arc<dyn Schedule>,
    retry: Option<Arc<dyn Schedule>>,
    zone: Tz,
    session: Mutex<Session>,
}

impl fmt::Debug for ScheduleCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleCalculator")
            .field("schedule", &self.schedule)
            .field("retry", &self.retry)
            .field("zone", &self.zone)
            .field("current", &self.current_schedule_type())
            .finish()
    }
}

impl ScheduleCalculator {
    pub fn builder() -> ScheduleCalculatorBuilder {
        ScheduleCalculatorBuilder::new()
    }

    /// Start the session.  Resumes from `last_complete`'s `use_next` when it
    /// has one, else starts at the clock's current instant.  `state_data`
    /// seeds the state map shared by every evaluation.
    ///
    /// Fails with [`Error::State`] when called a second time.
    pub fn initialise(
        &self,
        last_complete: Option<&ScheduleResult>,
        state_data: HashMap<String, Value>,
    ) -> Result<Option<ScheduleResult>> {
        let resumed_from = last_complete.and_then(|r| r.use_next());
        let (notice, listeners, result) = {
            let mut session = self.session.lock();
            if session.current.is_some() {
                return Err(Error::State("schedule calculator is already initialised".into()));
            }

            let start = resumed_from.unwrap_or_else(|| self.clock.now());
            let context = ScheduleContext::new(start)
                .with_zone(self.zone)
                .with_data(state_data);
            session.normal_result = self.schedule.next_due(&context);
            session.normal_context = Some(context);
            session.switch(ScheduleType::Normal);

            let result = session.normal_result;
            TraceEvent::CalculatorInitialised {
                resumed_from,
                next_due: session.normal_start(),
            }
            .emit();
            tracing::info!(
                zone = %self.zone,
                next = %render(result.as_ref()),
                "schedule calculator initialised"
            );
            (
                Notice::Initialised(session.normal_start()),
                session.listeners.clone(),
                result,
            )
        };
        notify(&listeners, &notice);
        Ok(result)
    }

    /// The current run succeeded.  Continues with the normal window after
    /// the one just finished, abandoning any retries in progress.
    pub fn calculate_complete(&self) -> Result<Option<ScheduleResult>> {
        let (notice, listeners, result) = {
            let mut session = self.session.lock();
            self.ensure_initialised(&session)?;

            let finished = session.normal_result;
            session.retry_context = None;
            session.retry_result = None;
            session.switch(ScheduleType::Normal);
            self.advance_normal(&mut session);

            let result = session.normal_result;
            TraceEvent::ScheduleComplete {
                completed_from: finished.map(|r| r.interval().from_date()),
                completed_to: finished.map(|r| r.interval().up_to_date()),
                next_due: session.normal_start(),
            }
            .emit();
            tracing::info!(next = %render(result.as_ref()), "schedule complete");
            (
                Notice::Complete(session.normal_start(), finished.map(|r| *r.interval())),
                session.listeners.clone(),
                result,
            )
        };
        notify(&listeners, &notice);
        Ok(result)
    }

    /// The current run failed.  Returns the window now due: the next retry
    /// window, or the next normal window once retries are exhausted (or
    /// there is no retry schedule).
    pub fn calculate_retry(&self) -> Result<Option<ScheduleResult>> {
        let (notice, listeners, result) = {
            let mut session = self.session.lock();
            self.ensure_initialised(&session)?;

            let notice = match (session.current, &self.retry) {
                (Some(ScheduleType::Retry), Some(retry)) => {
                    let context = session
                        .retry_context
                        .as_ref()
                        .map(|c| c.move_to(session.retry_result.and_then(|r| r.use_next())));
                    session.retry_context = context;
                    self.evaluate_retry(&mut session, retry.as_ref())
                }
                (_, Some(retry)) => {
                    session.switch(ScheduleType::Retry);
                    let mut context = ScheduleContext::new(self.clock.now()).with_zone(self.zone);
                    if let Some(normal) = &session.normal_context {
                        context = context.with_state(normal.state());
                    }
                    if let Some(window) = session.retry_bounds() {
                        context = context.spawn(window);
                    }
                    tracing::info!(
                        window = %render(session.normal_result.as_ref()),
                        "run failed; switching to retry schedule"
                    );
                    session.retry_context = Some(context);
                    self.evaluate_retry(&mut session, retry.as_ref())
                }
                (_, None) => {
                    self.advance_normal(&mut session);
                    self.fail(&session, false)
                }
            };

            let result = match session.current {
                Some(ScheduleType::Retry) => session.retry_result,
                _ => session.normal_result,
            };
            (notice, session.listeners.clone(), result)
        };
        notify(&listeners, &notice);
        Ok(result)
    }

    fn evaluate_retry(&self, session: &mut Session, retry: &dyn Schedule) -> Notice {
        let bounds = session.retry_bounds();
        let result = session
            .retry_context
            .as_ref()
            .and_then(|context| retry.next_due(context))
            .and_then(|r| match &bounds {
                Some(window) => r.limit(window),
                None => Some(r),
            });

        match result {
            Some(r) => {
                session.retry_result = Some(r);
                let retry_date = r.interval().up_to_date();
                TraceEvent::ScheduleRetry {
                    window_from: session.normal_start(),
                    retry_at: retry_date,
                }
                .emit();
                tracing::debug!(retry = %r, "retry scheduled");
                Notice::Retry(session.normal_start(), retry_date)
            }
            None => {
                session.retry_context = None;
                session.retry_result = None;
                session.switch(ScheduleType::Normal);
                self.advance_normal(session);
                self.fail(session, true)
            }
        }
    }

    /// Move the normal context past the remembered window and recompute.
    fn advance_normal(&self, session: &mut Session) {
        let use_next = session.normal_result.and_then(|r| r.use_next());
        let context = session.normal_context.as_ref().map(|c| c.move_to(use_next));
        session.normal_result = context.as_ref().and_then(|c| self.schedule.next_due(c));
        session.normal_context = context;
    }

    fn fail(&self, session: &Session, retries_exhausted: bool) -> Notice {
        TraceEvent::ScheduleFailed {
            next_due: session.normal_start(),
            retries_exhausted,
        }
        .emit();
        tracing::warn!(
            retries_exhausted,
            next = %render(session.normal_result.as_ref()),
            "run failed; moving to next normal window"
        );
        Notice::Failed(session.normal_start())
    }

    fn ensure_initialised(&self, session: &Session) -> Result<()> {
        if session.current.is_none() {
            return Err(Error::State("schedule calculator is not initialised".into()));
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn current_schedule_type(&self) -> ScheduleType {
        self.session.lock().current.unwrap_or(ScheduleType::Undefined)
    }

    /// When the scheduling loop should next act: the start of the normal
    /// window, or the end of the retry window while retrying.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        let session = self.session.lock();
        match session.current {
            Some(ScheduleType::Retry) => session.retry_result.map(|r| r.interval().up_to_date()),
            Some(_) => session.normal_start(),
            None => None,
        }
    }

    pub fn normal_result(&self) -> Option<ScheduleResult> {
        self.session.lock().normal_result
    }

    pub fn retry_result(&self) -> Option<ScheduleResult> {
        self.session.lock().retry_result
    }

    /// Copy of the shared state map, for persisting alongside
    /// [`normal_result`](Self::normal_result).
    pub fn state_data(&self) -> HashMap<String, Value> {
        self.session
            .lock()
            .normal_context
            .as_ref()
            .map(ScheduleContext::snapshot)
            .unwrap_or_default()
    }

    // ── Listeners ────────────────────────────────────────────────────

    pub fn add_listener(&self, listener: Arc<dyn ScheduleListener>) {
        self.session.lock().listeners.push(listener);
    }

    /// Remove a registration by identity.  Returns whether it was found.
    pub fn remove_listener(&self, listener: &Arc<dyn ScheduleListener>) -> bool {
        let mut session = self.session.lock();
        let before = session.listeners.len();
        session.listeners.retain(|l| !same_listener(l, listener));
        session.listeners.len() != before
    }
}

fn same_listener(a: &Arc<dyn ScheduleListener>, b: &Arc<dyn ScheduleListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

fn notify(listeners: &[Arc<dyn ScheduleListener>], notice: &Notice) {
    for listener in listeners {
        notice.deliver(listener.as_ref());
    }
}

fn render(result: Option<&ScheduleResult>) -> String {
    match result {
        Some(r) => r.to_string(),
        None => "never".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::schedules::IntervalSchedule;
    use chrono::{TimeDelta, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, h, m, 0).unwrap()
    }

    fn hourly(clock: &Arc<ManualClock>) -> ScheduleCalculator {
        ScheduleCalculator::builder()
            .clock(clock.clone())
            .schedule(Arc::new(IntervalSchedule::new(TimeDelta::hours(1))))
            .zone(chrono_tz::UTC)
            .build()
            .unwrap()
    }

    #[test]
    fn build_requires_clock() {
        let err = ScheduleCalculator::builder().build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn default_schedule_fires_once() {
        let clock = Arc::new(ManualClock::new(at(10, 0)));
        let calc = ScheduleCalculator::builder().clock(clock).build().unwrap();
        let first = calc.initialise(None, HashMap::new()).unwrap().unwrap();
        assert_eq!(first.interval(), &IntervalTo::point(at(10, 0)));
        assert_eq!(calc.calculate_complete().unwrap(), None);
        assert_eq!(calc.next_due(), None);
    }

    #[test]
    fn type_is_undefined_until_initialised() {
        let clock = Arc::new(ManualClock::new(at(10, 0)));
        let calc = hourly(&clock);
        assert_eq!(calc.current_schedule_type(), ScheduleType::Undefined);
        assert_eq!(calc.current_schedule_type().to_string(), "Undefined");
        assert!(matches!(calc.calculate_complete(), Err(Error::State(_))));
        assert!(matches!(calc.calculate_retry(), Err(Error::State(_))));
        calc.initialise(None, HashMap::new()).unwrap();
        assert_eq!(calc.current_schedule_type(), ScheduleType::Normal);
    }

    #[test]
    fn second_initialise_is_a_state_error() {
        let clock = Arc::new(ManualClock::new(at(10, 0)));
        let calc = hourly(&clock);
        calc.initialise(None, HashMap::new()).unwrap();
        let err = calc.initialise(None, HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::State(_)));
    }

    #[test]
    fn complete_advances_to_use_next() {
        let clock = Arc::new(ManualClock::new(at(10, 0)));
        let calc = hourly(&clock);
        calc.initialise(None, HashMap::new()).unwrap();
        let next = calc.calculate_complete().unwrap().unwrap();
        assert_eq!(next.interval(), &IntervalTo::new(at(11, 0), at(12, 0)));
        assert_eq!(calc.next_due(), Some(at(11, 0)));
    }

    #[test]
    fn state_data_round_trips() {
        let clock = Arc::new(ManualClock::new(at(10, 0)));
        let calc = hourly(&clock);
        let mut seed = HashMap::new();
        seed.insert("runs".to_string(), Value::from(3));
        calc.initialise(None, seed).unwrap();
        assert_eq!(calc.state_data().get("runs"), Some(&Value::from(3)));
    }

    #[test]
    fn listeners_removed_by_identity() {
        struct Noop;
        impl ScheduleListener for Noop {}

        let clock = Arc::new(ManualClock::new(at(10, 0)));
        let calc = hourly(&clock);
        let a: Arc<dyn ScheduleListener> = Arc::new(Noop);
        let b: Arc<dyn ScheduleListener> = Arc::new(Noop);
        calc.add_listener(a.clone());
        assert!(!calc.remove_listener(&b));
        assert!(calc.remove_listener(&a));
        assert!(!calc.remove_listener(&a));
    }
}
