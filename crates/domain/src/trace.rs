use chrono::{DateTime, Utc};
use serde::Serialize;

/// Structured trace events emitted by the schedule calculator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CalculatorInitialised {
        resumed_from: Option<DateTime<Utc>>,
        next_due: Option<DateTime<Utc>>,
    },
    ScheduleComplete {
        completed_from: Option<DateTime<Utc>>,
        completed_to: Option<DateTime<Utc>>,
        next_due: Option<DateTime<Utc>>,
    },
    ScheduleRetry {
        window_from: Option<DateTime<Utc>>,
        retry_at: DateTime<Utc>,
    },
    ScheduleFailed {
        next_due: Option<DateTime<Utc>>,
        retries_exhausted: bool,
    },
    ScheduleSwitched {
        from: String,
        to: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cad_event");
    }
}
