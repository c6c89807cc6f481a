//! Evaluation input handed to a [`Schedule`](crate::Schedule).

use std::collections::HashMap;
use std::sync::Arc;

use cad_domain::{Error, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde_json::Value;

use crate::interval::IntervalTo;

/// Key/value store shared by every context derived from the same root.
pub type StateMap = Arc<Mutex<HashMap<String, Value>>>;

/// The zone named by `TZ` when it is a valid IANA name, else UTC.
pub fn system_zone() -> Tz {
    std::env::var("TZ")
        .ok()
        .and_then(|tz| tz.trim_start_matches(':').parse::<Tz>().ok())
        .unwrap_or(chrono_tz::UTC)
}

/// Immutable evaluation input: a reference instant, a zone, an optional
/// enclosing window, and a state map.
///
/// Derivations (`spawn`, `spawn_at`, `move_to`) copy everything they do not
/// replace.  The state map is the one shared, mutable part: every context
/// derived from the same root sees the same map, which is how stateful
/// schedules remember progress across an evaluation chain.
#[derive(Clone, Debug)]
pub struct ScheduleContext {
    date: Option<DateTime<Utc>>,
    zone: Tz,
    data: StateMap,
    parent: Option<IntervalTo>,
}

impl ScheduleContext {
    /// A root context in the system zone with an empty state map.
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            date: Some(date),
            zone: system_zone(),
            data: StateMap::default(),
            parent: None,
        }
    }

    /// Build from a possibly absent instant (e.g. one read back from
    /// storage).  An absent instant is rejected here rather than surfacing
    /// later as "never due".
    pub fn from_optional(date: Option<DateTime<Utc>>) -> Result<Self> {
        date.map(Self::new).ok_or(Error::MissingDate)
    }

    pub fn with_zone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    /// Seed the state map.  Replaces the map, so call it on a root context.
    pub fn with_data(mut self, data: HashMap<String, Value>) -> Self {
        self.data = Arc::new(Mutex::new(data));
        self
    }

    /// Share an existing state map.
    pub fn with_state(mut self, data: StateMap) -> Self {
        self.data = data;
        self
    }

    /// The reference instant.  `None` once a chain has run past its last
    /// occurrence; schedules treat that as never due.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// The window imposed by an enclosing schedule, if any.
    pub fn parent_interval(&self) -> Option<&IntervalTo> {
        self.parent.as_ref()
    }

    pub fn get_data(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    pub fn put_data(&self, key: impl Into<String>, value: Value) {
        self.data.lock().insert(key.into(), value);
    }

    pub fn state(&self) -> StateMap {
        Arc::clone(&self.data)
    }

    /// Copy of the state map's current contents.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.data.lock().clone()
    }

    /// Same instant, constrained to `parent`.
    pub fn spawn(&self, parent: IntervalTo) -> Self {
        Self {
            parent: Some(parent),
            ..self.clone()
        }
    }

    /// A new instant, constrained to `parent`.
    pub fn spawn_at(&self, date: DateTime<Utc>, parent: IntervalTo) -> Self {
        Self {
            date: Some(date),
            parent: Some(parent),
            ..self.clone()
        }
    }

    /// Re-anchor at `date`, keeping zone, parent and state.
    pub fn move_to(&self, date: Option<DateTime<Utc>>) -> Self {
        Self {
            date,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, h, 0, 0).unwrap()
    }

    #[test]
    fn absent_date_is_rejected() {
        assert!(matches!(
            ScheduleContext::from_optional(None),
            Err(Error::MissingDate)
        ));
        let ctx = ScheduleContext::from_optional(Some(at(9))).unwrap();
        assert_eq!(ctx.date(), Some(at(9)));
    }

    #[test]
    fn derivations_preserve_the_rest() {
        let window = IntervalTo::new(at(9), at(17));
        let root = ScheduleContext::new(at(8)).with_zone(chrono_tz::Europe::Paris);

        let spawned = root.spawn(window);
        assert_eq!(spawned.date(), Some(at(8)));
        assert_eq!(spawned.zone(), chrono_tz::Europe::Paris);
        assert_eq!(spawned.parent_interval(), Some(&window));

        let spawned_at = root.spawn_at(at(10), window);
        assert_eq!(spawned_at.date(), Some(at(10)));
        assert_eq!(spawned_at.parent_interval(), Some(&window));

        let moved = spawned.move_to(Some(at(12)));
        assert_eq!(moved.date(), Some(at(12)));
        assert_eq!(moved.zone(), chrono_tz::Europe::Paris);
        assert_eq!(moved.parent_interval(), Some(&window));

        // The original is untouched.
        assert_eq!(root.date(), Some(at(8)));
        assert!(root.parent_interval().is_none());
    }

    #[test]
    fn state_is_shared_across_derivations() {
        let root = ScheduleContext::new(at(8));
        let child = root.spawn(IntervalTo::new(at(9), at(17))).move_to(Some(at(10)));
        child.put_data("progress", serde_json::json!(3));
        assert_eq!(root.get_data("progress"), Some(serde_json::json!(3)));
        assert_eq!(root.snapshot().len(), 1);
    }

    #[test]
    fn seeded_state_is_visible() {
        let mut seed = HashMap::new();
        seed.insert("k".to_string(), serde_json::json!("v"));
        let ctx = ScheduleContext::new(at(8)).with_data(seed);
        assert_eq!(ctx.get_data("k"), Some(serde_json::json!("v")));
        assert_eq!(ctx.get_data("missing"), None);
    }

    #[test]
    fn move_to_none_clears_date() {
        let ctx = ScheduleContext::new(at(8)).move_to(None);
        assert!(ctx.date().is_none());
    }
}
