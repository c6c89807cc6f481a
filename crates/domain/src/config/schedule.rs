//! Declarative schedule definitions and the parsers that validate them.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigSeverity};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Schedule definitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A schedule as written in configuration.
///
/// ```toml
/// [schedule]
/// type = "weekly"
/// from = 1
/// to = 5
///
/// [schedule.refinement]
/// type = "daily"
/// from = "09:00"
/// to = "17:00"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleDef {
    /// Due once, immediately.
    #[default]
    Now,
    /// Times of day, `HH:MM` or `HH:MM:SS`.
    Daily {
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        refinement: Option<Box<ScheduleDef>>,
    },
    /// ISO weekdays, Monday = 1 .. Sunday = 7.
    Weekly {
        #[serde(default)]
        from: Option<u32>,
        #[serde(default)]
        to: Option<u32>,
        #[serde(default)]
        refinement: Option<Box<ScheduleDef>>,
    },
    /// Days of month; negative values count back from the month end.
    Monthly {
        #[serde(default)]
        from: Option<i32>,
        #[serde(default)]
        to: Option<i32>,
        #[serde(default)]
        refinement: Option<Box<ScheduleDef>>,
    },
    /// Months of year, January = 1.
    Yearly {
        #[serde(default)]
        from: Option<u32>,
        #[serde(default)]
        to: Option<u32>,
        #[serde(default)]
        refinement: Option<Box<ScheduleDef>>,
    },
    /// Back-to-back windows of a fixed length, e.g. `"5m"` or `"1h30m"`.
    Interval { every: String },
    /// At most `count` occurrences per enclosing window.
    Count {
        count: u32,
        #[serde(default)]
        refinement: Option<Box<ScheduleDef>>,
    },
    /// Earliest of several schedules.
    List {
        #[serde(default)]
        schedules: Vec<ScheduleDef>,
    },
}

impl ScheduleDef {
    /// Short name of the definition kind, matching the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Daily { .. } => "daily",
            Self::Weekly { .. } => "weekly",
            Self::Monthly { .. } => "monthly",
            Self::Yearly { .. } => "yearly",
            Self::Interval { .. } => "interval",
            Self::Count { .. } => "count",
            Self::List { .. } => "list",
        }
    }

    /// Validate this definition (recursively), appending issues found under
    /// the dotted `path`.
    pub fn validate_into(&self, path: &str, errors: &mut Vec<ConfigError>) {
        let mut error = |field: &str, message: String| {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: format!("{path}.{field}"),
                message,
            });
        };

        match self {
            Self::Now => {}
            Self::Daily { from, to, .. } => {
                for (field, value) in [("from", from), ("to", to)] {
                    if let Some(Err(message)) = value.as_deref().map(parse_time_of_day) {
                        error(field, message);
                    }
                }
            }
            Self::Weekly { from, to, .. } => {
                for (field, value) in [("from", from), ("to", to)] {
                    if let Some(Err(message)) = value.map(validate_iso_weekday) {
                        error(field, message);
                    }
                }
                if let Err(message) = validate_span(from.map(i64::from), to.map(i64::from)) {
                    error("from", message);
                }
            }
            Self::Monthly { from, to, .. } => {
                for (field, value) in [("from", from), ("to", to)] {
                    if let Some(Err(message)) = value.map(validate_day_of_month) {
                        error(field, message);
                    }
                }
                if let Err(message) = validate_span(from.map(i64::from), to.map(i64::from)) {
                    error("from", message);
                }
            }
            Self::Yearly { from, to, .. } => {
                for (field, value) in [("from", from), ("to", to)] {
                    if let Some(Err(message)) = value.map(validate_month) {
                        error(field, message);
                    }
                }
                if let Err(message) = validate_span(from.map(i64::from), to.map(i64::from)) {
                    error("from", message);
                }
            }
            Self::Interval { every } => {
                if let Err(message) = parse_duration(every) {
                    error("every", message);
                }
            }
            Self::Count { count, .. } => {
                if *count == 0 {
                    error("count", "count must be greater than 0".into());
                }
            }
            Self::List { schedules } => {
                if schedules.is_empty() {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Warning,
                        field: format!("{path}.schedules"),
                        message: "empty list only passes through an enclosing window".into(),
                    });
                }
                for (i, child) in schedules.iter().enumerate() {
                    child.validate_into(&format!("{path}.schedules[{i}]"), errors);
                }
            }
        }

        if let Some(refinement) = self.refinement() {
            refinement.validate_into(&format!("{path}.refinement"), errors);
        }
    }

    /// The nested refinement, for kinds that carry one.
    pub fn refinement(&self) -> Option<&ScheduleDef> {
        match self {
            Self::Daily { refinement, .. }
            | Self::Weekly { refinement, .. }
            | Self::Monthly { refinement, .. }
            | Self::Yearly { refinement, .. }
            | Self::Count { refinement, .. } => refinement.as_deref(),
            Self::Now | Self::Interval { .. } | Self::List { .. } => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Field parsers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse an IANA timezone string.
pub fn parse_timezone(tz: &str) -> Result<chrono_tz::Tz, String> {
    tz.parse::<chrono_tz::Tz>().map_err(|_| {
        format!(
            "invalid timezone: '{}'; use IANA names like 'America/New_York' or 'UTC'",
            tz
        )
    })
}

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("invalid time of day '{}' — expected HH:MM or HH:MM:SS", s))
}

/// Parse a compound duration such as `5m`, `1h30m`, `90s` or `250ms`.
///
/// Supported units: `d`, `h`, `m`, `s`, `ms`.  `0s` is a valid zero length.
pub fn parse_duration(s: &str) -> Result<TimeDelta, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration must not be empty".into());
    }

    let mut total = TimeDelta::zero();
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration '{}' — expected a number", s));
        }
        let n: i64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration '{}' — number too large", s))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => TimeDelta::try_milliseconds(n),
            "s" => TimeDelta::try_seconds(n),
            "m" => TimeDelta::try_minutes(n),
            "h" => TimeDelta::try_hours(n),
            "d" => TimeDelta::try_days(n),
            "" => return Err(format!("invalid duration '{}' — missing unit", s)),
            unit => {
                return Err(format!(
                    "invalid duration '{}' — unknown unit '{}' (use d, h, m, s, ms)",
                    s, unit
                ))
            }
        };
        rest = &rest[unit_len..];

        total = part
            .and_then(|p| total.checked_add(&p))
            .ok_or_else(|| format!("invalid duration '{}' — out of range", s))?;
    }
    Ok(total)
}

/// Reject an inclusive `from..=to` range of ordinals that starts right
/// after it ends: it would cover the whole period with no gap, which
/// leaving both bounds unset already expresses.
pub fn validate_span(from: Option<i64>, to: Option<i64>) -> Result<(), String> {
    match (from, to) {
        (Some(from), Some(to)) if from == to + 1 => Err(format!(
            "from {from} directly follows to {to} and covers the whole period; leave both unset"
        )),
        _ => Ok(()),
    }
}

/// ISO weekday number: Monday = 1 .. Sunday = 7.
pub fn validate_iso_weekday(day: u32) -> Result<(), String> {
    if (1..=7).contains(&day) {
        Ok(())
    } else {
        Err(format!("weekday {} out of range 1..=7 (Monday = 1)", day))
    }
}

/// Day of month: 1..=31, or -31..=-1 counting back from the month end.
pub fn validate_day_of_month(day: i32) -> Result<(), String> {
    if day != 0 && (-31..=31).contains(&day) {
        Ok(())
    } else {
        Err(format!("day of month {} out of range 1..=31 or -31..=-1", day))
    }
}

/// Month of year: 1..=12.
pub fn validate_month(month: u32) -> Result<(), String> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(format!("month {} out of range 1..=12", month))
    }
}
