use cad_domain::config::{Config, ConfigSeverity, ScheduleDef};
use cad_domain::Error;

#[test]
fn empty_document_uses_defaults() {
    let config = Config::from_toml("").unwrap();
    assert!(config.timezone.is_none());
    assert_eq!(config.schedule, ScheduleDef::Now);
    assert!(config.retry.is_none());
    assert_eq!(config.logging.filter, "info");
    assert!(!config.logging.json);
}

#[test]
fn full_document_parses() {
    let toml_str = r#"
timezone = "Europe/London"

[schedule]
type = "daily"
from = "09:00"
to = "17:30"

[retry]
type = "interval"
every = "5m"

[logging]
filter = "info,cad_schedule=debug"
json = true
"#;
    let config = Config::from_toml(toml_str).unwrap();
    assert_eq!(config.timezone.as_deref(), Some("Europe/London"));
    assert_eq!(
        config.schedule,
        ScheduleDef::Daily {
            from: Some("09:00".into()),
            to: Some("17:30".into()),
            refinement: None,
        }
    );
    assert_eq!(config.retry, Some(ScheduleDef::Interval { every: "5m".into() }));
    assert!(config.logging.json);
    assert!(config.validate().is_empty());
}

#[test]
fn unknown_schedule_type_is_a_toml_error() {
    let err = Config::from_toml("[schedule]\ntype = \"hourly\"\n").unwrap_err();
    assert!(matches!(err, Error::Toml(_)));
}

#[test]
fn validation_collects_every_issue() {
    let toml_str = r#"
timezone = "Mars/Olympus"

[schedule]
type = "weekly"
from = 8

[schedule.refinement]
type = "daily"
from = "9 o'clock"

[logging]
filter = ""
"#;
    let config = Config::from_toml(toml_str).unwrap();
    let issues = config.validate();
    let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
    assert_eq!(
        fields,
        ["timezone", "schedule.from", "schedule.refinement.from", "logging.filter"]
    );
    assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Error));
    assert!(issues[0].to_string().starts_with("[ERROR] timezone:"));
}

#[test]
fn config_survives_toml_round_trip() {
    let config = Config::from_toml(
        r#"
[schedule]
type = "list"

[[schedule.schedules]]
type = "monthly"
from = -3

[[schedule.schedules]]
type = "count"
count = 2
"#,
    )
    .unwrap();
    let rendered = toml::to_string(&config).unwrap();
    let back = Config::from_toml(&rendered).unwrap();
    assert_eq!(back.schedule, config.schedule);
}
