pub mod config;
pub mod next;
pub mod simulate;

use anyhow::Context;
use cad_domain::config::{parse_timezone, Config};
use cad_schedule::calendar::resolve_local;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

/// Cadence — due-interval scheduling with retry windows.
#[derive(Debug, Parser)]
#[command(name = "cadence", version, about)]
pub struct Cli {
    /// Path to the config file (overrides `CADENCE_CONFIG`).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the upcoming due intervals of the configured schedule.
    Next {
        /// Evaluate from this instant instead of now (RFC 3339, or
        /// `YYYY-MM-DD HH:MM[:SS]` in the configured zone).
        #[arg(long)]
        at: Option<String>,
        /// How many intervals to print.
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        /// One JSON object per line instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Drive a calculator session through a sequence of run outcomes.
    Simulate {
        /// Start instant (default now).
        #[arg(long)]
        at: Option<String>,
        /// Comma-separated outcomes: `ok` or `fail`.
        #[arg(long, value_delimiter = ',')]
        outcomes: Vec<simulate::Outcome>,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from `path`, else `CADENCE_CONFIG`, else
/// `cadence.toml`.  A missing file yields the defaults.  Returns the parsed
/// [`Config`] and the path that was used.
pub fn load_config(path: Option<&str>) -> anyhow::Result<(Config, String)> {
    let config_path = match path {
        Some(path) => path.to_string(),
        None => std::env::var("CADENCE_CONFIG").unwrap_or_else(|_| "cadence.toml".into()),
    };

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {config_path}"))?;
        Config::from_toml(&raw).with_context(|| format!("parsing {config_path}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

/// The configured zone, or the system zone when none is set.
pub fn resolve_zone(config: &Config) -> anyhow::Result<Tz> {
    match &config.timezone {
        Some(tz) => parse_timezone(tz).map_err(anyhow::Error::msg),
        None => Ok(cad_schedule::system_zone()),
    }
}

/// Read an instant given on the command line.  Values without an offset
/// are wall-clock times in `zone`.
pub fn parse_instant(s: &str, zone: Tz) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let local = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .with_context(|| format!("invalid instant '{s}': use RFC 3339 or 'YYYY-MM-DD HH:MM[:SS]'"))?;
    Ok(resolve_local(zone, local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let (config, used) = load_config(path.to_str()).unwrap();
        assert_eq!(used, path.to_str().unwrap());
        assert!(config.retry.is_none());
    }

    #[test]
    fn explicit_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.toml");
        std::fs::write(&path, "timezone = \"Asia/Tokyo\"\n").unwrap();
        let (config, _) = load_config(path.to_str()).unwrap();
        assert_eq!(resolve_zone(&config).unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[schedule]\ntype = 3\n").unwrap();
        let err = load_config(path.to_str()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn instants_with_and_without_offset() {
        let utc = Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap();
        assert_eq!(parse_instant("2024-06-15T10:00:00+02:00", chrono_tz::UTC).unwrap(), utc);
        assert_eq!(parse_instant("2024-06-15 10:00", chrono_tz::Europe::Berlin).unwrap(), utc);
        assert!(parse_instant("tomorrow", chrono_tz::UTC).is_err());
    }
}
