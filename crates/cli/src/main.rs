use cad_domain::config::LoggingConfig;
use cad_schedule::ScheduleContext;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cad_cli::cli::{self, Cli, Command, ConfigCommand};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_arg = cli.config.as_deref();

    match cli.command {
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config(config_arg)?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config(config_arg)?;
            cli::config::show(&config)
        }
        // Default to showing what is due next when no subcommand is given.
        None => next(config_arg, None, 5, false),
        Some(Command::Next { at, count, json }) => next(config_arg, at.as_deref(), count, json),
        Some(Command::Simulate { at, outcomes }) => {
            let (config, _) = cli::load_config(config_arg)?;
            init_tracing(&config.logging);
            let zone = cli::resolve_zone(&config)?;
            let start = match at {
                Some(at) => cli::parse_instant(&at, zone)?,
                None => Utc::now(),
            };
            for line in cli::simulate::simulate(&config, zone, start, &outcomes)? {
                println!("{line}");
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("cadence {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn next(config_arg: Option<&str>, at: Option<&str>, count: usize, json: bool) -> anyhow::Result<()> {
    let (config, _) = cli::load_config(config_arg)?;
    init_tracing(&config.logging);
    let zone = cli::resolve_zone(&config)?;
    let schedule = cad_schedule::build_schedule(&config.schedule)?;
    let start = match at {
        Some(at) => cli::parse_instant(at, zone)?,
        None => Utc::now(),
    };
    tracing::debug!(%zone, %start, kind = config.schedule.kind(), "evaluating schedule");
    let context = ScheduleContext::new(start).with_zone(zone);
    let results = cli::next::upcoming(schedule.as_ref(), &context, count);
    cli::next::print(&results, json)
}

/// Initialize stderr tracing for the command-line tools.
///
/// `RUST_LOG` wins over the configured filter.  Output stays on stderr so
/// it never mixes with results on stdout.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
