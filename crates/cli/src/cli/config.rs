use cad_domain::config::{Config, ConfigError, ConfigSeverity};

/// Render validation issues the way `config validate` prints them.
pub fn report(issues: &[ConfigError], config_path: &str) -> String {
    if issues.is_empty() {
        return format!("Config OK ({config_path})\n");
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    let mut out = String::new();
    for issue in issues {
        out.push_str(&format!("{issue}\n"));
    }
    out.push_str(&format!(
        "\n{error_count} error(s), {warning_count} warning(s) in {config_path}\n"
    ));
    out
}

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when errors (not just warnings) are found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    print!("{}", report(&issues, config_path));
    !issues.iter().any(|e| e.severity == ConfigSeverity::Error)
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)?;
    print!("{output}");
    Ok(())
}
