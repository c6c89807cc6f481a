use chrono::{DateTime, Utc};

/// Shared error type used across all Cadence crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Fatal misconfiguration, reported at construction and never retried.
    #[error("config: {0}")]
    Config(String),

    /// An operation was invoked in a state that does not allow it.
    #[error("illegal state: {0}")]
    State(String),

    #[error("schedule context requires a reference date")]
    MissingDate,

    #[error("invalid interval: {from} is not before {to}")]
    InvalidInterval {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
