//! Shared types for the Cadence scheduling crates: the error type,
//! declarative configuration and structured trace events.

pub mod config;
pub mod error;
pub mod trace;

pub use error::{Error, Result};
