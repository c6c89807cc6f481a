//! Command-line front end for the cadence scheduler.

pub mod cli;
