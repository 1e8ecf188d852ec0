//! Subcommand handlers.

pub mod check_config;
pub mod poll;
pub mod run;
mod util;
