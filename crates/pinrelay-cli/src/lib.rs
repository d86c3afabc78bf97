//! CLI argument models and validation for the pin relay bot.

pub mod cli_args;
pub mod cli_types;

pub use cli_args::Cli;
pub use cli_types::*;
