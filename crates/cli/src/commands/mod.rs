//! Subcommand implementations

pub mod predictions;
pub mod resources;
