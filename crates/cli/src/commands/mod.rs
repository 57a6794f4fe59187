//! CLI subcommand implementations

pub mod conditions;
pub mod feedback;
