//! Subcommand modules for the `blockcon` binary.

pub mod concordance;
pub mod merge;
