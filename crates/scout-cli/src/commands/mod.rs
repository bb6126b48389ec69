//! Subcommand implementations.

pub mod clear;
pub mod extract;
pub mod index;
pub mod preview;
pub mod query;
pub mod status;
