//! Command implementations for the `api-vault` binary

pub mod commands;
pub mod logging;
pub mod prompt;
