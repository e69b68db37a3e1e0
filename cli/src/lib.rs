//! Library surface of the counsel CLI.
//!
//! Kept separate from the binary so commands, configuration and the engine
//! bootstrap are unit-testable.

pub mod commands;
pub mod config;
pub mod exit_codes;
pub mod runtime;
