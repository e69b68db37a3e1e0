//! CLI command implementations.

pub mod chat;
pub mod config;
pub mod guide;
pub mod index;
pub mod serve;
