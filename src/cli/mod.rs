//! CLI command handlers

pub mod commands;

pub use commands::{build_report, export, preview};
