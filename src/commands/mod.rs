//! Command implementations for the DOGE export CLI

pub mod export;

pub use export::{handle_export, print_summary, ExportParams, ExportSummary};
