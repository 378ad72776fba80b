//! User interface components.
//!
//! This module provides:
//! - CLI interface
//! - Live match printing and the run summary
//! - Report generation (CSV, JSON)

pub mod cli;
pub mod console;
pub mod report;

pub use cli::{Cli, OutputMode};
pub use console::{format_summary, MatchPrinter};
pub use report::{generate_report, CsvExporter, ReportFormat};
