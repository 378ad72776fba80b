//! ioc-crawler: a parallel extractor of indicators of compromise.
//!
//! This crate scans files, directories and mount points for IP addresses,
//! URLs, e-mail addresses and Windows registry keys. Files are read in
//! overlapping chunks by a pool of workers, matches are filtered against
//! prefix whitelists, and results are aggregated per file with absolute byte
//! offsets.

pub mod core;
pub mod detection;
pub mod scanner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
pub use crate::scanner::{FileScanner, ScanReport, ScanSummary};
