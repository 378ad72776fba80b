//! File scanning functionality.
//!
//! This module provides the scanning pipeline:
//! - Target enumeration with path whitelisting
//! - Block dispatch onto a pool of blocking workers
//! - Boundary-safe chunked scanning of each file
//! - Result aggregation and progress reporting

pub mod context;
pub mod dispatch;
pub mod enumerate;
pub mod file;
pub mod progress;
pub mod results;
pub mod worker;

pub use context::RunContext;
pub use dispatch::{BlockPlan, BlockQueue, Dispatcher, FileBlock, WorkerEvent};
pub use enumerate::{Enumeration, FileEnumerator};
pub use file::FileScanner;
pub use progress::{ConsoleProgressReporter, ScanProgress};
pub use results::{FailedFile, FileResult, MatchRecord, ResultAggregator, ScanReport, ScanSummary};
pub use worker::{ChunkOptions, ScanWorker};
