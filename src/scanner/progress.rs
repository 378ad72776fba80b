//! Scan progress snapshots and console reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Scan progress information.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files processed by workers
    pub files_processed: u64,
    /// Number of files queued for scanning
    pub total_files: u64,
    /// Number of matches suppressed by the whitelist
    pub whitelisted_matches: u64,
    /// Number of matches discarded for exceeding the size limit
    pub oversized_matches: u64,
    /// Scan start time
    pub start_time: Instant,
    /// Whether the run was cancelled
    pub is_cancelled: bool,
}

impl ScanProgress {
    /// Calculate elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Calculate scan rate (files per second).
    pub fn files_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.files_processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Calculate completion percentage.
    pub fn percentage(&self) -> f64 {
        if self.total_files > 0 {
            (self.files_processed as f64 / self.total_files as f64) * 100.0
        } else {
            100.0
        }
    }

    /// Check if every queued file has been processed.
    pub fn is_complete(&self) -> bool {
        self.files_processed >= self.total_files
    }
}

/// Console progress reporter.
pub struct ConsoleProgressReporter {
    last_reported: AtomicUsize,
}

impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleProgressReporter {
    /// Create a new console reporter.
    pub fn new() -> Self {
        Self {
            last_reported: AtomicUsize::new(0),
        }
    }

    /// Format a progress line.
    pub fn format(progress: &ScanProgress) -> String {
        format!(
            " |- Processed files: {} / {} [{:.2} %] {:.1} files/s",
            progress.files_processed,
            progress.total_files,
            progress.percentage(),
            progress.files_per_second()
        )
    }

    /// Report progress to the console.
    ///
    /// Blocks can finish out of order; a snapshot older than the last one
    /// printed is dropped.
    pub fn report(&self, progress: &ScanProgress) {
        let processed = progress.files_processed as usize;
        let previous = self.last_reported.fetch_max(processed, Ordering::Relaxed);
        if processed < previous {
            return;
        }
        println!("{}", Self::format(progress));

        if progress.is_complete() && processed > previous {
            log::info!(
                "All {} files processed in {:.2}s",
                progress.total_files,
                progress.elapsed().as_secs_f64()
            );
        }
    }
}
