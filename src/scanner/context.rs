//! Shared run state for one crawl.
//!
//! A `RunContext` is created per run and handed to every worker behind an
//! `Arc`. All counters are atomics, so concurrent updates are never lost.

use crate::scanner::progress::ScanProgress;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Run-wide counters, cancellation flag and progress hook.
pub struct RunContext {
    total_files: AtomicU64,
    files_processed: AtomicU64,
    whitelisted_files: AtomicU64,
    skipped_entries: AtomicU64,
    whitelisted_matches: AtomicU64,
    oversized_matches: AtomicU64,
    undecodable_matches: AtomicU64,
    cancelled: AtomicBool,
    start_time: Instant,
    callback: RwLock<Option<ProgressCallback>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Create a new context with all counters at zero.
    pub fn new() -> Self {
        Self {
            total_files: AtomicU64::new(0),
            files_processed: AtomicU64::new(0),
            whitelisted_files: AtomicU64::new(0),
            skipped_entries: AtomicU64::new(0),
            whitelisted_matches: AtomicU64::new(0),
            oversized_matches: AtomicU64::new(0),
            undecodable_matches: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            start_time: Instant::now(),
            callback: RwLock::new(None),
        }
    }

    /// Set a progress callback, fired whenever a worker completes a block.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        match self.callback.write() {
            Ok(mut cb) => *cb = Some(Box::new(callback)),
            Err(_) => log::error!("Progress callback lock poisoned"),
        }
    }

    /// Set the number of files queued for scanning.
    pub fn set_total_files(&self, total: u64) {
        self.total_files.store(total, Ordering::Relaxed);
    }

    /// Record files skipped because their path is whitelisted.
    pub fn add_whitelisted_files(&self, count: u64) {
        self.whitelisted_files.fetch_add(count, Ordering::Relaxed);
    }

    /// Record directory entries that could not be read during enumeration.
    pub fn add_skipped_entries(&self, count: u64) {
        self.skipped_entries.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a match suppressed by the whitelist.
    pub fn increment_whitelisted_matches(&self) {
        self.whitelisted_matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a match discarded for exceeding the size limit.
    pub fn increment_oversized_matches(&self) {
        self.oversized_matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a match whose bytes are not valid UTF-8.
    pub fn increment_undecodable_matches(&self) {
        self.undecodable_matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a drained block to the processed-file counter and report progress.
    pub fn complete_block(&self, files: usize) {
        self.files_processed
            .fetch_add(files as u64, Ordering::AcqRel);
        self.fire_callback();
    }

    /// Request cancellation of the run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn total_files(&self) -> u64 {
        self.total_files.load(Ordering::Relaxed)
    }

    pub fn files_processed(&self) -> u64 {
        self.files_processed.load(Ordering::Acquire)
    }

    pub fn whitelisted_files(&self) -> u64 {
        self.whitelisted_files.load(Ordering::Relaxed)
    }

    pub fn skipped_entries(&self) -> u64 {
        self.skipped_entries.load(Ordering::Relaxed)
    }

    pub fn whitelisted_matches(&self) -> u64 {
        self.whitelisted_matches.load(Ordering::Relaxed)
    }

    pub fn oversized_matches(&self) -> u64 {
        self.oversized_matches.load(Ordering::Relaxed)
    }

    pub fn undecodable_matches(&self) -> u64 {
        self.undecodable_matches.load(Ordering::Relaxed)
    }

    /// Time the context was created.
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Get current progress snapshot.
    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            files_processed: self.files_processed(),
            total_files: self.total_files(),
            whitelisted_matches: self.whitelisted_matches(),
            oversized_matches: self.oversized_matches(),
            start_time: self.start_time,
            is_cancelled: self.is_cancelled(),
        }
    }

    fn fire_callback(&self) {
        if let Ok(callback) = self.callback.read() {
            if let Some(ref cb) = *callback {
                cb(self.snapshot());
            }
        }
    }
}
