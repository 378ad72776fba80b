//! Per-file results and run-wide aggregation.

use crate::core::types::IocCategory;
use crate::scanner::context::RunContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Matches of one category within one file: match string to absolute offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchRecord {
    entries: BTreeMap<String, Vec<u64>>,
}

impl MatchRecord {
    /// Record one occurrence of `matched` at `offset`.
    ///
    /// Offsets of an entry stay sorted even when several patterns of the
    /// category report the same string out of order within a chunk.
    pub fn add(&mut self, matched: &str, offset: u64) {
        if let Some(offsets) = self.entries.get_mut(matched) {
            let idx = offsets.partition_point(|&o| o <= offset);
            offsets.insert(idx, offset);
        } else {
            self.entries.insert(matched.to_string(), vec![offset]);
        }
    }

    /// Offsets recorded for a match string.
    pub fn offsets(&self, matched: &str) -> Option<&[u64]> {
        self.entries.get(matched).map(Vec::as_slice)
    }

    /// Iterate over `(match string, offsets)` pairs in match-string order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.entries
            .iter()
            .map(|(m, offsets)| (m.as_str(), offsets.as_slice()))
    }

    /// Number of distinct match strings.
    pub fn unique_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of recorded occurrences.
    pub fn occurrence_count(&self) -> u64 {
        self.entries.values().map(|o| o.len() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All matches for one scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Matches per category
    pub matches: BTreeMap<IocCategory, MatchRecord>,
    /// Occurrence count per category
    pub counts: BTreeMap<IocCategory, u64>,
}

impl FileResult {
    /// Create an empty result for a file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            matches: BTreeMap::new(),
            counts: BTreeMap::new(),
        }
    }

    /// Record an accepted match and bump the category count.
    pub fn record(&mut self, category: IocCategory, matched: &str, offset: u64) {
        self.matches.entry(category).or_default().add(matched, offset);
        *self.counts.entry(category).or_insert(0) += 1;
    }

    /// Occurrence count for a category.
    pub fn count(&self, category: IocCategory) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// The match record of a category, if anything was found.
    pub fn record_for(&self, category: IocCategory) -> Option<&MatchRecord> {
        self.matches.get(&category)
    }

    /// Total number of occurrences across categories.
    pub fn total_matches(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn has_matches(&self) -> bool {
        self.total_matches() > 0
    }

    /// File name component of the path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Iterate over every occurrence as `(category, match, offset)`.
    pub fn occurrences(&self) -> impl Iterator<Item = (IocCategory, &str, u64)> {
        self.matches.iter().flat_map(|(&category, record)| {
            record
                .iter()
                .flat_map(move |(m, offsets)| offsets.iter().map(move |&o| (category, m, o)))
        })
    }
}

/// A file that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Run-wide aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Occurrences per category, summed across files
    pub categories: BTreeMap<IocCategory, u64>,
    /// Files that produced a result
    pub files_scanned: u64,
    /// Files skipped because of an I/O error
    pub files_failed: u64,
    /// Files skipped because their path is whitelisted
    pub whitelisted_files: u64,
    /// Matches suppressed by the whitelist
    pub whitelisted_matches: u64,
    /// Matches discarded for exceeding the size limit
    pub oversized_matches: u64,
    /// Matches discarded because they are not valid UTF-8
    pub undecodable_matches: u64,
    /// Directory entries that could not be read
    pub skipped_entries: u64,
    /// Run start time
    pub start_time: Option<DateTime<Utc>>,
    /// Run duration in milliseconds
    pub duration_ms: u64,
}

impl ScanSummary {
    /// Occurrence total for a category.
    pub fn category_total(&self, category: IocCategory) -> u64 {
        self.categories.get(&category).copied().unwrap_or(0)
    }

    /// Total occurrences across categories.
    pub fn total_matches(&self) -> u64 {
        self.categories.values().sum()
    }

    /// Label to count pairs for summary printing.
    ///
    /// Whitelist and size-limit counters are only listed when non-zero;
    /// categories are listed when they produced matches.
    pub fn labels(&self) -> Vec<(String, u64)> {
        let mut labels = Vec::new();

        if self.whitelisted_files > 0 {
            labels.push(("Whitelisted files".to_string(), self.whitelisted_files));
        }
        if self.whitelisted_matches > 0 {
            labels.push(("Whitelisted matches".to_string(), self.whitelisted_matches));
        }
        if self.oversized_matches > 0 {
            labels.push(("Oversized matches".to_string(), self.oversized_matches));
        }

        for (category, &count) in &self.categories {
            if count > 0 {
                labels.push((category.to_string(), count));
            }
        }

        labels
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// The final output of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub results: Vec<FileResult>,
    pub failed: Vec<FailedFile>,
    pub summary: ScanSummary,
}

impl ScanReport {
    /// Look up the result of a path.
    pub fn result_for(&self, path: &Path) -> Option<&FileResult> {
        self.results.iter().find(|r| r.path == path)
    }
}

/// Single-threaded collector of worker output.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<FileResult>,
    failed: Vec<FailedFile>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect a completed file result.
    pub fn add(&mut self, result: FileResult) {
        self.results.push(result);
    }

    /// Collect a per-file failure.
    pub fn add_failure(&mut self, path: PathBuf, reason: String) {
        self.failed.push(FailedFile { path, reason });
    }

    /// Number of results collected so far.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Compute the summary and hand out the final report.
    ///
    /// Must only be called once every worker has terminated.
    pub fn finish(self, context: &RunContext, started_at: DateTime<Utc>) -> ScanReport {
        let mut categories: BTreeMap<IocCategory, u64> = BTreeMap::new();
        for result in &self.results {
            for (&category, &count) in &result.counts {
                *categories.entry(category).or_insert(0) += count;
            }
        }

        let summary = ScanSummary {
            categories,
            files_scanned: self.results.len() as u64,
            files_failed: self.failed.len() as u64,
            whitelisted_files: context.whitelisted_files(),
            whitelisted_matches: context.whitelisted_matches(),
            oversized_matches: context.oversized_matches(),
            undecodable_matches: context.undecodable_matches(),
            skipped_entries: context.skipped_entries(),
            start_time: Some(started_at),
            duration_ms: context.start_time().elapsed().as_millis() as u64,
        };

        ScanReport {
            results: self.results,
            failed: self.failed,
            summary,
        }
    }
}
