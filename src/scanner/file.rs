//! Top-level file system scanner.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{IocCategory, MatchCallback};
use crate::detection::{PatternSet, WhitelistIndex};
use crate::scanner::context::RunContext;
use crate::scanner::dispatch::Dispatcher;
use crate::scanner::enumerate::FileEnumerator;
use crate::scanner::progress::ScanProgress;
use crate::scanner::results::ScanReport;
use crate::scanner::worker::{ChunkOptions, ScanWorker};
use std::path::Path;
use std::sync::Arc;

/// File system scanner.
///
/// Owns the compiled pattern set and whitelist for one configuration and
/// the run context of its next scan.
pub struct FileScanner {
    config: Arc<Config>,
    patterns: Arc<PatternSet>,
    whitelist: Arc<WhitelistIndex>,
    context: Arc<RunContext>,
    on_match: Option<MatchCallback>,
}

impl FileScanner {
    /// Create a scanner for the selected categories.
    ///
    /// Fails with a configuration error before touching the file system if
    /// the configuration, any pattern, or any whitelist entry is invalid.
    pub fn new(config: Arc<Config>, categories: &[IocCategory]) -> Result<Self> {
        config.validate()?;

        let patterns = PatternSet::compile(&config.patterns, categories)?;
        let whitelist = WhitelistIndex::from_config(&config.whitelist)?;

        log::debug!(
            "Compiled {} pattern(s) for {:?}",
            patterns.pattern_count(),
            patterns.categories()
        );

        Ok(Self {
            config,
            patterns: Arc::new(patterns),
            whitelist: Arc::new(whitelist),
            context: Arc::new(RunContext::new()),
            on_match: None,
        })
    }

    /// Invoke `callback` for every accepted match as it is found.
    pub fn with_match_callback(mut self, callback: MatchCallback) -> Self {
        self.on_match = Some(callback);
        self
    }

    /// Set a progress callback, fired after every completed block.
    pub fn set_progress_callback<F>(&self, callback: F)
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        self.context.set_callback(callback);
    }

    /// The run context shared with the workers.
    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    /// Cancel the current scan.
    pub fn cancel(&self) {
        self.context.cancel();
    }

    /// Check if the scan has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancelled()
    }

    /// Scan a file or directory and return the aggregated report.
    pub async fn scan(&self, root: &Path) -> Result<ScanReport> {
        log::info!("Starting scan of {}", root.display());

        let enumeration = FileEnumerator::new(&self.whitelist)
            .follow_symlinks(self.config.scan.follow_symlinks)
            .enumerate(root, &self.context)?;

        self.context.add_whitelisted_files(enumeration.whitelisted_files);
        self.context.add_skipped_entries(enumeration.skipped_entries);

        if enumeration.tasks.is_empty() {
            return Err(Error::EmptyInput);
        }

        log::info!(
            "Found {} files to scan ({} whitelisted)",
            enumeration.tasks.len(),
            enumeration.whitelisted_files
        );
        self.context.set_total_files(enumeration.tasks.len() as u64);

        let worker = ScanWorker::new(
            Arc::clone(&self.patterns),
            Arc::clone(&self.whitelist),
            ChunkOptions::from(&self.config.scan),
            Arc::clone(&self.context),
        )
        .with_match_callback(self.on_match.clone());

        Dispatcher::new(
            worker,
            Arc::clone(&self.context),
            self.config.scan.effective_workers(),
        )
        .run(enumeration.tasks)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MatchEvent;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::tempdir;

    #[test]
    fn test_invalid_pattern_fails_before_scan() {
        let mut config = Config::default();
        config
            .patterns
            .definitions
            .insert(IocCategory::Url, vec!["(unclosed".to_string()]);

        let err = FileScanner::new(Arc::new(config), &[IocCategory::Url])
            .err()
            .unwrap();
        assert!(matches!(err, Error::PatternCompile { .. }));
    }

    #[test]
    fn test_small_max_match_size_is_rejected() {
        let mut config = Config::default();
        config.scan.max_match_size = 4;
        assert!(FileScanner::new(Arc::new(config), &IocCategory::ALL).is_err());
    }

    #[tokio::test]
    async fn test_scan_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.log"), "connect 192.168.7.7 ok").unwrap();
        std::fs::write(dir.path().join("b.log"), "mailto admin@corp.example").unwrap();

        let scanner = FileScanner::new(Arc::new(Config::default()), &IocCategory::ALL).unwrap();
        let report = scanner.scan(dir.path()).await.unwrap();

        assert_eq!(report.summary.files_scanned, 2);
        assert_eq!(report.summary.category_total(IocCategory::Ip), 1);
        assert_eq!(report.summary.category_total(IocCategory::Mail), 1);
    }

    #[tokio::test]
    async fn test_scan_empty_directory() {
        let dir = tempdir().unwrap();
        let scanner = FileScanner::new(Arc::new(Config::default()), &IocCategory::ALL).unwrap();
        let err = scanner.scan(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[tokio::test]
    async fn test_match_callback_fires() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), "1.1.1.1 2.2.2.2 3.3.3.3").unwrap();

        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let callback: MatchCallback = Arc::new(move |_: &MatchEvent<'_>| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let scanner = FileScanner::new(Arc::new(Config::default()), &[IocCategory::Ip])
            .unwrap()
            .with_match_callback(callback);
        scanner.scan(dir.path()).await.unwrap();

        assert_eq!(hits.load(Ordering::Relaxed), 3);
    }
}
