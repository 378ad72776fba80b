//! End-to-end scans through the public library API.

use ioc_crawler::core::config::Config;
use ioc_crawler::{Error, FileScanner, IocCategory};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

fn scanner(config: Config, categories: &[IocCategory]) -> FileScanner {
    FileScanner::new(Arc::new(config), categories).unwrap()
}

#[tokio::test]
async fn boundary_straddling_address_is_recorded_once() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.txt", b"nothing to see");
    write(dir.path(), "more.txt", b"still nothing");

    let mut content = vec![b' '; 64];
    content[10..21].copy_from_slice(b"192.168.1.1");
    let target = write(dir.path(), "capture.bin", &content);

    let mut config = Config::default();
    config.scan.chunk_size = 20;
    config.scan.overlap = 5;

    let report = scanner(config, &IocCategory::ALL)
        .scan(dir.path())
        .await
        .unwrap();

    let result = report.result_for(&target).unwrap();
    let record = result.record_for(IocCategory::Ip).unwrap();
    assert_eq!(record.offsets("192.168.1.1"), Some(&[10][..]));
    assert_eq!(result.count(IocCategory::Ip), 1);
    assert_eq!(report.summary.category_total(IocCategory::Ip), 1);
}

#[tokio::test]
async fn whitelisted_match_is_counted_and_suppressed() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "fw.log", b"accept from 10.0.0.5 port 443");

    let mut config = Config::default();
    config.whitelist.matches = vec!["10.0.0.".to_string()];

    let report = scanner(config, &IocCategory::ALL)
        .scan(dir.path())
        .await
        .unwrap();

    assert_eq!(report.summary.whitelisted_matches, 1);
    for result in &report.results {
        if let Some(record) = result.record_for(IocCategory::Ip) {
            assert!(record.offsets("10.0.0.5").is_none());
        }
    }
    assert!(report
        .summary
        .labels()
        .contains(&("Whitelisted matches".to_string(), 1)));
}

#[tokio::test]
async fn oversized_match_is_discarded() {
    let dir = TempDir::new().unwrap();
    let target = write(dir.path(), "page.html", b"<a href=\"http://ab.cd\">");

    let mut config = Config::default();
    config.scan.max_match_size = 8;

    let report = scanner(config, &[IocCategory::Url])
        .scan(dir.path())
        .await
        .unwrap();

    assert_eq!(report.summary.oversized_matches, 1);
    let result = report.result_for(&target).unwrap();
    assert!(result.record_for(IocCategory::Url).is_none());
    assert_eq!(result.count(IocCategory::Url), 0);
}

#[tokio::test]
async fn empty_directory_fails_before_scanning() {
    let dir = TempDir::new().unwrap();
    let scanner = scanner(Config::default(), &IocCategory::ALL);

    let err = scanner.scan(dir.path()).await.unwrap_err();
    assert!(matches!(err, Error::EmptyInput));
    assert_eq!(scanner.context().total_files(), 0);
    assert_eq!(scanner.context().files_processed(), 0);
}

#[tokio::test]
async fn every_enumerated_file_is_reported_once() {
    let dir = TempDir::new().unwrap();
    let mut expected = HashSet::new();
    for i in 0..150 {
        let rel = format!("d{}/f{}.txt", i % 7, i);
        let path = write(dir.path(), &rel, format!("host 10.1.{}.{}", i % 200, i % 9).as_bytes());
        expected.insert(path);
    }
    write(dir.path(), "skip/a.txt", b"1.1.1.1");
    write(dir.path(), "skip/deeper/b.txt", b"2.2.2.2");

    let mut config = Config::default();
    config.whitelist.paths = vec!["skip/".to_string()];
    config.scan.workers = 6;

    let report = scanner(config, &IocCategory::ALL)
        .scan(dir.path())
        .await
        .unwrap();

    let seen: Vec<PathBuf> = report.results.iter().map(|r| r.path.clone()).collect();
    let unique: HashSet<PathBuf> = seen.iter().cloned().collect();
    assert_eq!(seen.len(), unique.len());
    assert_eq!(unique, expected);
    assert_eq!(report.summary.whitelisted_files, 2);
    assert_eq!(report.summary.category_total(IocCategory::Ip), 150);

    for result in &report.results {
        for (category, record) in &result.matches {
            assert_eq!(result.count(*category), record.occurrence_count());
        }
    }
}

#[tokio::test]
async fn rescanning_a_file_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut content = Vec::new();
    for i in 0..4000 {
        content.extend_from_slice(
            format!("{i}: HKLM\\Software\\Vendor{} http://h{}.example/p mail{}@x.org\n", i % 3, i % 11, i % 5)
                .as_bytes(),
        );
    }
    let target = write(dir.path(), "big.log", &content);

    let first = scanner(Config::default(), &IocCategory::ALL)
        .scan(&target)
        .await
        .unwrap();
    let second = scanner(Config::default(), &IocCategory::ALL)
        .scan(&target)
        .await
        .unwrap();

    assert_eq!(first.results, second.results);
    assert_eq!(first.summary.category_total(IocCategory::Mail), 4000);
}

#[tokio::test]
async fn cancelled_scan_returns_no_report() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"8.8.8.8");

    let scanner = scanner(Config::default(), &IocCategory::ALL);
    scanner.cancel();

    let err = scanner.scan(dir.path()).await.unwrap_err();
    assert!(err.is_cancelled());
}
