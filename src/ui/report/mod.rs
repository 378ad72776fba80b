//! Report generation for scan results.
//!
//! This module provides export functionality in two formats:
//! - CSV, one row per match offset
//! - JSON export of the full report

pub mod csv;

use crate::core::error::{Error, Result};
use crate::core::types::ResultColumn;
use crate::scanner::results::ScanReport;
use std::path::Path;

pub use csv::CsvExporter;

/// Report format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

/// Generate a report from scan results.
pub fn generate_report(
    report: &ScanReport,
    format: ReportFormat,
    columns: &[ResultColumn],
    delimiter: char,
    output_path: &Path,
) -> Result<()> {
    match format {
        ReportFormat::Csv => CsvExporter::new()
            .with_delimiter(delimiter)
            .with_columns(columns)
            .export(report, output_path),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)?;
            std::fs::write(output_path, json).map_err(|e| Error::export(output_path, e))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IocCategory;
    use crate::scanner::results::{FileResult, ScanSummary};

    #[test]
    fn test_json_report() {
        let mut result = FileResult::new("/x/y.txt");
        result.record(IocCategory::Mail, "a@b.io", 3);
        let mut summary = ScanSummary::default();
        summary.categories.insert(IocCategory::Mail, 1);
        let report = ScanReport {
            results: vec![result],
            failed: Vec::new(),
            summary,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        generate_report(&report, ReportFormat::Json, &ResultColumn::ALL, '|', &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["results"][0]["matches"]["mail"]["a@b.io"][0], 3);
        assert_eq!(value["summary"]["categories"]["mail"], 1);
    }
}
