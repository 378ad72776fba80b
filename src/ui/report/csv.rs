//! CSV export functionality.
//!
//! Writes one row per recorded offset, restricted to the selected columns.

use crate::core::error::{Error, Result};
use crate::core::types::ResultColumn;
use crate::scanner::results::{FileResult, ScanReport};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CSV exporter for scan results.
pub struct CsvExporter {
    /// Delimiter character
    delimiter: char,
    /// Include header row
    include_header: bool,
    /// Columns to write, in order
    columns: Vec<ResultColumn>,
}

impl CsvExporter {
    /// Create a new CSV exporter with `|` as delimiter and all columns.
    pub fn new() -> Self {
        Self {
            delimiter: '|',
            include_header: true,
            columns: ResultColumn::ALL.to_vec(),
        }
    }

    /// Set the delimiter character.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether to include headers.
    pub fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Select the columns to write.
    pub fn with_columns(mut self, columns: &[ResultColumn]) -> Self {
        if !columns.is_empty() {
            self.columns = columns.to_vec();
        }
        self
    }

    /// Export scan results to a CSV file.
    pub fn export(&self, report: &ScanReport, output_path: &Path) -> Result<()> {
        let file = File::create(output_path).map_err(|e| Error::export(output_path, e))?;
        let mut writer = BufWriter::new(file);

        self.write_to(report, &mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::export(output_path, e))
    }

    /// Write the CSV document to any writer.
    pub fn write_to<W: Write>(&self, report: &ScanReport, out: &mut W) -> std::io::Result<()> {
        if self.include_header {
            let header: Vec<&str> = self.columns.iter().map(ResultColumn::as_str).collect();
            writeln!(out, "{}", header.join(&self.delimiter.to_string()))?;
        }

        for result in &report.results {
            self.write_result(result, out)?;
        }

        Ok(())
    }

    fn write_result<W: Write>(&self, result: &FileResult, out: &mut W) -> std::io::Result<()> {
        let path = result.path.display().to_string();
        let delimiter = self.delimiter.to_string();

        for (category, matched, offset) in result.occurrences() {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|column| match column {
                    ResultColumn::Path => self.escape_csv(&path),
                    ResultColumn::Ioc => category.to_string(),
                    ResultColumn::Match => self.escape_csv(matched),
                    ResultColumn::Offset => offset.to_string(),
                })
                .collect();
            writeln!(out, "{}", row.join(&delimiter))?;
        }

        Ok(())
    }

    /// Escape a CSV field.
    fn escape_csv(&self, field: &str) -> String {
        if field.contains(self.delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IocCategory;
    use crate::scanner::results::ScanSummary;

    fn report() -> ScanReport {
        let mut result = FileResult::new("/case/dump.bin");
        result.record(IocCategory::Ip, "10.1.1.1", 40);
        result.record(IocCategory::Ip, "10.1.1.1", 8);
        result.record(IocCategory::Url, "http://a.io/x|y", 100);
        ScanReport {
            results: vec![result],
            failed: Vec::new(),
            summary: ScanSummary::default(),
        }
    }

    fn render(exporter: &CsvExporter) -> String {
        let mut buf = Vec::new();
        exporter.write_to(&report(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_escape_csv() {
        let exporter = CsvExporter::new();
        assert_eq!(exporter.escape_csv("simple"), "simple");
        assert_eq!(exporter.escape_csv("with|pipe"), "\"with|pipe\"");
        assert_eq!(exporter.escape_csv("with,comma"), "with,comma");
        assert_eq!(exporter.escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(exporter.escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_one_row_per_offset() {
        let text = render(&CsvExporter::new());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "path|ioc|match|offset",
                "/case/dump.bin|ip|10.1.1.1|8",
                "/case/dump.bin|ip|10.1.1.1|40",
                "/case/dump.bin|url|\"http://a.io/x|y\"|100",
            ]
        );
    }

    #[test]
    fn test_selected_columns() {
        let exporter = CsvExporter::new()
            .with_columns(&[ResultColumn::Match, ResultColumn::Offset])
            .with_delimiter(';')
            .with_header(false);
        let text = render(&exporter);
        assert_eq!(text.lines().next(), Some("10.1.1.1;8"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        CsvExporter::new().export(&report(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("path|ioc|match|offset\n"));
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let err = CsvExporter::new()
            .export(&report(), Path::new("/no/such/dir/out.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Export { .. }));
    }
}
