//! Console output: live match lines and the run summary.

use crate::core::types::{MatchCallback, MatchEvent, ResultColumn};
use crate::scanner::results::ScanSummary;
use std::io::Write;
use std::sync::Arc;

const HIGHLIGHT_START: &str = "\x1b[0;30;41m";
const HIGHLIGHT_END: &str = "\x1b[0m";

/// Prints each accepted match on its own line.
#[derive(Debug, Clone)]
pub struct MatchPrinter {
    columns: Vec<ResultColumn>,
    highlight: bool,
}

impl MatchPrinter {
    pub fn new(columns: &[ResultColumn], highlight: bool) -> Self {
        let columns = if columns.is_empty() {
            ResultColumn::ALL.to_vec()
        } else {
            columns.to_vec()
        };
        Self { columns, highlight }
    }

    /// Render the selected columns of a match, separated by spaces.
    pub fn format(&self, event: &MatchEvent<'_>) -> String {
        self.columns
            .iter()
            .map(|&column| {
                let text = event.column(column);
                if column == ResultColumn::Match && self.highlight {
                    format!("{HIGHLIGHT_START}{text}{HIGHLIGHT_END}")
                } else {
                    text
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Write one match line to stdout.
    ///
    /// Workers print concurrently; the stdout lock keeps lines whole.
    pub fn print(&self, event: &MatchEvent<'_>) {
        let line = self.format(event);
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
    }

    /// Turn the printer into a per-match callback.
    pub fn into_callback(self) -> MatchCallback {
        Arc::new(move |event: &MatchEvent<'_>| self.print(event))
    }
}

/// Format the summary block printed after a non-stdout run.
pub fn format_summary(summary: &ScanSummary) -> Vec<String> {
    let mut lines = vec!["[+] Summary of matches".to_string()];
    lines.extend(
        summary
            .labels()
            .into_iter()
            .map(|(label, count)| format!(" |- {}: {}", label, count)),
    );
    if summary.files_failed > 0 {
        lines.push(format!(" |- Unreadable files: {}", summary.files_failed));
    }
    lines
}
