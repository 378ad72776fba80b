//! Command-line interface definition.

use crate::core::error::{Error, Result};
use crate::core::types::{IocCategory, ResultColumn};
use clap::Parser;
use std::path::PathBuf;

/// IoC crawler for files, directories or mount points
#[derive(Parser, Debug)]
#[command(name = "ioc-crawler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File, directory or mount point
    #[arg(short = 'f', value_name = "FILE_OR_DIR")]
    pub target: PathBuf,

    /// Output mode: print matches live, or write them to a file
    #[arg(long, value_enum, default_value = "stdout")]
    pub mode: OutputMode,

    /// Printed or exported columns
    #[arg(long, value_enum, num_args = 1.., default_value = "all")]
    pub format: Vec<ColumnArg>,

    /// Report matches of specific section(s) only
    #[arg(long, value_enum, num_args = 1.., default_value = "all")]
    pub sections: Vec<SectionArg>,

    /// Output file name (also honoured in stdout mode, written as CSV)
    #[arg(short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Worker count (bounded by the configured maximum)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// No match highlighting
    #[arg(short = 'n')]
    pub no_highlight: bool,

    /// Show debug messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Show run time
    #[arg(long)]
    pub time: bool,

    /// Use a specific configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Output mode for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Print every match as it is found
    Stdout,
    /// Write a `|`-delimited CSV file
    Csv,
    /// Write the full report as JSON
    Json,
}

/// A `--format` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColumnArg {
    #[value(alias = "file")]
    Path,
    Ioc,
    Match,
    Offset,
    All,
}

/// A `--sections` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SectionArg {
    Ip,
    Url,
    Mail,
    Reg,
    All,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check option combinations clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.mode != OutputMode::Stdout && self.output.is_none() {
            return Err(Error::config_invalid(
                "output",
                format!("{:?} mode requires an output file name (-o)", self.mode),
            ));
        }
        if self.threads == Some(0) {
            return Err(Error::config_invalid("threads", "must be at least 1"));
        }
        Ok(())
    }

    /// Selected result columns; `None` keeps the configured default.
    pub fn columns(&self) -> Option<Vec<ResultColumn>> {
        if self.format.is_empty() || self.format.contains(&ColumnArg::All) {
            return None;
        }

        let mut columns = Vec::new();
        for arg in &self.format {
            let column = match arg {
                ColumnArg::Path => ResultColumn::Path,
                ColumnArg::Ioc => ResultColumn::Ioc,
                ColumnArg::Match => ResultColumn::Match,
                ColumnArg::Offset => ResultColumn::Offset,
                ColumnArg::All => continue,
            };
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        Some(columns)
    }

    /// Selected categories.
    pub fn categories(&self) -> Vec<IocCategory> {
        if self.sections.is_empty() || self.sections.contains(&SectionArg::All) {
            return IocCategory::ALL.to_vec();
        }

        let mut categories = Vec::new();
        for arg in &self.sections {
            let category = match arg {
                SectionArg::Ip => IocCategory::Ip,
                SectionArg::Url => IocCategory::Url,
                SectionArg::Mail => IocCategory::Mail,
                SectionArg::Reg => IocCategory::Reg,
                SectionArg::All => continue,
            };
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }
}
