//! Logging infrastructure for the crawler binary.

use crate::core::config::LoggingConfig;
use crate::core::error::{Error, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Log file written by a verbose run when none is configured.
pub const VERBOSE_LOG_FILE: &str = "debug.log";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level
    pub level: LevelFilter,
    /// Log file path; console (stderr) when unset
    pub file_path: Option<PathBuf>,
    /// Also write to stderr when a log file is set
    pub console: bool,
    /// Show timestamps
    pub timestamps: bool,
    /// Show module path
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: false,
            timestamps: true,
            module_path: false,
        }
    }
}

impl LogConfig {
    /// Create a log config from the logging section of the configuration.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let level = parse_level(&config.log_level);

        Self {
            level,
            file_path: config.log_file.clone(),
            console: false,
            timestamps: true,
            module_path: level >= LevelFilter::Debug,
        }
    }

    /// Create a verbose log config for CLI: debug output on the console and in
    /// [`VERBOSE_LOG_FILE`].
    pub fn verbose() -> Self {
        Self {
            level: LevelFilter::Debug,
            file_path: Some(PathBuf::from(VERBOSE_LOG_FILE)),
            console: true,
            timestamps: true,
            module_path: true,
        }
    }

    /// Create a quiet log config (errors only).
    pub fn quiet() -> Self {
        Self {
            level: LevelFilter::Error,
            file_path: None,
            console: false,
            timestamps: false,
            module_path: false,
        }
    }

    /// Redirect log output to a file.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

/// Map a level name to a filter, defaulting to `Info`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Initialize the logging system.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let mut builder = Builder::new();

    // Set the log level
    builder.filter_level(config.level);

    let colored = config.file_path.is_none();
    let timestamps = config.timestamps;
    let module_path = config.module_path;

    // Configure log format
    builder.format(move |buf, record| {
        let mut output = String::new();

        // Timestamp
        if timestamps {
            output.push_str(&format!("{} ", Local::now().format("%Y-%m-%d %H:%M:%S")));
        }

        output.push_str(&format!("[{}] ", level_label(record.level(), colored)));

        // Module path
        if module_path {
            if let Some(path) = record.module_path() {
                output.push_str(&format!("{}: ", path));
            }
        }

        // Message
        output.push_str(&format!("{}", record.args()));

        writeln!(buf, "{}", output)
    });

    if let Some(ref path) = config.file_path {
        let file = open_log_file(path)?;
        if config.console {
            builder.target(Target::Pipe(Box::new(Tee {
                file,
                console: io::stderr(),
            })));
        } else {
            builder.target(Target::Pipe(Box::new(file)));
        }
    }

    builder
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logger: {}", e)))?;

    log::debug!("Logging initialized with level: {:?}", config.level);
    Ok(())
}

fn level_label(level: log::Level, colored: bool) -> &'static str {
    match (level, colored) {
        (log::Level::Error, true) => "\x1b[31mERROR\x1b[0m",
        (log::Level::Warn, true) => "\x1b[33mWARN\x1b[0m ",
        (log::Level::Info, true) => "\x1b[32mINFO\x1b[0m ",
        (log::Level::Debug, true) => "\x1b[34mDEBUG\x1b[0m",
        (log::Level::Trace, true) => "\x1b[35mTRACE\x1b[0m",
        (log::Level::Error, false) => "ERROR",
        (log::Level::Warn, false) => "WARN ",
        (log::Level::Info, false) => "INFO ",
        (log::Level::Debug, false) => "DEBUG",
        (log::Level::Trace, false) => "TRACE",
    }
}

/// Writes every record to both the log file and the console.
struct Tee<F: Write, C: Write> {
    file: F,
    console: C,
}

impl<F: Write, C: Write> Write for Tee<F, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.console.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.console.flush()
    }
}

/// Open (and truncate) the log file, creating its directory.
fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::DirectoryAccess {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::Io(format!("Failed to open log file {}: {}", path.display(), e)))
}
