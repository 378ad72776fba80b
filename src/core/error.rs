//! Error types and result handling for the IoC crawler.

use crate::core::types::IocCategory;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for crawler operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Configuration Errors =====
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    #[error("Invalid {category} pattern `{pattern}`")]
    PatternCompile {
        category: IocCategory,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid whitelist entry: {0}")]
    WhitelistInvalid(String),

    // ===== Source Errors =====
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No files to read")]
    EmptyInput,

    // ===== Scanning Errors =====
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan was cancelled")]
    ScanCancelled,

    #[error("Scan worker failed: {0}")]
    WorkerFailed(String),

    // ===== Concurrency Errors =====
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    #[error("Channel send failed: {context}")]
    ChannelSend { context: String },

    // ===== Export Errors =====
    #[error("Failed to export results to: {path}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),

    // ===== Generic Errors =====
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an export error.
    pub fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Export {
            path: path.into(),
            source,
        }
    }

    /// Create a lock poisoned error.
    pub fn lock_poisoned(context: impl Into<String>) -> Self {
        Self::LockPoisoned {
            context: context.into(),
        }
    }

    /// Check if this error is recoverable (the run can continue past it).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::FileRead { .. })
    }

    /// Check if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::ScanCancelled)
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::PathNotFound(_) => Some("Check that the path exists and is accessible"),
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check your configuration file for syntax errors or invalid values")
            }
            Error::PatternCompile { .. } => {
                Some("Pattern definitions must be valid byte regular expressions")
            }
            Error::EmptyInput => Some("The target is empty or every file was whitelisted"),
            Error::LockPoisoned { .. } | Error::WorkerFailed(_) => {
                Some("Internal error: run again with --verbose for details")
            }
            Error::ScanCancelled => Some("Scan was interrupted by user request"),
            _ => None,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ConfigLoad(_)
            | Error::ConfigInvalid { .. }
            | Error::PatternCompile { .. }
            | Error::WhitelistInvalid(_) => ErrorCategory::Configuration,

            Error::PathNotFound(_) | Error::DirectoryAccess { .. } => ErrorCategory::FileAccess,

            Error::EmptyInput => ErrorCategory::EmptyInput,

            Error::FileRead { .. } | Error::Io(_) => ErrorCategory::Io,

            Error::ScanCancelled => ErrorCategory::Cancelled,

            Error::Export { .. } | Error::JsonSerialize(_) => ErrorCategory::Export,

            Error::WorkerFailed(_)
            | Error::LockPoisoned { .. }
            | Error::ChannelSend { .. }
            | Error::Internal(_) => ErrorCategory::Run,
        }
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    FileAccess,
    EmptyInput,
    Io,
    Cancelled,
    Export,
    Run,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "Configuration"),
            ErrorCategory::FileAccess => write!(f, "File Access"),
            ErrorCategory::EmptyInput => write!(f, "Empty Input"),
            ErrorCategory::Io => write!(f, "I/O"),
            ErrorCategory::Cancelled => write!(f, "Cancelled"),
            ErrorCategory::Export => write!(f, "Export"),
            ErrorCategory::Run => write!(f, "Run"),
        }
    }
}
