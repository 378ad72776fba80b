//! Configuration management for the IoC crawler.

use crate::core::error::{Error, Result};
use crate::core::types::{IocCategory, ResultColumn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Smallest accepted value for `scan.max_match_size`.
pub const MIN_MATCH_SIZE: usize = 5;

/// Default read chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 32384;

/// Default overlap window in bytes.
pub const DEFAULT_OVERLAP: usize = 1024;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan engine settings
    pub scan: ScanConfig,
    /// Byte patterns per category
    pub patterns: PatternConfig,
    /// Suppression rules
    pub whitelist: WhitelistConfig,
    /// Console and export settings
    pub output: OutputConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration from the default location, falling back to built-in defaults.
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    log::warn!("Failed to load config, using defaults: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ioc-crawler")
            .join("config.json")
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        self.scan.validate()?;
        self.whitelist.validate()?;

        if self.output.result_columns.is_empty() {
            return Err(Error::config_invalid(
                "output.result_columns",
                "At least one column is required",
            ));
        }

        Ok(())
    }
}

/// Scan engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of parallel scan workers
    pub workers: usize,
    /// Upper bound for `workers`
    pub max_workers: usize,
    /// Longest decoded match (in characters) that is kept
    pub max_match_size: usize,
    /// Primary region of each buffered read, in bytes
    pub chunk_size: usize,
    /// Look-behind and look-ahead bytes framing each chunk
    pub overlap: usize,
    /// Whether to follow symbolic links while walking directories
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_workers: 16,
            max_match_size: 512,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            follow_symlinks: false,
        }
    }
}

impl ScanConfig {
    /// Validate the scan engine settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_match_size < MIN_MATCH_SIZE {
            return Err(Error::config_invalid(
                "scan.max_match_size",
                format!("Must be at least {}", MIN_MATCH_SIZE),
            ));
        }

        if self.chunk_size == 0 {
            return Err(Error::config_invalid(
                "scan.chunk_size",
                "Must be greater than 0",
            ));
        }

        if self.overlap >= self.chunk_size {
            return Err(Error::config_invalid(
                "scan.overlap",
                "Must be smaller than scan.chunk_size",
            ));
        }

        if self.workers == 0 || self.max_workers == 0 {
            return Err(Error::config_invalid(
                "scan.workers",
                "Worker counts must be greater than 0",
            ));
        }

        if self.max_match_size > self.overlap {
            log::warn!(
                "scan.max_match_size ({}) exceeds scan.overlap ({}); matches longer than the overlap may be truncated at chunk boundaries",
                self.max_match_size,
                self.overlap
            );
        }

        Ok(())
    }

    /// Worker count clamped to the configured maximum.
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, self.max_workers.max(1))
    }
}

/// Byte pattern definitions, keyed by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternConfig {
    pub definitions: BTreeMap<IocCategory, Vec<String>>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        let mut definitions = BTreeMap::new();
        definitions.insert(
            IocCategory::Ip,
            vec![
                r"(?-u:\b)(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])(?-u:\b)"
                    .to_string(),
            ],
        );
        definitions.insert(
            IocCategory::Url,
            vec![
                r#"(?i-u)(?:https?|ftps?|sftp)://[a-z0-9\-._~%]+(?::[0-9]{1,5})?(?:/[a-z0-9\-._~%!$&'()*+,;=:@/?#]*)?"#
                    .to_string(),
            ],
        );
        definitions.insert(
            IocCategory::Mail,
            vec![r"(?i-u)[a-z0-9._%+\-]+@[a-z0-9\-]+(?:\.[a-z0-9\-]+)*\.[a-z]{2,24}".to_string()],
        );
        definitions.insert(
            IocCategory::Reg,
            vec![
                r"(?i-u)(?:HKEY_LOCAL_MACHINE|HKEY_CURRENT_USER|HKEY_CLASSES_ROOT|HKEY_USERS|HKEY_CURRENT_CONFIG|HKLM|HKCU|HKCR|HKU|HKCC)\\[a-z0-9_\-.{}\\]+(?: [a-z0-9_\-.{}\\]+)*"
                    .to_string(),
            ],
        );
        Self { definitions }
    }
}

/// Whitelist definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Prefixes of match strings that are never reported
    pub matches: Vec<String>,
    /// Prefixes of paths, relative to the scan root, that are never scanned
    pub paths: Vec<String>,
}

impl WhitelistConfig {
    /// Reject entries that would suppress everything.
    pub fn validate(&self) -> Result<()> {
        if self.matches.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::WhitelistInvalid(
                "empty match prefix".to_string(),
            ));
        }
        if self.path_prefixes().any(|p| p.is_empty()) {
            return Err(Error::WhitelistInvalid("empty path prefix".to_string()));
        }
        Ok(())
    }

    /// Path prefixes with forward slashes and no leading `./` or separator.
    pub fn path_prefixes(&self) -> impl Iterator<Item = String> + '_ {
        self.paths.iter().map(|prefix| {
            prefix
                .trim()
                .replace('\\', "/")
                .trim_start_matches("./")
                .trim_start_matches('/')
                .to_string()
        })
    }

    /// Whether any whitelisting is configured.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.paths.is_empty()
    }
}

/// Console and export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Columns printed and exported, in order
    pub result_columns: Vec<ResultColumn>,
    /// Export field delimiter
    pub delimiter: char,
    /// Highlight the match column on the console
    pub match_highlighting: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            result_columns: ResultColumn::ALL.to_vec(),
            delimiter: '|',
            match_highlighting: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Write log output to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}
