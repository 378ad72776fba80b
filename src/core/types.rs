//! Core type definitions used throughout the crawler.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Category of indicator of compromise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IocCategory {
    /// IPv4 address
    Ip,
    /// URL with a scheme
    Url,
    /// E-mail address
    Mail,
    /// Windows registry key path
    Reg,
}

impl IocCategory {
    /// Every category, in report order.
    pub const ALL: [IocCategory; 4] = [
        IocCategory::Ip,
        IocCategory::Url,
        IocCategory::Mail,
        IocCategory::Reg,
    ];

    /// Get the short label used in configuration and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            IocCategory::Ip => "ip",
            IocCategory::Url => "url",
            IocCategory::Mail => "mail",
            IocCategory::Reg => "reg",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ip" => Some(IocCategory::Ip),
            "url" => Some(IocCategory::Url),
            "mail" | "email" => Some(IocCategory::Mail),
            "reg" | "registry" => Some(IocCategory::Reg),
            _ => None,
        }
    }
}

impl std::fmt::Display for IocCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A result column for console output and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultColumn {
    /// Absolute path of the scanned file
    Path,
    /// IoC category label
    Ioc,
    /// The matched string
    Match,
    /// Absolute byte offset of the match
    Offset,
}

impl ResultColumn {
    /// All columns in their default order.
    pub const ALL: [ResultColumn; 4] = [
        ResultColumn::Path,
        ResultColumn::Ioc,
        ResultColumn::Match,
        ResultColumn::Offset,
    ];

    /// Column header name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultColumn::Path => "path",
            ResultColumn::Ioc => "ioc",
            ResultColumn::Match => "match",
            ResultColumn::Offset => "offset",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "path" | "file" => Some(ResultColumn::Path),
            "ioc" => Some(ResultColumn::Ioc),
            "match" => Some(ResultColumn::Match),
            "offset" => Some(ResultColumn::Offset),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResultColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single accepted, non-whitelisted match as it is produced by a worker.
#[derive(Debug, Clone, Copy)]
pub struct MatchEvent<'a> {
    pub path: &'a Path,
    pub category: IocCategory,
    pub matched: &'a str,
    pub offset: u64,
}

impl MatchEvent<'_> {
    /// Render one column of this event as text.
    pub fn column(&self, column: ResultColumn) -> String {
        match column {
            ResultColumn::Path => self.path.display().to_string(),
            ResultColumn::Ioc => self.category.to_string(),
            ResultColumn::Match => self.matched.to_string(),
            ResultColumn::Offset => self.offset.to_string(),
        }
    }
}

/// Live per-match callback, invoked synchronously from worker threads.
pub type MatchCallback = Arc<dyn Fn(&MatchEvent<'_>) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for category in IocCategory::ALL {
            assert_eq!(IocCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(IocCategory::parse("EMAIL"), Some(IocCategory::Mail));
        assert_eq!(IocCategory::parse("hash"), None);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&IocCategory::Reg).unwrap();
        assert_eq!(json, "\"reg\"");
        let parsed: IocCategory = serde_json::from_str("\"mail\"").unwrap();
        assert_eq!(parsed, IocCategory::Mail);
    }

    #[test]
    fn test_column_parse() {
        assert_eq!(ResultColumn::parse("file"), Some(ResultColumn::Path));
        assert_eq!(ResultColumn::parse("Offset"), Some(ResultColumn::Offset));
        assert_eq!(ResultColumn::parse("size"), None);
    }

    #[test]
    fn test_match_event_columns() {
        let path = Path::new("/evidence/dump.bin");
        let event = MatchEvent {
            path,
            category: IocCategory::Ip,
            matched: "10.1.2.3",
            offset: 42,
        };
        assert_eq!(event.column(ResultColumn::Path), "/evidence/dump.bin");
        assert_eq!(event.column(ResultColumn::Ioc), "ip");
        assert_eq!(event.column(ResultColumn::Match), "10.1.2.3");
        assert_eq!(event.column(ResultColumn::Offset), "42");
    }
}
