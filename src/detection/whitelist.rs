//! Whitelist handling for known-good matches and paths.
//!
//! Whitelisting is prefix based: a candidate is suppressed when it starts
//! with any stored prefix. Exact-set membership is never used.

use crate::core::config::WhitelistConfig;
use crate::core::error::Result;
use std::path::{Component, Path};

/// Sorted list of prefixes with "any prefix matches" lookup.
#[derive(Debug, Clone, Default)]
pub struct PrefixList {
    prefixes: Vec<String>,
}

impl PrefixList {
    /// Build a list from raw prefixes.
    ///
    /// Duplicates and prefixes already covered by a shorter entry are dropped;
    /// neither changes the result of [`PrefixList::prefix_match`].
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        sorted.sort();
        sorted.dedup();

        let mut kept: Vec<String> = Vec::with_capacity(sorted.len());
        for prefix in sorted {
            // In sorted order a covering prefix always precedes what it covers.
            if kept.last().is_some_and(|last| prefix.starts_with(last.as_str())) {
                continue;
            }
            kept.push(prefix);
        }

        Self { prefixes: kept }
    }

    /// True iff `candidate` starts with any stored prefix.
    pub fn prefix_match(&self, candidate: &str) -> bool {
        // The only prefix that can match is the greatest one <= candidate.
        let idx = self
            .prefixes
            .partition_point(|p| p.as_str() <= candidate);
        idx > 0 && candidate.starts_with(self.prefixes[idx - 1].as_str())
    }

    /// Number of effective prefixes.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Immutable suppression rules for match strings and relative file paths.
#[derive(Debug, Clone, Default)]
pub struct WhitelistIndex {
    matches: PrefixList,
    paths: PrefixList,
}

impl WhitelistIndex {
    /// Build the index from configuration.
    pub fn from_config(config: &WhitelistConfig) -> Result<Self> {
        config.validate()?;

        let index = Self {
            matches: PrefixList::new(config.matches.iter().map(|p| p.trim())),
            paths: PrefixList::new(config.path_prefixes()),
        };

        log::debug!(
            "Whitelist loaded: {} match prefix(es), {} path prefix(es)",
            index.matches.len(),
            index.paths.len()
        );

        Ok(index)
    }

    /// An index that suppresses nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if a match string is whitelisted.
    pub fn is_match_whitelisted(&self, candidate: &str) -> bool {
        self.matches.prefix_match(candidate)
    }

    /// Check if a path relative to the scan root is whitelisted.
    pub fn is_path_whitelisted(&self, relative: &Path) -> bool {
        !self.paths.is_empty() && self.paths.prefix_match(&relative_key(relative))
    }

    /// Whether any path rules exist.
    pub fn has_path_rules(&self) -> bool {
        !self.paths.is_empty()
    }

    /// Check if nothing is whitelisted.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.paths.is_empty()
    }
}

/// Render a relative path as a forward-slash key.
fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;

    #[test]
    fn test_prefix_match() {
        let list = PrefixList::new(["10.0.0.", "192.168.", "http://localhost"]);

        assert!(list.prefix_match("10.0.0.5"));
        assert!(list.prefix_match("192.168.1.1"));
        assert!(list.prefix_match("http://localhost:8080/"));
        assert!(!list.prefix_match("10.0.1.5"));
        assert!(!list.prefix_match("8.8.8.8"));
        // Prefix, not equality: a shorter candidate never matches.
        assert!(!list.prefix_match("10.0.0"));
    }

    #[test]
    fn test_prefix_list_collapses_covered_entries() {
        let list = PrefixList::new(["10.0.", "10.0.0.", "10.0.", "172.16."]);
        assert_eq!(list.len(), 2);
        assert!(list.prefix_match("10.0.0.1"));
        assert!(list.prefix_match("10.0.200.1"));
        assert!(list.prefix_match("172.16.0.1"));
    }

    #[test]
    fn test_prefix_match_agrees_with_linear_scan() {
        let raw = ["a", "ab", "abd", "b.c", "bz", "c", "mail@", "x.y.z"];
        let list = PrefixList::new(raw);
        let candidates = [
            "", "a", "abc", "abd", "b", "b.c.d", "b.d", "bz9", "c", "mail@x", "mai", "x.y", "x.y.z.w",
        ];
        for candidate in candidates {
            let expected = raw.iter().any(|p| candidate.starts_with(p));
            assert_eq!(list.prefix_match(candidate), expected, "candidate {candidate:?}");
        }
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let list = PrefixList::default();
        assert!(!list.prefix_match(""));
        assert!(!list.prefix_match("anything"));
    }

    #[test]
    fn test_index_from_config() {
        let config = WhitelistConfig {
            matches: vec!["10.0.0.".to_string(), " www.microsoft.com ".to_string()],
            paths: vec!["/cache/".to_string(), "logs\\old".to_string()],
        };
        let index = WhitelistIndex::from_config(&config).unwrap();

        assert!(index.is_match_whitelisted("10.0.0.5"));
        assert!(index.is_match_whitelisted("www.microsoft.com/update"));
        assert!(!index.is_match_whitelisted("10.0.1.5"));

        assert!(index.is_path_whitelisted(Path::new("cache/a/b.bin")));
        assert!(index.is_path_whitelisted(Path::new("logs/old-2021.txt")));
        assert!(!index.is_path_whitelisted(Path::new("data/cache/b.bin")));
    }

    #[test]
    fn test_index_rejects_empty_prefix() {
        let config = WhitelistConfig {
            matches: vec![String::new()],
            paths: Vec::new(),
        };
        assert!(WhitelistIndex::from_config(&config).is_err());
    }

    #[test]
    fn test_index_rejects_path_prefix_that_normalizes_to_nothing() {
        for prefix in ["./", "\\", " / "] {
            let config = WhitelistConfig {
                matches: Vec::new(),
                paths: vec![prefix.to_string()],
            };
            assert!(
                matches!(
                    WhitelistIndex::from_config(&config),
                    Err(Error::WhitelistInvalid(_))
                ),
                "prefix {prefix:?}"
            );
        }
    }

    #[test]
    fn test_empty_index() {
        let index = WhitelistIndex::empty();
        assert!(index.is_empty());
        assert!(!index.has_path_rules());
        assert!(!index.is_match_whitelisted("10.0.0.1"));
        assert!(!index.is_path_whitelisted(Path::new("a/b")));
    }
}
