//! Compiled byte patterns grouped by IoC category.
//!
//! Patterns are compiled once, before any file is enumerated, and shared
//! read-only by every scan worker.

use crate::core::config::PatternConfig;
use crate::core::error::{Error, Result};
use crate::core::types::IocCategory;
use regex::bytes::Regex;

/// The compiled patterns of one category.
#[derive(Debug, Clone)]
pub struct CategoryPatterns {
    /// Category the patterns belong to
    pub category: IocCategory,
    /// Compiled byte-level regular expressions
    pub patterns: Vec<Regex>,
}

/// Immutable mapping from category to compiled byte patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    groups: Vec<CategoryPatterns>,
}

impl PatternSet {
    /// Compile the patterns of every selected category.
    ///
    /// Categories that are not selected are left out entirely. Empty pattern
    /// strings are skipped. Any pattern that fails to compile aborts the
    /// whole build.
    pub fn compile(config: &PatternConfig, selected: &[IocCategory]) -> Result<Self> {
        let mut groups = Vec::new();

        for (&category, sources) in &config.definitions {
            if !selected.contains(&category) {
                continue;
            }

            let mut patterns = Vec::with_capacity(sources.len());
            for source in sources.iter().filter(|s| !s.is_empty()) {
                let regex = Regex::new(source).map_err(|e| Error::PatternCompile {
                    category,
                    pattern: source.clone(),
                    source: e,
                })?;
                patterns.push(regex);
            }

            if !patterns.is_empty() {
                log::debug!("Compiled {} pattern(s) for {}", patterns.len(), category);
                groups.push(CategoryPatterns { category, patterns });
            }
        }

        if groups.is_empty() {
            return Err(Error::config_invalid(
                "patterns",
                "No patterns defined for the selected categories",
            ));
        }

        Ok(Self { groups })
    }

    /// Build a set from already compiled patterns.
    pub fn from_groups(groups: Vec<CategoryPatterns>) -> Self {
        Self {
            groups: groups
                .into_iter()
                .filter(|g| !g.patterns.is_empty())
                .collect(),
        }
    }

    /// Iterate over the category groups in category order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryPatterns> {
        self.groups.iter()
    }

    /// Categories present in this set.
    pub fn categories(&self) -> Vec<IocCategory> {
        self.groups.iter().map(|g| g.category).collect()
    }

    /// Total number of compiled patterns.
    pub fn pattern_count(&self) -> usize {
        self.groups.iter().map(|g| g.patterns.len()).sum()
    }

    /// Check if no pattern is present.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
