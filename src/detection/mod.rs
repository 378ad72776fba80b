//! Indicator detection building blocks.
//!
//! This module provides the two read-only structures shared by all scan
//! workers:
//! - Compiled byte patterns grouped by IoC category
//! - Prefix-based whitelisting of matches and paths

pub mod patterns;
pub mod whitelist;

pub use patterns::{CategoryPatterns, PatternSet};
pub use whitelist::{PrefixList, WhitelistIndex};
