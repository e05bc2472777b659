//! Content Blocker Core Library
//!
//! This crate provides the matching engine of the content blocker.
//!
//! # Architecture
//!
//! Network rules are indexed in a character trie keyed by their pattern.
//! Matching walks the trie against the request URL from every start offset,
//! so the cost depends on how much of the URL shares a prefix with some rule
//! rather than on the number of rules. Element hiding selectors live in a
//! separate domain-keyed store.
//!
//! Nothing here performs I/O; parsing lives in `cb-compiler` and the
//! load/update lifecycle in `cb-profile`.
//!
//! # Modules
//!
//! - `types`: rule, option and verdict types
//! - `url`: allocation-free URL slicing
//! - `domain`: parent-domain walking and suffix matching
//! - `trie`: the rule index
//! - `matcher`: request matching
//! - `cosmetic`: element hiding selectors
//! - `index`: the compiled form of one filter list

pub mod cosmetic;
pub mod domain;
pub mod index;
pub mod matcher;
pub mod trie;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use cosmetic::{CosmeticFilterStore, CosmeticFilters};
pub use domain::candidate_domains;
pub use index::FilterIndex;
pub use matcher::Matcher;
pub use trie::RuleIndex;
pub use types::{
    ContentBlockingRule, HidingMode, MatchDecision, MatchResult, ResourceType, RuleMatch, RuleOptions,
};
