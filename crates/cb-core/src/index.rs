//! The compiled, immutable form of one filter list.

use crate::cosmetic::{CosmeticFilterStore, CosmeticFilters};
use crate::matcher::Matcher;
use crate::trie::RuleIndex;
use crate::types::{ContentBlockingRule, HidingMode, MatchResult, ResourceType};

/// Network rule trie plus cosmetic store.
///
/// Built once, then only read. Profiles publish it behind an `Arc` and
/// replace it wholesale on reload.
#[derive(Debug, Clone, Default)]
pub struct FilterIndex {
    pub rules: RuleIndex,
    pub cosmetic: CosmeticFilterStore,
}

impl FilterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matcher(&self) -> Matcher<'_> {
        Matcher::new(&self.rules)
    }

    pub fn check_url(&self, base_url: &str, request_url: &str, resource_type: ResourceType) -> MatchResult {
        self.matcher().check_url(base_url, request_url, resource_type)
    }

    pub fn check_page_hiding(&self, page_url: &str) -> HidingMode {
        self.matcher().check_page_hiding(page_url)
    }

    pub fn get_cosmetic_filters<S: AsRef<str>>(&self, domains: &[S], is_domain_only: bool) -> CosmeticFilters<'_> {
        self.cosmetic.get_cosmetic_filters(domains, is_domain_only)
    }

    /// The rule a [`MatchResult`] refers to.
    pub fn rule_for(&self, result: &MatchResult) -> Option<&ContentBlockingRule> {
        result.rule_id.and_then(|id| self.rules.rule(id))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.cosmetic.is_empty()
    }
}
