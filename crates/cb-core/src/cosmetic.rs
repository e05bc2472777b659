//! Cosmetic (element hiding) filter store.
//!
//! Selectors are kept in three places: a flat list of generic selectors
//! (`##.ad`), a domain → selectors map (`example.com##.ad`) and a domain →
//! selectors map of exceptions (`example.com#@#.ad`). Generic exceptions
//! (`#@#.ad`) suppress a selector everywhere.

use std::collections::{HashMap, HashSet};

/// Selectors that apply to a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CosmeticFilters<'a> {
    /// Selectors not scoped to any domain
    pub generic: Vec<&'a str>,
    /// Selectors registered for one of the candidate domains
    pub domain: Vec<&'a str>,
}

impl CosmeticFilters<'_> {
    pub fn is_empty(&self) -> bool {
        self.generic.is_empty() && self.domain.is_empty()
    }

    pub fn len(&self) -> usize {
        self.generic.len() + self.domain.len()
    }
}

/// Domain-keyed index of element hiding selectors.
#[derive(Debug, Clone, Default)]
pub struct CosmeticFilterStore {
    generic: Vec<String>,
    generic_exceptions: HashSet<String>,
    domain_rules: HashMap<String, Vec<String>>,
    domain_exceptions: HashMap<String, Vec<String>>,
}

impl CosmeticFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_generic(&mut self, selector: &str) {
        self.generic.push(selector.to_string());
    }

    pub fn add_generic_exception(&mut self, selector: &str) {
        self.generic_exceptions.insert(selector.to_string());
    }

    pub fn add_domain_rule(&mut self, domain: &str, selector: &str) {
        self.domain_rules
            .entry(domain.to_ascii_lowercase())
            .or_default()
            .push(selector.to_string());
    }

    pub fn add_domain_exception(&mut self, domain: &str, selector: &str) {
        self.domain_exceptions
            .entry(domain.to_ascii_lowercase())
            .or_default()
            .push(selector.to_string());
    }

    /// Collect the selectors for a page.
    ///
    /// `domains` are the page host and its parents (see
    /// [`candidate_domains`](crate::domain::candidate_domains)). A selector
    /// excepted for any of them is dropped from both lists. With
    /// `is_domain_only` generic selectors are omitted. Domains are compared
    /// case-insensitively.
    pub fn get_cosmetic_filters<S: AsRef<str>>(&self, domains: &[S], is_domain_only: bool) -> CosmeticFilters<'_> {
        let domains: Vec<String> = domains.iter().map(|domain| domain.as_ref().to_ascii_lowercase()).collect();

        let mut excepted: HashSet<&str> = self.generic_exceptions.iter().map(String::as_str).collect();
        for domain in &domains {
            if let Some(selectors) = self.domain_exceptions.get(domain) {
                excepted.extend(selectors.iter().map(String::as_str));
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = CosmeticFilters::default();

        for domain in &domains {
            let Some(selectors) = self.domain_rules.get(domain) else {
                continue;
            };
            for selector in selectors {
                if !excepted.contains(selector.as_str()) && seen.insert(selector) {
                    result.domain.push(selector);
                }
            }
        }

        if !is_domain_only {
            for selector in &self.generic {
                if !excepted.contains(selector.as_str()) && seen.insert(selector) {
                    result.generic.push(selector);
                }
            }
        }

        result
    }

    pub fn generic_count(&self) -> usize {
        self.generic.len()
    }

    /// Number of domain-scoped selectors, exceptions included.
    pub fn domain_count(&self) -> usize {
        self.domain_rules.values().map(Vec::len).sum::<usize>()
            + self.domain_exceptions.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.generic.is_empty()
            && self.generic_exceptions.is_empty()
            && self.domain_rules.is_empty()
            && self.domain_exceptions.is_empty()
    }
}
