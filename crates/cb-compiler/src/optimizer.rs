use std::collections::HashSet;

use cb_core::types::{RuleMatch, RuleOptions};

use crate::parser::{CompiledRule, CosmeticRule};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
    pub badfilter_rules: usize,
    pub badfiltered_rules: usize,
}

/// Apply `$badfilter` and drop duplicate network rules.
///
/// Two rules are duplicates when they differ at most in their raw text
/// (option order, letter case of the pattern). The first occurrence wins.
pub fn optimize_rules(rules: &mut Vec<CompiledRule>) -> OptimizeStats {
    let before = rules.len();
    let mut badfilter_keys: HashSet<RuleKey> = HashSet::new();
    let mut badfilter_rules = 0usize;

    for rule in rules.iter() {
        if rule.is_badfilter {
            badfilter_rules += 1;
            badfilter_keys.insert(RuleKey::from(rule));
        }
    }

    let mut badfiltered_rules = 0usize;
    if !badfilter_keys.is_empty() {
        rules.retain(|rule| {
            if rule.is_badfilter {
                return false;
            }
            if badfilter_keys.contains(&RuleKey::from(rule)) {
                badfiltered_rules += 1;
                return false;
            }
            true
        });
    }

    let mut seen: HashSet<RuleKey> = HashSet::new();
    let mut deduped = 0usize;
    rules.retain(|rule| {
        if seen.insert(RuleKey::from(rule)) {
            true
        } else {
            deduped += 1;
            false
        }
    });

    let after = rules.len();
    log::debug!(
        "optimized {before} -> {after} rules ({deduped} duplicates, {badfiltered_rules} badfiltered)"
    );

    OptimizeStats {
        before,
        after,
        deduped,
        badfilter_rules,
        badfiltered_rules,
    }
}

/// Drop repeated cosmetic rules. Returns how many were removed.
pub fn dedupe_cosmetic(rules: &mut Vec<CosmeticRule>) -> usize {
    let before = rules.len();
    let mut seen: HashSet<CosmeticRule> = HashSet::new();
    rules.retain(|rule| seen.insert(rule.clone()));
    before - rules.len()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    pattern: String,
    blocked_domains: Vec<String>,
    allowed_domains: Vec<String>,
    options: RuleOptions,
    match_kind: RuleMatch,
    domain_anchored: bool,
    is_exception: bool,
}

impl From<&CompiledRule> for RuleKey {
    fn from(compiled: &CompiledRule) -> Self {
        let rule = &compiled.rule;
        let mut blocked_domains = rule.blocked_domains.clone();
        let mut allowed_domains = rule.allowed_domains.clone();
        blocked_domains.sort_unstable();
        allowed_domains.sort_unstable();

        Self {
            pattern: rule.pattern.clone(),
            blocked_domains,
            allowed_domains,
            options: rule.options,
            match_kind: rule.match_kind,
            domain_anchored: rule.domain_anchored,
            is_exception: rule.is_exception,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter_list;

    #[test]
    fn removes_duplicates() {
        let mut list = parse_filter_list(
            "||ads.example.com^$script,third-party\n||ADS.example.com^$third-party,script\n||ads.example.com^\n",
        );
        let stats = optimize_rules(&mut list.rules);
        assert_eq!(stats.before, 3);
        assert_eq!(stats.after, 2);
        assert_eq!(stats.deduped, 1);
        assert_eq!(list.rules[0].rule.raw, "||ads.example.com^$script,third-party");
    }

    #[test]
    fn domain_order_does_not_matter() {
        let mut list = parse_filter_list("/ads.$domain=a.com|b.com\n/ads.$domain=b.com|a.com\n");
        let stats = optimize_rules(&mut list.rules);
        assert_eq!(stats.deduped, 1);
    }

    #[test]
    fn badfilter_cancels_matching_rule() {
        let mut list = parse_filter_list(
            "||ads.example.com^\n||tracker.example.com^\n||ads.example.com^$badfilter\n",
        );
        let stats = optimize_rules(&mut list.rules);
        assert_eq!(stats.badfilter_rules, 1);
        assert_eq!(stats.badfiltered_rules, 1);
        assert_eq!(list.rules.len(), 1);
        assert_eq!(list.rules[0].rule.pattern, "tracker.example.com^");
    }

    #[test]
    fn badfilter_needs_identical_options() {
        let mut list = parse_filter_list("||ads.example.com^$script\n||ads.example.com^$badfilter\n");
        let stats = optimize_rules(&mut list.rules);
        assert_eq!(stats.badfiltered_rules, 0);
        assert_eq!(list.rules.len(), 1);
        assert!(!list.rules[0].is_badfilter);
    }

    #[test]
    fn optimizing_twice_changes_nothing() {
        let mut list = parse_filter_list("||a.com^\n||a.com^\n||b.com^$badfilter\n||b.com^\n/x/y\n");
        optimize_rules(&mut list.rules);
        let once = list.rules.clone();
        let stats = optimize_rules(&mut list.rules);
        assert_eq!(list.rules, once);
        assert_eq!(stats.before, stats.after);
    }

    #[test]
    fn cosmetic_duplicates() {
        let mut list = parse_filter_list("##.ad\n##.ad\nexample.com##.ad\n");
        assert_eq!(dedupe_cosmetic(&mut list.cosmetic), 1);
        assert_eq!(list.cosmetic.len(), 2);
    }
}
