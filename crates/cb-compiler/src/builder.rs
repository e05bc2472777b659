use std::time::Instant;

use cb_core::FilterIndex;

use crate::header::{parse_header, ListHeader};
use crate::optimizer::{dedupe_cosmetic, optimize_rules, OptimizeStats};
use crate::parser::{parse_filter_list, CompiledRule, CosmeticRule, ParseStats};

/// Result of compiling one filter list.
#[derive(Debug, Clone, Default)]
pub struct CompiledList {
    pub index: FilterIndex,
    pub header: ListHeader,
    pub stats: CompileStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub parse: ParseStats,
    pub optimize: OptimizeStats,
    pub cosmetic_deduped: usize,
}

/// Parse, optimize and index a filter list.
pub fn compile_filter_list(text: &str) -> CompiledList {
    let started = Instant::now();

    let header = parse_header(text);
    let mut parsed = parse_filter_list(text);
    let optimize = optimize_rules(&mut parsed.rules);
    let cosmetic_deduped = dedupe_cosmetic(&mut parsed.cosmetic);

    let index = build_index(parsed.rules, &parsed.cosmetic);

    log::debug!(
        "compiled {} network rules into {} trie nodes, {} cosmetic rules in {:?}",
        index.rules.rule_count(),
        index.rules.node_count(),
        parsed.cosmetic.len(),
        started.elapsed()
    );

    CompiledList {
        index,
        header,
        stats: CompileStats {
            parse: parsed.stats,
            optimize,
            cosmetic_deduped,
        },
    }
}

/// Index parsed rules.
///
/// Badfilter rules that reach this point are skipped; run
/// [`optimize_rules`] first to have them cancel their targets.
pub fn build_index(rules: Vec<CompiledRule>, cosmetic: &[CosmeticRule]) -> FilterIndex {
    let mut index = FilterIndex::new();

    for compiled in rules {
        if !compiled.is_badfilter {
            index.rules.add_rule(compiled.rule);
        }
    }

    for rule in cosmetic {
        add_cosmetic_rule(&mut index, rule);
    }

    index
}

fn add_cosmetic_rule(index: &mut FilterIndex, rule: &CosmeticRule) {
    let store = &mut index.cosmetic;

    if rule.is_exception {
        if rule.domains.is_empty() {
            store.add_generic_exception(&rule.selector);
        }
        for domain in &rule.domains {
            store.add_domain_exception(domain, &rule.selector);
        }
        return;
    }

    if rule.domains.is_empty() {
        store.add_generic(&rule.selector);
    }
    for domain in &rule.domains {
        store.add_domain_rule(domain, &rule.selector);
    }
    // `~domain` entries turn into exceptions for that domain
    for domain in &rule.excluded_domains {
        store.add_domain_exception(domain, &rule.selector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::{candidate_domains, HidingMode, MatchDecision, ResourceType};

    const LIST: &str = "[Adblock Plus 2.0]
! Title: Builder Test
! Expires: 2 days
||ads.example.com^$script
@@||ads.example.com^$script,domain=trusted.com
/banner/ad*
||tracker.net^$third-party
example.com##.ad
example.com,~shop.example.com##.sidebar
~forum.example.org##.promo
##.banner
www.example.com#@#.ad
@@||nohide.example^$elemhide
";

    fn compiled() -> CompiledList {
        compile_filter_list(LIST)
    }

    #[test]
    fn blocks_script_from_ad_host() {
        let list = compiled();
        let result = list
            .index
            .check_url("https://news.site/", "https://ads.example.com/a.js", ResourceType::Script);
        assert_eq!(result.decision, MatchDecision::Block);
        let rule = list.index.rule_for(&result).map(|rule| rule.raw.as_str());
        assert_eq!(rule, Some("||ads.example.com^$script"));
    }

    #[test]
    fn image_from_script_only_host_is_not_blocked() {
        let list = compiled();
        let result = list
            .index
            .check_url("https://news.site/", "https://ads.example.com/a.png", ResourceType::Image);
        assert_eq!(result.decision, MatchDecision::NoMatch);
    }

    #[test]
    fn exception_on_trusted_site() {
        let list = compiled();
        let result = list.index.check_url(
            "https://www.trusted.com/",
            "https://ads.example.com/a.js",
            ResourceType::Script,
        );
        assert_eq!(result.decision, MatchDecision::Allow);
    }

    #[test]
    fn third_party_rule() {
        let list = compiled();
        let foreign = list
            .index
            .check_url("https://site.com/", "https://cdn.tracker.net/t.js", ResourceType::Script);
        assert_eq!(foreign.decision, MatchDecision::Block);

        let own = list
            .index
            .check_url("https://tracker.net/", "https://cdn.tracker.net/t.js", ResourceType::Script);
        assert_eq!(own.decision, MatchDecision::NoMatch);
    }

    #[test]
    fn cosmetic_selectors_by_domain() {
        let list = compiled();

        let news = list.index.get_cosmetic_filters(&candidate_domains("news.example.com"), false);
        assert_eq!(news.domain, vec![".ad", ".sidebar"]);
        assert_eq!(news.generic, vec![".banner", ".promo"]);

        let www = list.index.get_cosmetic_filters(&candidate_domains("www.example.com"), false);
        assert_eq!(www.domain, vec![".sidebar"]);

        let shop = list.index.get_cosmetic_filters(&candidate_domains("shop.example.com"), true);
        assert_eq!(shop.domain, vec![".ad"]);
        assert!(shop.generic.is_empty());

        let forum = list.index.get_cosmetic_filters(&candidate_domains("forum.example.org"), false);
        assert_eq!(forum.generic, vec![".banner"]);
    }

    #[test]
    fn page_hiding_exception() {
        let list = compiled();
        assert_eq!(list.index.check_page_hiding("https://nohide.example/page"), HidingMode::Disabled);
        assert_eq!(list.index.check_page_hiding("https://example.com/"), HidingMode::All);
    }

    #[test]
    fn reports_header_and_stats() {
        let list = compiled();
        assert_eq!(list.header.title.as_deref(), Some("Builder Test"));
        assert_eq!(list.header.expires_days(), Some(2));
        assert_eq!(list.stats.parse.network_rules, 5);
        assert_eq!(list.stats.parse.cosmetic_rules, 5);
        assert_eq!(list.stats.parse.dropped, 0);
        assert_eq!(list.index.rules.rule_count(), 5);
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let first = compiled();
        let second = compiled();
        assert_eq!(first.index.rules.rules(), second.index.rules.rules());
        assert_eq!(first.index.rules.node_count(), second.index.rules.node_count());
    }

    #[test]
    fn empty_list_builds_empty_index() {
        let list = compile_filter_list("[Adblock Plus 2.0]\n! Title: Empty\n");
        assert!(list.index.is_empty());
        assert_eq!(
            list.index
                .check_url("https://a.com/", "https://b.com/x", ResourceType::Other)
                .decision,
            MatchDecision::NoMatch
        );
    }
}
