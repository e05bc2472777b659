use cb_core::types::{ContentBlockingRule, RuleMatch, RuleOptions};

/// A network rule as it leaves the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub rule: ContentBlockingRule,
    /// `$badfilter`: cancels the identical rule without this option
    pub is_badfilter: bool,
}

/// An element hiding rule (`domains##selector` or `domains#@#selector`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CosmeticRule {
    /// Domains the selector is registered for; empty for generic rules
    pub domains: Vec<String>,
    /// `~domain` entries of a non-exception rule
    pub excluded_domains: Vec<String>,
    pub selector: String,
    pub is_exception: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Network(CompiledRule),
    Cosmetic(CosmeticRule),
}

/// Line counts gathered while parsing one list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub comments: usize,
    pub network_rules: usize,
    pub cosmetic_rules: usize,
    /// Lines that looked like rules but could not be parsed
    pub dropped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedList {
    pub rules: Vec<CompiledRule>,
    pub cosmetic: Vec<CosmeticRule>,
    pub stats: ParseStats,
}

/// Parse every line of a filter list. Malformed lines are skipped.
pub fn parse_filter_list(text: &str) -> ParsedList {
    let mut list = ParsedList::default();

    for raw_line in text.lines() {
        list.stats.lines += 1;

        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if is_comment_line(line) {
            list.stats.comments += 1;
            continue;
        }

        match parse_rule_line(line) {
            Some(ParsedLine::Network(rule)) => {
                list.stats.network_rules += 1;
                list.rules.push(rule);
            }
            Some(ParsedLine::Cosmetic(rule)) => {
                list.stats.cosmetic_rules += 1;
                list.cosmetic.push(rule);
            }
            None => {
                log::trace!("dropping filter line {line:?}");
                list.stats.dropped += 1;
            }
        }
    }

    log::debug!(
        "parsed {} lines: {} network, {} cosmetic, {} dropped",
        list.stats.lines,
        list.stats.network_rules,
        list.stats.cosmetic_rules,
        list.stats.dropped
    );

    list
}

/// Parse a single rule line.
///
/// Returns `None` for comments, the `[Adblock ...]` header and anything that
/// is not a supported rule.
pub fn parse_rule_line(line: &str) -> Option<ParsedLine> {
    let line = line.trim();
    if line.is_empty() || is_comment_line(line) {
        return None;
    }

    if let Some(pos) = line.find("#@#") {
        return parse_cosmetic_rule(&line[..pos], &line[pos + 3..], true).map(ParsedLine::Cosmetic);
    }

    if let Some(pos) = line.find("##") {
        return parse_cosmetic_rule(&line[..pos], &line[pos + 2..], false).map(ParsedLine::Cosmetic);
    }

    if is_extended_cosmetic(line) {
        return None;
    }

    parse_network_rule(line).map(ParsedLine::Network)
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[')
}

/// Procedural, scriptlet and CSS-injection syntaxes are not supported.
fn is_extended_cosmetic(line: &str) -> bool {
    ["#?#", "#$#", "#%#", "#@?#", "#@$#", "#@%#"]
        .iter()
        .any(|marker| line.contains(marker))
}

// =============================================================================
// Cosmetic Rules
// =============================================================================

fn parse_cosmetic_rule(domains_text: &str, selector: &str, is_exception: bool) -> Option<CosmeticRule> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }

    let mut domains = Vec::new();
    let mut excluded_domains = Vec::new();

    for raw in domains_text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        match raw.strip_prefix('~') {
            Some(rest) => {
                let domain = normalize_domain(rest)?;
                // A negated domain on an exception has nothing to undo
                if !is_exception {
                    excluded_domains.push(domain);
                }
            }
            None => domains.push(normalize_domain(raw)?),
        }
    }

    if is_exception && domains.is_empty() && !domains_text.trim().is_empty() {
        return None;
    }

    Some(CosmeticRule {
        domains,
        excluded_domains,
        selector: selector.to_string(),
        is_exception,
    })
}

// =============================================================================
// Network Rules
// =============================================================================

fn parse_network_rule(line: &str) -> Option<CompiledRule> {
    let (is_exception, body) = match line.strip_prefix("@@") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, line),
    };

    let (pattern_part, options_text) = split_rule_options(body);
    let options = match options_text {
        Some(options_text) => parse_options(options_text, is_exception)?,
        None => ParsedOptions::default(),
    };

    let parsed = parse_pattern(pattern_part)?;

    if parsed.pattern.is_empty() {
        // An unanchored empty pattern needs options to say what it targets
        if parsed.anchored || (options.options.is_empty() && !options.has_domains()) {
            return None;
        }
    }

    let needs_domain_check = options.has_domains();
    Some(CompiledRule {
        rule: ContentBlockingRule {
            raw: line.to_string(),
            pattern: parsed.pattern,
            blocked_domains: options.blocked_domains,
            allowed_domains: options.allowed_domains,
            options: options.options,
            match_kind: parsed.match_kind,
            domain_anchored: parsed.domain_anchored,
            is_exception,
            needs_domain_check,
        },
        is_badfilter: options.is_badfilter,
    })
}

/// Split off the `$options` suffix at the last `$`.
fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.rfind('$') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

#[derive(Debug, Default)]
struct ParsedOptions {
    options: RuleOptions,
    blocked_domains: Vec<String>,
    allowed_domains: Vec<String>,
    is_badfilter: bool,
}

impl ParsedOptions {
    fn has_domains(&self) -> bool {
        !self.blocked_domains.is_empty() || !self.allowed_domains.is_empty()
    }
}

fn parse_options(text: &str, is_exception: bool) -> Option<ParsedOptions> {
    let mut parsed = ParsedOptions::default();

    for raw in text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        if raw_lower == "badfilter" {
            parsed.is_badfilter = true;
            continue;
        }

        if raw_lower == "match-case" || raw_lower == "match_case" {
            continue;
        }

        if let Some(domain_value) = raw_lower.strip_prefix("domain=") {
            let (blocked, allowed) = parse_domain_option(domain_value)?;
            parsed.blocked_domains.extend(blocked);
            parsed.allowed_domains.extend(allowed);
            continue;
        }

        let (negated, name) = match raw_lower.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw_lower),
        };

        let option = RuleOptions::from_option_name(name)?;

        if option.intersects(RuleOptions::HIDING_MASK) {
            // Hiding switches only make sense as positive options of exceptions
            if !is_exception || negated {
                return None;
            }
            parsed.options |= option;
            continue;
        }

        parsed.options |= if negated { negate_option(option)? } else { option };
    }

    let both_parties = RuleOptions::THIRD_PARTY | RuleOptions::THIRD_PARTY_EXCEPTION;
    if parsed.options.contains(both_parties) {
        return None;
    }

    Some(parsed)
}

fn negate_option(option: RuleOptions) -> Option<RuleOptions> {
    if option == RuleOptions::THIRD_PARTY_EXCEPTION {
        // ~first-party
        return Some(RuleOptions::THIRD_PARTY);
    }
    option.exception_variant()
}

fn parse_domain_option(value: &str) -> Option<(Vec<String>, Vec<String>)> {
    let mut blocked = Vec::new();
    let mut allowed = Vec::new();

    for raw in value.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        match raw.strip_prefix('~') {
            Some(rest) => allowed.push(normalize_domain(rest)?),
            None => blocked.push(normalize_domain(raw)?),
        }
    }

    if blocked.is_empty() && allowed.is_empty() {
        return None;
    }

    Some((blocked, allowed))
}

pub(crate) fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return None;
    }

    Some(trimmed.to_lowercase())
}

// =============================================================================
// Patterns
// =============================================================================

struct ParsedPattern {
    pattern: String,
    match_kind: RuleMatch,
    domain_anchored: bool,
    /// Any anchor survived wildcard trimming
    anchored: bool,
}

fn parse_pattern(text: &str) -> Option<ParsedPattern> {
    let text = text.trim();

    // Regular expression rules
    if text.len() > 1 && text.starts_with('/') && text.ends_with('/') {
        return None;
    }

    let (mut domain_anchored, mut left, rest) = if let Some(rest) = text.strip_prefix("||") {
        (true, false, rest)
    } else if let Some(rest) = text.strip_prefix('|') {
        (false, true, rest)
    } else {
        (false, false, text)
    };

    let (mut right, rest) = match rest.strip_suffix('|') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    // A wildcard next to an anchor cancels it
    if rest.starts_with('*') {
        domain_anchored = false;
        left = false;
    }
    if rest.ends_with('*') {
        right = false;
    }
    let pattern = rest.trim_matches('*');

    if domain_anchored && pattern.is_empty() {
        return None;
    }

    Some(ParsedPattern {
        pattern: pattern.to_lowercase(),
        match_kind: RuleMatch::from_anchors(domain_anchored || left, right),
        domain_anchored,
        anchored: domain_anchored || left || right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(line: &str) -> ContentBlockingRule {
        match parse_rule_line(line) {
            Some(ParsedLine::Network(compiled)) => compiled.rule,
            other => panic!("expected network rule for {line:?}, got {other:?}"),
        }
    }

    fn cosmetic(line: &str) -> CosmeticRule {
        match parse_rule_line(line) {
            Some(ParsedLine::Cosmetic(rule)) => rule,
            other => panic!("expected cosmetic rule for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_domain_anchor_with_options() {
        let rule = network("||ads.example.com^$script,third-party");
        assert_eq!(rule.pattern, "ads.example.com^");
        assert_eq!(rule.match_kind, RuleMatch::StartMatch);
        assert!(rule.domain_anchored);
        assert!(!rule.is_exception);
        assert_eq!(rule.options, RuleOptions::SCRIPT | RuleOptions::THIRD_PARTY);
        assert!(!rule.needs_domain_check);
        assert_eq!(rule.raw, "||ads.example.com^$script,third-party");
    }

    #[test]
    fn parses_exception_with_domains() {
        let rule = network("@@||ads.example.com^$script,domain=trusted.com|~bad.trusted.com");
        assert!(rule.is_exception);
        assert_eq!(rule.blocked_domains, vec!["trusted.com"]);
        assert_eq!(rule.allowed_domains, vec!["bad.trusted.com"]);
        assert!(rule.needs_domain_check);
    }

    #[test]
    fn parses_anchors() {
        assert_eq!(network("|http://ads.").match_kind, RuleMatch::StartMatch);
        assert_eq!(network(".swf|").match_kind, RuleMatch::EndMatch);
        assert_eq!(network("|https://a.com/|").match_kind, RuleMatch::ExactMatch);
        assert_eq!(network("/banner/ad").match_kind, RuleMatch::Contains);

        let exact_host = network("||example.com/|");
        assert_eq!(exact_host.match_kind, RuleMatch::ExactMatch);
        assert!(exact_host.domain_anchored);
    }

    #[test]
    fn trims_wildcards() {
        let rule = network("*/ads/*");
        assert_eq!(rule.pattern, "/ads/");
        assert_eq!(rule.match_kind, RuleMatch::Contains);

        let rule = network("|*ads");
        assert_eq!(rule.match_kind, RuleMatch::Contains);
        assert_eq!(rule.pattern, "ads");
    }

    #[test]
    fn lowercases_pattern() {
        assert_eq!(network("/AdServer/Img").pattern, "/adserver/img");
    }

    #[test]
    fn negated_type_options() {
        let rule = network("/ads/img$~image,~third-party");
        assert_eq!(rule.options, RuleOptions::IMAGE_EXCEPTION | RuleOptions::THIRD_PARTY_EXCEPTION);

        let rule = network("/ads/img$~first-party");
        assert_eq!(rule.options, RuleOptions::THIRD_PARTY);
    }

    #[test]
    fn option_aliases() {
        assert_eq!(network("/x/y$xhr").options, RuleOptions::XMLHTTPREQUEST);
        assert_eq!(network("/x/y$css").options, RuleOptions::STYLESHEET);
        assert_eq!(network("/x/y$3p").options, RuleOptions::THIRD_PARTY);
    }

    #[test]
    fn options_only_rule() {
        let rule = network("$websocket,domain=example.com");
        assert_eq!(rule.pattern, "");
        assert_eq!(rule.options, RuleOptions::WEBSOCKET);
    }

    #[test]
    fn hiding_options_only_on_exceptions() {
        let rule = network("@@||example.com^$elemhide");
        assert!(rule.is_hiding_exception());
        assert!(parse_rule_line("||example.com^$generichide").is_none());
        assert!(parse_rule_line("@@||example.com^$~elemhide").is_none());
    }

    #[test]
    fn drops_malformed_rules() {
        assert!(parse_rule_line("||example.com^$unknown-option").is_none());
        assert!(parse_rule_line("/ads/img$domain=").is_none());
        assert!(parse_rule_line("/ads/img$domain=bad domain.com").is_none());
        assert!(parse_rule_line("/ads/img$third-party,~third-party").is_none());
        assert!(parse_rule_line("/ads/img$~websocket").is_none());
        assert!(parse_rule_line("/banner\\d+/").is_none());
        assert!(parse_rule_line("||").is_none());
        assert!(parse_rule_line("*").is_none());
        assert!(parse_rule_line("|").is_none());
        assert!(parse_rule_line("example.com#$#abort-on-property-read foo").is_none());
        assert!(parse_rule_line("example.com#?#div:has(> .ad)").is_none());
    }

    #[test]
    fn badfilter_flag() {
        match parse_rule_line("||ads.example.com^$badfilter") {
            Some(ParsedLine::Network(compiled)) => {
                assert!(compiled.is_badfilter);
                assert_eq!(compiled.rule.pattern, "ads.example.com^");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_cosmetic_rules() {
        let rule = cosmetic("example.com,~shop.example.com##.ad");
        assert_eq!(rule.domains, vec!["example.com"]);
        assert_eq!(rule.excluded_domains, vec!["shop.example.com"]);
        assert_eq!(rule.selector, ".ad");
        assert!(!rule.is_exception);

        let rule = cosmetic("##.banner");
        assert!(rule.domains.is_empty());

        let rule = cosmetic("Example.com#@#.ad");
        assert!(rule.is_exception);
        assert_eq!(rule.domains, vec!["example.com"]);

        let rule = cosmetic("example.com###sidebar");
        assert_eq!(rule.selector, "#sidebar");

        assert!(parse_rule_line("example.com##").is_none());
        assert!(parse_rule_line("bad domain##.x").is_none());
        assert!(parse_rule_line("~example.com#@#.x").is_none());
    }

    #[test]
    fn parses_whole_list() {
        let text = "[Adblock Plus 2.0]\n! Title: Test\n\n||ads.example.com^\n##.banner\n/ads/$bogus\n@@/ads/ok.js$script\n";
        let list = parse_filter_list(text);
        assert_eq!(list.rules.len(), 2);
        assert_eq!(list.cosmetic.len(), 1);
        assert_eq!(list.stats.lines, 7);
        assert_eq!(list.stats.comments, 2);
        assert_eq!(list.stats.dropped, 1);
    }
}
