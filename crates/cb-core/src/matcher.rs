//! Core Matching Engine
//!
//! This is the hot path - every request goes through here.
//! The request URL is lower-cased once; everything else works on slices of
//! it and on the immutable rule index.
//!
//! # Algorithm
//!
//! Traversal starts at every character offset of the URL. From each start the
//! trie is descended following the URL characters; `*` children fan out over
//! every remaining position and `^` children consume one separator character
//! (or match the end of the URL). Every rule attached to a node that is
//! reached is checked against the span `start..pos` it matched. A branch ends
//! as soon as no child accepts the next character, so the cost of a start
//! offset is bounded by the longest pattern prefix shared with the URL, not by
//! the number of rules.
//!
//! A `*` child is fanned out at most once per position and start offset: the
//! lowest position each wildcard node was entered from is remembered, and a
//! later fan-out only covers positions below it. Patterns with several
//! wildcards therefore stay linear in the URL length per start offset.

use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::domain::{is_third_party, walk_host_suffixes};
use crate::trie::{NodeId, RuleIndex, ROOT};
use crate::types::{
    ContentBlockingRule, HidingMode, MatchDecision, MatchResult, ResourceType, RuleOptions,
};
use crate::url::{extract_host, get_host_position, is_host_label_start, is_separator_char, strip_fragment};

// =============================================================================
// Matcher
// =============================================================================

/// The core matching engine, a read-only view over a rule index.
#[derive(Clone, Copy)]
pub struct Matcher<'a> {
    index: &'a RuleIndex,
}

/// Per-request state shared by the whole traversal.
struct Request<'r> {
    /// Lower-cased URL without fragment
    url: &'r str,
    host_start: usize,
    host_end: usize,
    base_host: &'r str,
    resource_type: ResourceType,
    third_party: bool,
}

impl<'a> Matcher<'a> {
    /// Create a new matcher over the given index.
    pub fn new(index: &'a RuleIndex) -> Self {
        Self { index }
    }

    /// Match a request issued by the page at `base_url`.
    ///
    /// Any matching exception rule returns `Allow` immediately. Otherwise the
    /// first matching block rule gives `Block`, and no match gives `NoMatch`.
    pub fn check_url(&self, base_url: &str, request_url: &str, resource_type: ResourceType) -> MatchResult {
        if self.index.is_empty() || request_url.is_empty() {
            return MatchResult::default();
        }

        let url = strip_fragment(request_url).to_lowercase();
        let (host_start, host_end) = get_host_position(&url);
        let base_host = extract_host(base_url);
        let request = Request {
            url: &url,
            host_start,
            host_end,
            base_host,
            resource_type,
            third_party: is_third_party(base_host, &url[host_start..host_end]),
        };

        let mut block: Option<u32> = None;
        let outcome = self.walk_all_offsets(&request, &mut |rule_id, rule| {
            if rule.is_hiding_exception() {
                return ControlFlow::Continue(());
            }
            if rule.is_exception {
                return ControlFlow::Break(rule_id);
            }
            block.get_or_insert(rule_id);
            ControlFlow::Continue(())
        });

        if let ControlFlow::Break(rule_id) = outcome {
            return MatchResult {
                decision: MatchDecision::Allow,
                rule_id: Some(rule_id),
            };
        }

        match block {
            Some(rule_id) => MatchResult {
                decision: MatchDecision::Block,
                rule_id: Some(rule_id),
            },
            None => MatchResult::default(),
        }
    }

    /// Which element hiding the page at `page_url` allows.
    ///
    /// Looks for `$elemhide` and `$generichide` exception rules matching the
    /// document URL itself.
    pub fn check_page_hiding(&self, page_url: &str) -> HidingMode {
        if self.index.is_empty() || page_url.is_empty() {
            return HidingMode::All;
        }

        let url = strip_fragment(page_url).to_lowercase();
        let (host_start, host_end) = get_host_position(&url);
        let request = Request {
            url: &url,
            host_start,
            host_end,
            base_host: &url[host_start..host_end],
            resource_type: ResourceType::MainFrame,
            third_party: false,
        };

        let mut mode = HidingMode::All;
        let outcome = self.walk_all_offsets(&request, &mut |rule_id, rule| {
            if !rule.is_hiding_exception() {
                return ControlFlow::Continue(());
            }
            if rule.options.contains(RuleOptions::ELEMENT_HIDE) {
                return ControlFlow::Break(rule_id);
            }
            mode = HidingMode::DomainOnly;
            ControlFlow::Continue(())
        });

        match outcome {
            ControlFlow::Break(_) => HidingMode::Disabled,
            ControlFlow::Continue(()) => mode,
        }
    }

    fn walk_all_offsets<F>(&self, request: &Request<'_>, visit: &mut F) -> ControlFlow<u32>
    where
        F: FnMut(u32, &ContentBlockingRule) -> ControlFlow<u32>,
    {
        let mut fanned = HashMap::new();
        for (start, _) in request.url.char_indices() {
            fanned.clear();
            self.walk(ROOT, start, start, request, &mut fanned, visit)?;
        }
        ControlFlow::Continue(())
    }

    /// Evaluate the rules at `node` for the span `start..pos`, then descend.
    ///
    /// `fanned` maps each wildcard node to the lowest position it has been
    /// fanned out from for the current `start`.
    fn walk<F>(
        &self,
        node: NodeId,
        start: usize,
        pos: usize,
        request: &Request<'_>,
        fanned: &mut HashMap<NodeId, usize>,
        visit: &mut F,
    ) -> ControlFlow<u32>
    where
        F: FnMut(u32, &ContentBlockingRule) -> ControlFlow<u32>,
    {
        // Root rules match everywhere; one evaluation per request is enough
        if node != ROOT || start == 0 {
            for &rule_id in self.index.rules_at(node) {
                let Some(rule) = self.index.rule(rule_id) else {
                    continue;
                };
                if check_rule_match(rule, start, pos, request) {
                    visit(rule_id, rule)?;
                }
            }
        }

        let next = request.url[pos..].chars().next();

        for &(ch, child) in self.index.children(node) {
            match ch {
                '*' => {
                    // Positions from `stop` on were already walked from this node
                    let stop = match fanned.get(&child) {
                        Some(&done) if done <= pos => continue,
                        Some(&done) => done,
                        None => request.url.len() + 1,
                    };
                    fanned.insert(child, pos);

                    let mut p = pos;
                    while p < stop {
                        self.walk(child, start, p, request, fanned, visit)?;
                        match request.url[p..].chars().next() {
                            Some(c) => p += c.len_utf8(),
                            None => break,
                        }
                    }
                }
                '^' => match next {
                    None => self.walk(child, start, pos, request, fanned, visit)?,
                    Some(c) if is_separator_char(c) => {
                        self.walk(child, start, pos + c.len_utf8(), request, fanned, visit)?
                    }
                    Some(_) => {}
                },
                c if Some(c) == next => self.walk(child, start, pos + c.len_utf8(), request, fanned, visit)?,
                _ => {}
            }
        }

        ControlFlow::Continue(())
    }
}

// =============================================================================
// Rule Checks
// =============================================================================

/// Check anchoring, options and domain restrictions of a rule whose pattern
/// matched `request.url[start..end]`.
fn check_rule_match(rule: &ContentBlockingRule, start: usize, end: usize, request: &Request<'_>) -> bool {
    if rule.match_kind.anchors_start() {
        let anchored = if rule.domain_anchored {
            is_host_label_start(request.url, start, request.host_start, request.host_end)
        } else {
            start == 0
        };
        if !anchored {
            return false;
        }
    }

    if rule.match_kind.anchors_end() && end != request.url.len() {
        return false;
    }

    if !check_rule_options(rule.options, request) {
        return false;
    }

    !rule.needs_domain_check || resolve_domain_exceptions(request.base_host, rule)
}

/// Check resource type and party restrictions.
fn check_rule_options(options: RuleOptions, request: &Request<'_>) -> bool {
    if options.contains(RuleOptions::THIRD_PARTY) && !request.third_party {
        return false;
    }
    if options.contains(RuleOptions::THIRD_PARTY_EXCEPTION) && request.third_party {
        return false;
    }

    let included = options & RuleOptions::TYPE_MASK;
    match request.resource_type.option() {
        Some(flag) => {
            if included.is_empty() {
                // Popups are only matched by `$popup` rules
                if flag == RuleOptions::POPUP {
                    return false;
                }
            } else if !included.contains(flag) {
                return false;
            }

            if let Some(exception) = flag.exception_variant() {
                if options.contains(exception) {
                    return false;
                }
            }
            true
        }
        None => included.is_empty(),
    }
}

/// Decide whether a domain-restricted rule applies on `base_host`.
///
/// The host is walked from most to least specific; the first suffix listed in
/// `blocked_domains` (rule applies) or `allowed_domains` (rule does not apply)
/// wins. Without a hit the rule applies only if it has no positive domains.
pub fn resolve_domain_exceptions(base_host: &str, rule: &ContentBlockingRule) -> bool {
    let listed = |list: &[String], domain: &str| list.iter().any(|d| d.eq_ignore_ascii_case(domain));

    for suffix in walk_host_suffixes(base_host) {
        if listed(&rule.blocked_domains, suffix) {
            return true;
        }
        if listed(&rule.allowed_domains, suffix) {
            return false;
        }
    }

    rule.blocked_domains.is_empty()
}
