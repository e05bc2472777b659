//! Rule index: a character trie over rule patterns.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Each node owns the
//! ids of its children (one per distinct next character) and the ids of the
//! rules whose pattern ends at that node. `*` and `^` are stored as ordinary
//! characters; the matcher gives them their wildcard/separator meaning.
//!
//! Dropping the index frees every node at once; there are no back references.

use crate::types::ContentBlockingRule;

pub type NodeId = u32;

/// Root of every index.
pub const ROOT: NodeId = 0;

#[derive(Debug, Default, Clone)]
struct Node {
    /// Children keyed by character, in insertion order
    children: Vec<(char, NodeId)>,
    /// Rules whose pattern terminates here
    rules: Vec<u32>,
}

/// Character trie indexing network rules by pattern.
#[derive(Debug, Clone)]
pub struct RuleIndex {
    nodes: Vec<Node>,
    rules: Vec<ContentBlockingRule>,
}

impl Default for RuleIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleIndex {
    /// Create an index holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            rules: Vec::new(),
        }
    }

    /// Register a rule under its pattern and return its id.
    pub fn add_rule(&mut self, rule: ContentBlockingRule) -> u32 {
        let rule_id = self.rules.len() as u32;

        let mut node = ROOT;
        for ch in rule.pattern.chars() {
            node = self.child_or_insert(node, ch);
        }
        self.nodes[node as usize].rules.push(rule_id);
        self.rules.push(rule);

        rule_id
    }

    fn child_or_insert(&mut self, node: NodeId, ch: char) -> NodeId {
        if let Some(child) = self.child(node, ch) {
            return child;
        }

        let child = self.nodes.len() as NodeId;
        self.nodes.push(Node::default());
        self.nodes[node as usize].children.push((ch, child));
        child
    }

    /// Child of `node` reached by `ch`.
    #[inline]
    pub fn child(&self, node: NodeId, ch: char) -> Option<NodeId> {
        self.nodes[node as usize]
            .children
            .iter()
            .find(|(value, _)| *value == ch)
            .map(|&(_, child)| child)
    }

    /// All children of `node` with their characters.
    #[inline]
    pub fn children(&self, node: NodeId) -> &[(char, NodeId)] {
        &self.nodes[node as usize].children
    }

    /// Ids of the rules terminating at `node`.
    #[inline]
    pub fn rules_at(&self, node: NodeId) -> &[u32] {
        &self.nodes[node as usize].rules
    }

    #[inline]
    pub fn rule(&self, rule_id: u32) -> Option<&ContentBlockingRule> {
        self.rules.get(rule_id as usize)
    }

    pub fn rules(&self) -> &[ContentBlockingRule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str) -> ContentBlockingRule {
        ContentBlockingRule {
            raw: pattern.to_string(),
            pattern: pattern.to_string(),
            blocked_domains: Vec::new(),
            allowed_domains: Vec::new(),
            options: Default::default(),
            match_kind: Default::default(),
            domain_anchored: false,
            is_exception: false,
            needs_domain_check: false,
        }
    }

    fn walk(index: &RuleIndex, text: &str) -> Option<NodeId> {
        text.chars().try_fold(ROOT, |node, ch| index.child(node, ch))
    }

    #[test]
    fn shares_common_prefixes() {
        let mut index = RuleIndex::new();
        index.add_rule(rule("ads"));
        index.add_rule(rule("adserver"));
        index.add_rule(rule("track"));

        // root + a,d,s + e,r,v,e,r + t,r,a,c,k
        assert_eq!(index.node_count(), 1 + 3 + 5 + 5);
        assert_eq!(index.rule_count(), 3);

        let ads = walk(&index, "ads").expect("ads node");
        assert_eq!(index.rules_at(ads), &[0]);
        let adserver = walk(&index, "adserver").expect("adserver node");
        assert_eq!(index.rules_at(adserver), &[1]);
        assert!(walk(&index, "adx").is_none());
    }

    #[test]
    fn no_duplicate_children() {
        let mut index = RuleIndex::new();
        index.add_rule(rule("ab"));
        index.add_rule(rule("ac"));
        index.add_rule(rule("ab"));

        assert_eq!(index.children(ROOT).len(), 1);
        let a = index.child(ROOT, 'a').expect("a node");
        assert_eq!(index.children(a).len(), 2);

        let ab = walk(&index, "ab").expect("ab node");
        assert_eq!(index.rules_at(ab), &[0, 2]);
    }

    #[test]
    fn empty_pattern_attaches_to_root() {
        let mut index = RuleIndex::new();
        let id = index.add_rule(rule(""));
        assert_eq!(index.rules_at(ROOT), &[id]);
        assert_eq!(index.rule(id).map(|r| r.raw.as_str()), Some(""));
    }

    #[test]
    fn wildcards_are_plain_nodes() {
        let mut index = RuleIndex::new();
        index.add_rule(rule("ad*banner^"));
        assert!(walk(&index, "ad*banner^").is_some());
        assert!(index.rule(1).is_none());
    }
}
