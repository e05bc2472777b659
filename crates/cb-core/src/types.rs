//! Core type definitions for the content blocker
//!
//! These types are shared by the parser, the rule index and the matcher.

// =============================================================================
// Rule Options (bit flags parsed from the `$options` suffix)
// =============================================================================

bitflags::bitflags! {
    /// Options attached to a network rule.
    ///
    /// Every resource-type option is followed by its exception variant, which
    /// is the same flag shifted left by one. `~script` sets `SCRIPT_EXCEPTION`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleOptions: u32 {
        const THIRD_PARTY = 1 << 0;
        const THIRD_PARTY_EXCEPTION = 1 << 1;
        const STYLESHEET = 1 << 2;
        const STYLESHEET_EXCEPTION = 1 << 3;
        const SCRIPT = 1 << 4;
        const SCRIPT_EXCEPTION = 1 << 5;
        const IMAGE = 1 << 6;
        const IMAGE_EXCEPTION = 1 << 7;
        const OBJECT = 1 << 8;
        const OBJECT_EXCEPTION = 1 << 9;
        const OBJECT_SUBREQUEST = 1 << 10;
        const OBJECT_SUBREQUEST_EXCEPTION = 1 << 11;
        const SUBDOCUMENT = 1 << 12;
        const SUBDOCUMENT_EXCEPTION = 1 << 13;
        const XMLHTTPREQUEST = 1 << 14;
        const XMLHTTPREQUEST_EXCEPTION = 1 << 15;
        /// No exception variant
        const WEBSOCKET = 1 << 16;
        /// No exception variant
        const POPUP = 1 << 17;
        /// Only meaningful on exception rules
        const ELEMENT_HIDE = 1 << 18;
        /// Only meaningful on exception rules
        const GENERIC_HIDE = 1 << 19;

        /// Positive resource-type restrictions
        const TYPE_MASK = Self::STYLESHEET.bits()
            | Self::SCRIPT.bits()
            | Self::IMAGE.bits()
            | Self::OBJECT.bits()
            | Self::OBJECT_SUBREQUEST.bits()
            | Self::SUBDOCUMENT.bits()
            | Self::XMLHTTPREQUEST.bits()
            | Self::WEBSOCKET.bits()
            | Self::POPUP.bits();
        /// Negated resource-type restrictions
        const TYPE_EXCEPTION_MASK = Self::STYLESHEET_EXCEPTION.bits()
            | Self::SCRIPT_EXCEPTION.bits()
            | Self::IMAGE_EXCEPTION.bits()
            | Self::OBJECT_EXCEPTION.bits()
            | Self::OBJECT_SUBREQUEST_EXCEPTION.bits()
            | Self::SUBDOCUMENT_EXCEPTION.bits()
            | Self::XMLHTTPREQUEST_EXCEPTION.bits();
        /// Page-level hiding switches
        const HIDING_MASK = Self::ELEMENT_HIDE.bits() | Self::GENERIC_HIDE.bits();
    }
}

impl RuleOptions {
    /// Look up an option by its filter-list name.
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name {
            "third-party" | "thirdparty" | "3p" => Some(Self::THIRD_PARTY),
            "first-party" | "firstparty" | "1p" => Some(Self::THIRD_PARTY_EXCEPTION),
            "stylesheet" | "css" => Some(Self::STYLESHEET),
            "script" => Some(Self::SCRIPT),
            "image" => Some(Self::IMAGE),
            "object" => Some(Self::OBJECT),
            "object-subrequest" | "object_subrequest" => Some(Self::OBJECT_SUBREQUEST),
            "subdocument" | "frame" => Some(Self::SUBDOCUMENT),
            "xmlhttprequest" | "xhr" => Some(Self::XMLHTTPREQUEST),
            "websocket" => Some(Self::WEBSOCKET),
            "popup" => Some(Self::POPUP),
            "elemhide" | "ehide" => Some(Self::ELEMENT_HIDE),
            "generichide" | "ghide" => Some(Self::GENERIC_HIDE),
            _ => None,
        }
    }

    /// The exception variant of a single option, if it has one.
    #[inline]
    pub fn exception_variant(self) -> Option<Self> {
        if self == Self::THIRD_PARTY || self.intersects(Self::TYPE_MASK) {
            Self::from_bits(self.bits() << 1).filter(|v| {
                *v == Self::THIRD_PARTY_EXCEPTION || v.intersects(Self::TYPE_EXCEPTION_MASK)
            })
        } else {
            None
        }
    }

    /// Rule carries no restriction on resource type.
    #[inline]
    pub fn is_type_agnostic(self) -> bool {
        !self.intersects(Self::TYPE_MASK | Self::TYPE_EXCEPTION_MASK)
    }
}

// =============================================================================
// Match Kind
// =============================================================================

/// Anchoring of a rule pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RuleMatch {
    /// No anchor: the pattern may occur anywhere
    #[default]
    Contains,
    /// `|pattern` or `||pattern`
    StartMatch,
    /// `pattern|`
    EndMatch,
    /// `|pattern|`
    ExactMatch,
}

impl RuleMatch {
    /// Combine a left and a right anchor into a match kind.
    pub fn from_anchors(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => Self::Contains,
            (true, false) => Self::StartMatch,
            (false, true) => Self::EndMatch,
            (true, true) => Self::ExactMatch,
        }
    }

    #[inline]
    pub fn anchors_start(self) -> bool {
        matches!(self, Self::StartMatch | Self::ExactMatch)
    }

    #[inline]
    pub fn anchors_end(self) -> bool {
        matches!(self, Self::EndMatch | Self::ExactMatch)
    }
}

// =============================================================================
// Content Blocking Rule
// =============================================================================

/// A parsed network rule. Immutable once added to an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentBlockingRule {
    /// The line this rule was parsed from
    pub raw: String,
    /// Lower-cased pattern with anchors and options stripped
    pub pattern: String,
    /// Domains the rule is restricted to
    pub blocked_domains: Vec<String>,
    /// Domains the rule never applies on
    pub allowed_domains: Vec<String>,
    pub options: RuleOptions,
    pub match_kind: RuleMatch,
    /// `||` rule: a start anchor refers to a host label boundary
    pub domain_anchored: bool,
    /// `@@` rule
    pub is_exception: bool,
    pub needs_domain_check: bool,
}

impl ContentBlockingRule {
    /// Exception rule that only toggles page-level element hiding.
    #[inline]
    pub fn is_hiding_exception(&self) -> bool {
        self.is_exception && self.options.intersects(RuleOptions::HIDING_MASK)
    }
}

// =============================================================================
// Resource Types
// =============================================================================

/// Resource type of a request, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    #[default]
    Other,
    MainFrame,
    SubFrame,
    Popup,
    StyleSheet,
    Script,
    Image,
    Object,
    ObjectSubRequest,
    XmlHttpRequest,
    WebSocket,
}

impl ResourceType {
    /// Parse from browser request type string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "main_frame" | "document" => Self::MainFrame,
            "sub_frame" | "subdocument" => Self::SubFrame,
            "popup" => Self::Popup,
            "stylesheet" => Self::StyleSheet,
            "script" => Self::Script,
            "image" => Self::Image,
            "object" => Self::Object,
            "object_subrequest" => Self::ObjectSubRequest,
            "xmlhttprequest" | "xhr" => Self::XmlHttpRequest,
            "websocket" => Self::WebSocket,
            _ => Self::Other,
        }
    }

    /// The rule option that restricts a rule to this resource type.
    #[inline]
    pub fn option(self) -> Option<RuleOptions> {
        match self {
            Self::StyleSheet => Some(RuleOptions::STYLESHEET),
            Self::Script => Some(RuleOptions::SCRIPT),
            Self::Image => Some(RuleOptions::IMAGE),
            Self::Object => Some(RuleOptions::OBJECT),
            Self::ObjectSubRequest => Some(RuleOptions::OBJECT_SUBREQUEST),
            Self::SubFrame => Some(RuleOptions::SUBDOCUMENT),
            Self::XmlHttpRequest => Some(RuleOptions::XMLHTTPREQUEST),
            Self::WebSocket => Some(RuleOptions::WEBSOCKET),
            Self::Popup => Some(RuleOptions::POPUP),
            Self::Other | Self::MainFrame => None,
        }
    }
}

// =============================================================================
// Match Result
// =============================================================================

/// Verdict for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchDecision {
    /// An exception rule matched
    Allow,
    /// A block rule matched and no exception did
    Block,
    /// No rule applied; the caller's default applies
    #[default]
    NoMatch,
}

/// Result of matching a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub decision: MatchDecision,
    /// Index of the rule that determined the decision
    pub rule_id: Option<u32>,
}

impl MatchResult {
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.decision == MatchDecision::Block
    }
}

/// Element hiding allowed on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HidingMode {
    /// Generic and domain-specific selectors
    #[default]
    All,
    /// `$generichide`: only domain-specific selectors
    DomainOnly,
    /// `$elemhide`: no element hiding at all
    Disabled,
}
