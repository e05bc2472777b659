//! Domain helpers: parent walking and suffix-boundary matching.
//!
//! # Examples
//!
//! ```
//! use cb_core::domain::{candidate_domains, is_subdomain_of};
//!
//! assert!(is_subdomain_of("sub.example.com", "example.com"));
//! assert!(!is_subdomain_of("otherexample.com", "example.com"));
//! assert_eq!(
//!     candidate_domains("a.b.example.com"),
//!     vec!["a.b.example.com", "b.example.com", "example.com", "com"]
//! );
//! ```

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a host and its parent domains, most specific first.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result);
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    let host = host.trim_matches('.');
    HostSuffixIter {
        current: (!host.is_empty()).then_some(host),
    }
}

/// The host and all its parent domains, for cosmetic filter lookups.
pub fn candidate_domains(host: &str) -> Vec<&str> {
    walk_host_suffixes(host).collect()
}

/// `host` equals `domain` or is a subdomain of it.
///
/// Matching is on label boundaries: `otherexample.com` is not a subdomain of
/// `example.com`. Both sides are compared ASCII case-insensitively.
#[inline]
pub fn is_subdomain_of(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.');
    let domain = domain.trim_end_matches('.');
    if domain.is_empty() || host.len() < domain.len() {
        return false;
    }

    let split = host.len() - domain.len();
    if !host.is_char_boundary(split) || !host[split..].eq_ignore_ascii_case(domain) {
        return false;
    }
    split == 0 || host.as_bytes()[split - 1] == b'.'
}

/// A request is third-party unless its host is the page host or one of its
/// subdomains. An empty page host (no initiator) counts as first-party.
#[inline]
pub fn is_third_party(base_host: &str, request_host: &str) -> bool {
    !base_host.is_empty() && !is_subdomain_of(request_host, base_host)
}
