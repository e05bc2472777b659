//! Fast URL helpers for the hot path
//!
//! These functions avoid allocations and work directly on string slices.
//! They only understand as much of a URL as rule matching needs: scheme end,
//! host span and fragment.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://" (or after ":" for data URLs).
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 || !bytes[..colon_pos].iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')) {
        return None;
    }

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    // Data URLs use ":" not "://"
    if bytes[..colon_pos].eq_ignore_ascii_case(b"data") {
        return Some(colon_pos + 1);
    }

    None
}

// =============================================================================
// Host
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
///
/// Userinfo and port are excluded. URLs without a scheme are treated as
/// starting with the host.
#[inline]
pub fn get_host_position(url: &str) -> (usize, usize) {
    let scheme_end = get_scheme_end(url).unwrap_or(0);
    let bytes = url.as_bytes();

    let mut authority_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'/' || b == b'?' || b == b'#' {
            authority_end = i;
            break;
        }
    }

    let host_start = bytes[scheme_end..authority_end]
        .iter()
        .rposition(|&b| b == b'@')
        .map_or(scheme_end, |at| scheme_end + at + 1);

    let mut host_end = authority_end;
    if bytes.get(host_start) == Some(&b'[') {
        // IPv6 literal: keep the brackets, drop the port
        if let Some(close) = bytes[host_start..authority_end].iter().position(|&b| b == b']') {
            host_end = host_start + close + 1;
        }
    } else if let Some(colon) = bytes[host_start..authority_end].iter().position(|&b| b == b':') {
        host_end = host_start + colon;
    }

    (host_start, host_end)
}

/// Host extraction without allocations. Returns a slice into the URL.
#[inline]
pub fn extract_host(url: &str) -> &str {
    let (start, end) = get_host_position(url);
    url[start..end].trim_end_matches('.')
}

/// Strip the `#fragment`, which never takes part in matching.
#[inline]
pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(pos) => &url[..pos],
        None => url,
    }
}

/// Check whether `pos` starts a label of the host occupying `host_start..host_end`.
#[inline]
pub fn is_host_label_start(url: &str, pos: usize, host_start: usize, host_end: usize) -> bool {
    if pos == host_start {
        return true;
    }
    pos > host_start && pos < host_end && url.as_bytes()[pos - 1] == b'.'
}

// =============================================================================
// ABP Separator
// =============================================================================

/// Check if a character is an ABP separator (what `^` matches).
/// Anything except letters, digits and `_ - . %`.
#[inline]
pub fn is_separator_char(c: char) -> bool {
    !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '%'))
}
