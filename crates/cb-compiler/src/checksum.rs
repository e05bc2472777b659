//! Adblock Plus list checksums.
//!
//! The checksum is the unpadded base64 MD5 of the list with carriage returns
//! deleted, runs of newlines collapsed and every checksum line taken out.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use md5::{Digest, Md5};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumStatus {
    /// List carries no `! Checksum:` line
    Missing,
    Valid,
    Invalid { expected: String, computed: String },
}

impl ChecksumStatus {
    /// Missing checksums are accepted.
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, ChecksumStatus::Invalid { .. })
    }
}

pub fn verify_checksum(text: &str) -> ChecksumStatus {
    let Some(expected) = text.lines().find_map(checksum_value) else {
        return ChecksumStatus::Missing;
    };

    let computed = compute_checksum(text);
    if computed == expected.trim_end_matches('=') {
        ChecksumStatus::Valid
    } else {
        ChecksumStatus::Invalid {
            expected: expected.to_string(),
            computed,
        }
    }
}

pub fn compute_checksum(text: &str) -> String {
    let normalized = normalize(text);
    STANDARD_NO_PAD.encode(Md5::digest(normalized.as_bytes()))
}

fn normalize(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' if collapsed.ends_with('\n') => {}
            c => collapsed.push(c),
        }
    }

    // Drop every newline-terminated checksum line
    collapsed
        .split_inclusive('\n')
        .filter(|line| !(line.ends_with('\n') && checksum_value(line).is_some()))
        .collect()
}

/// Value of a `! Checksum: xyz` line.
fn checksum_value(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('!')?.trim_start();
    let key = rest.get(..8)?;
    if !key.eq_ignore_ascii_case("checksum") {
        return None;
    }

    let rest = &rest[8..];
    let value = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-' || c == ':');
    if value.len() == rest.len() {
        return None;
    }

    let end = value
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '/' | '=')))
        .unwrap_or(value.len());
    let value = &value[..end];

    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest() {
        // MD5("") once the checksum line is removed
        assert_eq!(compute_checksum("! Checksum: whatever\n"), "1B2M2Y8AsgTpgAmY7PhCfg");
        assert_eq!(compute_checksum(""), "1B2M2Y8AsgTpgAmY7PhCfg");
    }

    #[test]
    fn line_endings_do_not_matter() {
        let unix = "[Adblock Plus 2.0]\n! Title: T\n||a.com^\n";
        let dos = "[Adblock Plus 2.0]\r\n! Title: T\r\n\r\n\r\n||a.com^\r\n";
        assert_eq!(compute_checksum(unix), compute_checksum(dos));
    }

    #[test]
    fn lone_carriage_returns_are_deleted() {
        assert_eq!(compute_checksum("a\rb\n"), compute_checksum("ab\n"));
        assert_ne!(compute_checksum("a\rb\n"), compute_checksum("a\nb\n"));
    }

    #[test]
    fn every_checksum_line_is_ignored() {
        let body = "[Adblock Plus 2.0]\n! Title: T\n||a.com^\n";
        let sum = compute_checksum(body);
        let list = format!("[Adblock Plus 2.0]\n! Checksum: {sum}\n! Title: T\n! Checksum: {sum}\n||a.com^\n");
        assert_eq!(compute_checksum(&list), sum);
        assert_eq!(verify_checksum(&list), ChecksumStatus::Valid);
    }

    #[test]
    fn verifies_embedded_checksum() {
        let body = "[Adblock Plus 2.0]\n! Title: T\n||a.com^\n##.ad\n";
        let sum = compute_checksum(body);
        let list = format!("[Adblock Plus 2.0]\n! Checksum: {sum}\n! Title: T\n||a.com^\n##.ad\n");
        assert_eq!(verify_checksum(&list), ChecksumStatus::Valid);

        let tampered = list.replace("||a.com^", "||b.com^");
        assert!(matches!(verify_checksum(&tampered), ChecksumStatus::Invalid { .. }));
        assert!(!verify_checksum(&tampered).is_acceptable());
    }

    #[test]
    fn missing_checksum() {
        let status = verify_checksum("[Adblock Plus 2.0]\n||a.com^\n");
        assert_eq!(status, ChecksumStatus::Missing);
        assert!(status.is_acceptable());
    }

    #[test]
    fn checksum_line_variants() {
        assert_eq!(checksum_value("! Checksum: abc+/="), Some("abc+/="));
        assert_eq!(checksum_value("!checksum-xyz"), Some("xyz"));
        assert_eq!(checksum_value("! CHECKSUM: Q1 trailing"), Some("Q1"));
        assert_eq!(checksum_value("! Checksumabc"), None);
        assert_eq!(checksum_value("! Title: x"), None);
        assert_eq!(checksum_value("||a.com^"), None);
    }
}
