//! Filter list metadata.
//!
//! Lists start with an optional `[Adblock Plus 2.0]` line followed by
//! `! Key: value` comments. Only the leading comment block is scanned.

use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListHeader {
    /// First non-empty line is `[Adblock ...]`
    pub is_adblock: bool,
    /// Text between the brackets, e.g. `Adblock Plus 2.0`
    pub format: Option<String>,
    pub title: Option<String>,
    pub homepage: Option<String>,
    pub version: Option<String>,
    pub checksum: Option<String>,
    pub expires: Option<Duration>,
}

impl ListHeader {
    /// Update interval in whole days, rounded up.
    pub fn expires_days(&self) -> Option<u32> {
        const DAY: u64 = 24 * 60 * 60;
        self.expires
            .map(|expires| expires.as_secs().div_ceil(DAY).max(1))
            .map(|days| u32::try_from(days).unwrap_or(u32::MAX))
    }
}

/// Parse the header block of a list.
pub fn parse_header(text: &str) -> ListHeader {
    let mut header = ListHeader::default();
    let mut first = true;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if first {
            first = false;
            if let Some(format) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                header.is_adblock = format.to_ascii_lowercase().starts_with("adblock");
                header.format = Some(format.trim().to_string());
                continue;
            }
        }

        let Some(comment) = line.strip_prefix('!') else {
            break;
        };

        let Some((key, value)) = comment.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.trim().to_ascii_lowercase().as_str() {
            "title" => header.title = Some(value.to_string()),
            "homepage" => header.homepage = Some(value.to_string()),
            "version" => header.version = Some(value.to_string()),
            "checksum" => header.checksum = Some(value.to_string()),
            "expires" => header.expires = parse_expires(value),
            _ => {}
        }
    }

    header
}

/// Whether the text can be a filter list at all.
///
/// The first non-empty line has to be an `[Adblock` header or a comment.
pub fn looks_like_filter_list(text: &str) -> bool {
    let Some(first) = text.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return false;
    };

    first.starts_with('!') || first.to_ascii_lowercase().starts_with("[adblock")
}

/// Parse `4 days`, `12 hours`, `1d` and the like.
fn parse_expires(value: &str) -> Option<Duration> {
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let amount: u64 = value[..digits_end].parse().ok()?;
    if amount == 0 {
        return None;
    }

    let unit = value[digits_end..]
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    let seconds = match unit.as_str() {
        "" | "d" | "day" | "days" => amount.checked_mul(24 * 60 * 60)?,
        "h" | "hour" | "hours" => amount.checked_mul(60 * 60)?,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}
