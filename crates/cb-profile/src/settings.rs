//! Persistent profile settings.
//!
//! A profile listing is a JSON array of [`ProfileSettings`]:
//!
//! ```json
//! [
//!   {
//!     "name": "easylist",
//!     "title": "EasyList",
//!     "update_url": "https://easylist.to/easylist/easylist.txt",
//!     "update_interval": 4,
//!     "category": "advertisements",
//!     "languages": ["en"],
//!     "last_update": 1767225600,
//!     "flags": 0
//!   }
//! ]
//! ```

use std::path::Path;
use std::time::{Duration, SystemTime};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// What kind of content a list blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileCategory {
    #[default]
    Other,
    Advertisements,
    Annoyance,
    Privacy,
    Social,
    Regional,
}

impl ProfileCategory {
    /// Numeric value used by listings that store categories as bits.
    pub fn bits(self) -> u32 {
        match self {
            ProfileCategory::Other => 0,
            ProfileCategory::Advertisements => 1,
            ProfileCategory::Annoyance => 2,
            ProfileCategory::Privacy => 4,
            ProfileCategory::Social => 8,
            ProfileCategory::Regional => 16,
        }
    }
}

bitflags! {
    /// Values the user changed by hand; list headers must not overwrite them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProfileFlags: u32 {
        const HAS_CUSTOM_TITLE = 1 << 0;
        const HAS_CUSTOM_UPDATE_URL = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    /// Identifier, also the storage key
    pub name: String,
    pub title: String,
    pub update_url: Option<String>,
    /// Days between updates; 0 disables scheduled updates
    pub update_interval: u32,
    pub category: ProfileCategory,
    pub languages: Vec<String>,
    #[serde(with = "unix_seconds")]
    pub last_update: Option<SystemTime>,
    #[serde(with = "flag_bits")]
    pub flags: ProfileFlags,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            title: String::new(),
            update_url: None,
            update_interval: 4,
            category: ProfileCategory::Other,
            languages: Vec::new(),
            last_update: None,
            flags: ProfileFlags::empty(),
        }
    }
}

impl ProfileSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Title to show, falling back to the name.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }

    /// Whether a scheduled update is due at `now`.
    ///
    /// Lists that were never updated are due as soon as they have an update
    /// URL.
    pub fn is_update_due(&self, now: SystemTime) -> bool {
        if self.update_url.is_none() || self.update_interval == 0 {
            return false;
        }

        let Some(last_update) = self.last_update else {
            return true;
        };

        let interval = Duration::from_secs(u64::from(self.update_interval) * 24 * 60 * 60);
        match now.duration_since(last_update) {
            Ok(elapsed) => elapsed >= interval,
            // Clock went backwards
            Err(_) => false,
        }
    }
}

/// Read a profile listing.
pub fn load_listing(path: &Path) -> Result<Vec<ProfileSettings>, ListingError> {
    let text = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a profile listing.
pub fn save_listing(path: &Path, profiles: &[ProfileSettings]) -> Result<(), ListingError> {
    let text = serde_json::to_string_pretty(profiles)?;
    std::fs::write(path, text).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Error type for reading or writing a profile listing.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid profile listing: {0}")]
    Json(#[from] serde_json::Error),
}

mod unix_seconds {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value.and_then(|time| time.duration_since(UNIX_EPOCH).ok()) {
            Some(since_epoch) => serializer.serialize_some(&since_epoch.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SystemTime>, D::Error> {
        match Option::<u64>::deserialize(deserializer)? {
            Some(seconds) => UNIX_EPOCH
                .checked_add(Duration::from_secs(seconds))
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("last_update {seconds} is out of range"))),
            None => Ok(None),
        }
    }
}

mod flag_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::ProfileFlags;

    pub fn serialize<S: Serializer>(flags: &ProfileFlags, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(flags.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProfileFlags, D::Error> {
        u32::deserialize(deserializer).map(ProfileFlags::from_bits_truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn parses_listing_json() {
        let json = r#"[
            {
                "name": "easylist",
                "title": "EasyList",
                "update_url": "https://easylist.to/easylist/easylist.txt",
                "update_interval": 4,
                "category": "advertisements",
                "languages": ["en"],
                "last_update": 1767225600,
                "flags": 1
            },
            { "name": "local" }
        ]"#;

        let profiles: Vec<ProfileSettings> = serde_json::from_str(json).unwrap();
        assert_eq!(profiles.len(), 2);

        let easylist = &profiles[0];
        assert_eq!(easylist.category, ProfileCategory::Advertisements);
        assert_eq!(easylist.category.bits(), 1);
        assert_eq!(easylist.flags, ProfileFlags::HAS_CUSTOM_TITLE);
        assert_eq!(easylist.last_update, Some(UNIX_EPOCH + Duration::from_secs(1767225600)));

        let local = &profiles[1];
        assert_eq!(local.update_url, None);
        assert_eq!(local.update_interval, 4);
        assert_eq!(local.last_update, None);
        assert_eq!(local.display_title(), "local");
    }

    #[test]
    fn serializes_last_update_as_seconds() {
        let mut settings = ProfileSettings::new("easylist");
        settings.last_update = Some(UNIX_EPOCH + Duration::from_secs(42));
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["last_update"], 42);
        assert_eq!(value["category"], "other");

        let back: ProfileSettings = serde_json::from_value(value).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn update_due() {
        let now = UNIX_EPOCH + 100 * DAY;
        let mut settings = ProfileSettings::new("easylist");
        assert!(!settings.is_update_due(now));

        settings.update_url = Some("https://easylist.to/easylist/easylist.txt".to_string());
        assert!(settings.is_update_due(now));

        settings.last_update = Some(now - 3 * DAY);
        assert!(!settings.is_update_due(now));

        settings.last_update = Some(now - 4 * DAY);
        assert!(settings.is_update_due(now));

        settings.update_interval = 0;
        assert!(!settings.is_update_due(now));
    }

    #[test]
    fn listing_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        let profiles = vec![ProfileSettings::new("a"), ProfileSettings::new("b")];

        save_listing(&path, &profiles).unwrap();
        assert_eq!(load_listing(&path).unwrap(), profiles);

        let missing = load_listing(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ListingError::Storage(StorageError::Io { .. }))));
    }

    #[test]
    fn out_of_range_last_update_is_an_error() {
        let json = r#"{"name":"x","last_update":18446744073709551615}"#;
        assert!(serde_json::from_str::<ProfileSettings>(json).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, format!("[{json}]")).unwrap();
        assert!(matches!(load_listing(&path), Err(ListingError::Json(_))));
    }
}
