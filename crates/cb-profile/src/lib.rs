//! Content Blocking Profiles
//!
//! A profile is one filter list together with its settings (title, update
//! URL, interval, category) and its compiled rule index. This crate handles
//! loading the list from storage, downloading updates, verifying checksums
//! and publishing the rebuilt index.
//!
//! Storage and transport are behind the [`RuleStorage`] and [`RuleFetcher`]
//! traits. [`FsStorage`] keeps lists in a directory; [`HttpFetcher`] (feature
//! `http`, on by default) downloads them with `reqwest`.

pub mod error;
pub mod fetch;
pub mod profile;
pub mod settings;
pub mod storage;

pub use error::{FetchError, LoadError, ProfileError, StorageError};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::RuleFetcher;
pub use profile::{ContentBlockingProfile, CosmeticSelectors, ProfileEvent};
pub use settings::{load_listing, save_listing, ListingError, ProfileCategory, ProfileFlags, ProfileSettings};
pub use storage::{FsStorage, MemoryStorage, RuleStorage};
