//! Error types for profile operations.

use std::fmt;
use std::path::PathBuf;

use cb_compiler::ChecksumStatus;

/// Error state of a profile, as shown to the user.
///
/// Recorded by the lifecycle operations and polled with
/// [`ContentBlockingProfile::error`](crate::ContentBlockingProfile::error);
/// it never interrupts matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProfileError {
    #[default]
    NoError,
    /// Stored list missing, unreadable or not a filter list
    ReadError,
    /// Fetching the update failed
    DownloadError,
    /// Downloaded list did not match its embedded checksum
    ChecksumError,
}

impl ProfileError {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileError::NoError => "no error",
            ProfileError::ReadError => "read error",
            ProfileError::DownloadError => "download error",
            ProfileError::ChecksumError => "checksum error",
        }
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for rule storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Nothing stored under this profile name.
    #[error("no stored rules for profile {0:?}")]
    NotFound(String),

    /// I/O error while accessing the stored list.
    #[error("I/O error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error type for fetching a filter list.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Server answered with a non-success status code.
    #[error("HTTP request failed for {url}: status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Network error during the request.
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Request did not finish in time.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Failed to create the HTTP client.
    #[cfg(feature = "http")]
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Error type for loading or updating a profile.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("list is not valid UTF-8")]
    NotUtf8,

    #[error("content is not a filter list")]
    NotFilterList,

    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    Checksum { expected: String, computed: String },

    /// Compilation task panicked or was cancelled.
    #[error("compile task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl LoadError {
    /// The profile error state this failure is reported as.
    pub fn profile_error(&self) -> ProfileError {
        match self {
            LoadError::Fetch(_) => ProfileError::DownloadError,
            LoadError::Checksum { .. } => ProfileError::ChecksumError,
            LoadError::Storage(_) | LoadError::NotUtf8 | LoadError::NotFilterList | LoadError::Join(_) => {
                ProfileError::ReadError
            }
        }
    }

    pub(crate) fn from_checksum(status: ChecksumStatus) -> Option<Self> {
        match status {
            ChecksumStatus::Invalid { expected, computed } => Some(LoadError::Checksum { expected, computed }),
            ChecksumStatus::Missing | ChecksumStatus::Valid => None,
        }
    }
}
