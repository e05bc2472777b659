//! Where downloaded filter lists are kept between runs.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::StorageError;

/// Storage of raw filter list text, keyed by profile name.
pub trait RuleStorage: Send + Sync {
    /// Raw bytes of the stored list.
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Replace the stored list.
    fn write(&self, name: &str, text: &str) -> Result<(), StorageError>;

    /// Delete the stored list. Removing a missing list is not an error.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// Lists stored as `<dir>/<name>.txt`.
#[derive(Debug, Clone)]
pub struct FsStorage {
    dir: PathBuf,
}

impl FsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.txt"))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl RuleStorage for FsStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(name);
        std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => io_error(&path, err),
        })
    }

    fn write(&self, name: &str, text: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|err| io_error(&self.dir, err))?;

        // Write next to the target and rename so readers never see half a list
        let path = self.path(name);
        let tmp_path = self.dir.join(format!("{name}.txt.tmp"));
        std::fs::write(&tmp_path, text).map_err(|err| io_error(&tmp_path, err))?;
        std::fs::rename(&tmp_path, &path).map_err(|err| io_error(&path, err))?;

        log::debug!("stored {} bytes in {:?}", text.len(), path);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, err)),
        }
    }
}

/// In-memory storage, for embedders without a writable directory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    lists: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored text for `name`, if any.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lists.lock().get(name).cloned()
    }
}

impl RuleStorage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        self.lists
            .lock()
            .get(name)
            .map(|text| text.as_bytes().to_vec())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn write(&self, name: &str, text: &str) -> Result<(), StorageError> {
        self.lists.lock().insert(name.to_string(), text.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.lists.lock().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().join("lists"));

        assert!(matches!(storage.read("easylist"), Err(StorageError::NotFound(_))));

        storage.write("easylist", "||ads.example.com^\n").unwrap();
        assert!(storage.path("easylist").ends_with("lists/easylist.txt"));
        assert_eq!(storage.read("easylist").unwrap(), b"||ads.example.com^\n");

        storage.write("easylist", "##.ad\n").unwrap();
        assert_eq!(storage.read("easylist").unwrap(), b"##.ad\n");

        storage.remove("easylist").unwrap();
        assert!(!storage.path("easylist").exists());
        storage.remove("easylist").unwrap();
    }

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.write("a", "text").unwrap();
        assert_eq!(storage.get("a").as_deref(), Some("text"));
        storage.remove("a").unwrap();
        assert!(matches!(storage.read("a"), Err(StorageError::NotFound(_))));
    }
}
