//! Key-value store for session state
//!
//! The auth session manager persists the token through the [`ConfigStore`]
//! trait. Two implementations are provided:
//!
//! - [`JsonFileStore`]: a flat JSON object on disk (`session.json` in the
//!   data directory), written atomically (temp file, then rename)
//! - [`MemoryStore`]: in-process map, used by tests and embedders

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::StoreError;

/// Host-provided persistent key-value storage
pub trait ConfigStore: Send + Sync {
    /// Read the given keys; absent keys are omitted from the result
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StoreError>;

    /// Insert or replace every entry in `entries`
    fn set(&self, entries: HashMap<String, String>) -> Result<(), StoreError>;

    /// Remove the given keys; missing keys are ignored
    fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for Arc<S> {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StoreError> {
        (**self).get(keys)
    }

    fn set(&self, entries: HashMap<String, String>) -> Result<(), StoreError> {
        (**self).set(entries)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        (**self).remove(keys)
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StoreError> {
        let entries = self.lock();
        Ok(keys
            .iter()
            .filter_map(|&k| entries.get(k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, entries: HashMap<String, String>) -> Result<(), StoreError> {
        self.lock().extend(entries);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.lock();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// JSON-file-backed store
///
/// Each call reads the file, so separate processes see each other's writes.
/// Writes within one process are serialized by an internal lock.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let json =
            fs::read_to_string(&self.path).map_err(|e| StoreError::read(self.path.clone(), e))?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&json).map_err(|e| StoreError::InvalidFormat {
            path: self.path.clone(),
            details: e.to_string(),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entries).map_err(|e| StoreError::InvalidFormat {
            path: self.path.clone(),
            details: e.to_string(),
        })?;
        atomic_write(&self.path, &json).map_err(|e| StoreError::write(self.path.clone(), e))?;
        debug!("Saved {} session entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        if apply(&mut entries) {
            self.save(&entries)?;
        }
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StoreError> {
        let mut entries = self.load()?;
        Ok(keys
            .iter()
            .filter_map(|&k| entries.remove(k).map(|v| (k.to_string(), v)))
            .collect())
    }

    fn set(&self, new_entries: HashMap<String, String>) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.extend(new_entries);
            true
        })
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        // Nothing is written when none of the keys exist
        self.update(|entries| {
            let mut changed = false;
            for key in keys {
                changed |= entries.remove(*key).is_some();
            }
            changed
        })
    }
}

/// Write data to a file atomically
///
/// The file holds the auth token, so on unix it is readable by the owner only.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Create temp file in the same directory (for atomic rename)
    let temp_path = path.with_extension("tmp");
    let mut file = create_private(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}

/// Create (or truncate) a file with owner-only permissions on unix
pub(crate) fn create_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;

    // `mode` only applies to new files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set(entries(&[("a", "1"), ("b", "2")])).unwrap();

        let values = store.get(&["a", "missing"]).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["a"], "1");

        store.remove(&["a", "missing"]).unwrap();
        assert!(store.get(&["a"]).unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("session.json"));

        assert!(store.get(&["auth_token"]).unwrap().is_empty());
        // Removing from a missing file does not create it
        store.remove(&["auth_token"]).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.json");

        let store = JsonFileStore::new(&path);
        store.set(entries(&[("auth_token", "T"), ("other", "x")])).unwrap();
        assert!(path.exists());

        let reopened = JsonFileStore::new(&path);
        let values = reopened.get(&["auth_token", "other"]).unwrap();
        assert_eq!(values["auth_token"], "T");
        assert_eq!(values["other"], "x");

        reopened.remove(&["auth_token"]).unwrap();
        let values = store.get(&["auth_token", "other"]).unwrap();
        assert!(!values.contains_key("auth_token"));
        assert_eq!(values["other"], "x");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = JsonFileStore::new(&path);
        store.set(entries(&[("auth_token", "T")])).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.get(&["auth_token"]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidFormat { .. }));
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");

        atomic_write(&path, b"{}").unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }
}
