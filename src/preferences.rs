use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_NAMESPACE: &str = "wc26";
pub const MAX_RATING: u8 = 5;
const STORAGE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage document is malformed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Flat string key/value storage local to this device
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl KeyValueStorage for Box<dyn KeyValueStorage> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-memory storage; nothing outlives the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StorageDocument {
    #[serde(default)]
    version: u32,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Key/value storage kept in a human-readable JSON file.
///
/// Every write goes straight to disk. Without a file path the storage is
/// ephemeral and behaves like [`MemoryStorage`].
#[derive(Debug)]
pub struct FileStorage {
    entries: BTreeMap<String, String>,
    file_path: Option<PathBuf>,
}

impl FileStorage {
    pub fn ephemeral() -> Self {
        Self {
            entries: BTreeMap::new(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: &Path) -> Self {
        Self {
            entries: BTreeMap::new(),
            file_path: Some(file_path.to_path_buf()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                error!("Failed to load preferences from {}: {}", path.display(), e);
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> Result<Self, StorageError> {
        if !file_path.exists() {
            return Ok(Self::with_file(file_path));
        }
        let content = fs::read_to_string(file_path)?;
        let document: StorageDocument = serde_json::from_str(&content)?;
        if document.version > STORAGE_VERSION {
            warn!(
                "Preference file {} has newer version {}, reading anyway",
                file_path.display(),
                document.version
            );
        }
        debug!(
            "Loaded {} preference entries from {}",
            document.entries.len(),
            file_path.display()
        );
        Ok(Self {
            entries: document.entries,
            file_path: Some(file_path.to_path_buf()),
        })
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    fn save(&self) -> Result<(), StorageError> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let document = StorageDocument {
            version: STORAGE_VERSION,
            updated_at: Utc::now(),
            entries: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&document)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

/// Saved/rating state for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreferenceRecord {
    pub saved: bool,
    /// 0 = not rated yet
    pub rating: u8,
}

/// Per-page reader preferences on top of a [`KeyValueStorage`].
///
/// Saved pages live in one list under `<namespace>_saved_guides`; each rating
/// under `<namespace>_rating_<page>`. Reads never fail: anything missing,
/// unreadable or out of range comes back as the default. Writes are
/// best-effort and only logged on failure.
pub struct PreferenceStore<S: KeyValueStorage> {
    storage: S,
    namespace: String,
}

impl<S: KeyValueStorage> PreferenceStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_namespace(storage, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(storage: S, namespace: &str) -> Self {
        Self {
            storage,
            namespace: namespace.to_string(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn saved_key(&self) -> String {
        format!("{}_saved_guides", self.namespace)
    }

    pub fn rating_key(&self, page: &str) -> String {
        format!("{}_rating_{}", self.namespace, page)
    }

    pub fn get_saved(&self, page: &str) -> bool {
        self.saved_pages().iter().any(|saved| saved == page)
    }

    pub fn set_saved(&mut self, page: &str, saved: bool) {
        let mut pages = self.saved_pages();
        let present = pages.iter().any(|p| p == page);
        match (saved, present) {
            (true, false) => pages.push(page.to_string()),
            (false, true) => pages.retain(|p| p != page),
            _ => return,
        }

        let key = self.saved_key();
        let result = serde_json::to_string(&pages)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.set(&key, json));
        match result {
            Ok(()) => debug!("Page {page} saved={saved}"),
            Err(e) => warn!("Failed to persist saved state for {page}: {e}"),
        }
    }

    /// Toggle the saved flag and return the new value
    pub fn toggle_saved(&mut self, page: &str) -> bool {
        let saved = !self.get_saved(page);
        self.set_saved(page, saved);
        saved
    }

    pub fn saved_pages(&self) -> Vec<String> {
        let key = self.saved_key();
        match self.storage.get(&key) {
            Ok(Some(json)) => serde_json::from_str::<Vec<String>>(&json).unwrap_or_else(|e| {
                warn!("Ignoring malformed saved-guides list: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read saved guides: {e}");
                Vec::new()
            }
        }
    }

    pub fn get_rating(&self, page: &str) -> u8 {
        let key = self.rating_key(page);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                warn!("Could not read rating for {page}: {e}");
                return 0;
            }
        };
        match serde_json::from_str::<i64>(raw.trim()) {
            Ok(rating) if (0..=MAX_RATING as i64).contains(&rating) => rating as u8,
            Ok(rating) => {
                warn!("Ignoring out-of-range rating {rating} for {page}");
                0
            }
            Err(e) => {
                warn!("Ignoring malformed rating for {page}: {e}");
                0
            }
        }
    }

    pub fn set_rating(&mut self, page: &str, rating: u8) {
        if !(1..=MAX_RATING).contains(&rating) {
            warn!("Refusing to store rating {rating} for {page}");
            return;
        }
        let key = self.rating_key(page);
        match self.storage.set(&key, rating.to_string()) {
            Ok(()) => debug!("Page {page} rated {rating}"),
            Err(e) => warn!("Failed to persist rating for {page}: {e}"),
        }
    }

    pub fn clear_rating(&mut self, page: &str) {
        let key = self.rating_key(page);
        if let Err(e) = self.storage.remove(&key) {
            warn!("Failed to clear rating for {page}: {e}");
        }
    }

    pub fn record(&self, page: &str) -> PreferenceRecord {
        PreferenceRecord {
            saved: self.get_saved(page),
            rating: self.get_rating(page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Storage that refuses everything
    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&mut self, _key: &str, _value: String) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    #[test]
    fn test_saved_round_trip() {
        let mut store = PreferenceStore::new(MemoryStorage::new());
        assert!(!store.get_saved("/guide/seattle"));

        store.set_saved("/guide/seattle", true);
        assert!(store.get_saved("/guide/seattle"));
        assert!(!store.get_saved("/guide/toronto"));

        store.set_saved("/guide/seattle", false);
        assert!(!store.get_saved("/guide/seattle"));
    }

    #[test]
    fn test_saved_is_a_set() {
        let mut store = PreferenceStore::new(MemoryStorage::new());
        store.set_saved("/guide/a", true);
        store.set_saved("/guide/a", true);
        store.set_saved("/guide/b", true);
        assert_eq!(store.saved_pages(), vec!["/guide/a", "/guide/b"]);

        assert!(!store.toggle_saved("/guide/a"));
        assert_eq!(store.saved_pages(), vec!["/guide/b"]);
    }

    #[test]
    fn test_rating_round_trip_and_default() {
        let mut store = PreferenceStore::new(MemoryStorage::new());
        assert_eq!(store.get_rating("/guide/dallas"), 0);

        store.set_rating("/guide/dallas", 4);
        assert_eq!(store.get_rating("/guide/dallas"), 4);

        store.set_rating("/guide/dallas", 0);
        store.set_rating("/guide/dallas", 6);
        assert_eq!(store.get_rating("/guide/dallas"), 4);

        store.clear_rating("/guide/dallas");
        assert_eq!(store.get_rating("/guide/dallas"), 0);
    }

    #[test]
    fn test_storage_layout() {
        let mut store = PreferenceStore::new(MemoryStorage::new());
        store.set_saved("/guide/seattle", true);
        store.set_rating("/guide/seattle", 5);

        let storage = store.storage();
        assert_eq!(
            storage.get("wc26_saved_guides").unwrap().as_deref(),
            Some(r#"["/guide/seattle"]"#)
        );
        assert_eq!(
            storage.get("wc26_rating_/guide/seattle").unwrap().as_deref(),
            Some("5")
        );
    }

    #[test]
    fn test_malformed_values_read_as_defaults() {
        let mut storage = MemoryStorage::new();
        storage.set("wc26_saved_guides", "{not json".to_string()).unwrap();
        storage.set("wc26_rating_/guide/a", "\"five\"".to_string()).unwrap();
        storage.set("wc26_rating_/guide/b", "42".to_string()).unwrap();
        storage.set("wc26_rating_/guide/c", "-1".to_string()).unwrap();

        let mut store = PreferenceStore::new(storage);
        assert!(!store.get_saved("/guide/a"));
        assert_eq!(store.get_rating("/guide/a"), 0);
        assert_eq!(store.get_rating("/guide/b"), 0);
        assert_eq!(store.get_rating("/guide/c"), 0);

        // A write replaces the corrupt list
        store.set_saved("/guide/a", true);
        assert!(store.get_saved("/guide/a"));
    }

    #[test]
    fn test_unavailable_storage_fails_soft() {
        let mut store = PreferenceStore::new(BrokenStorage);
        store.set_saved("/guide/x", true);
        store.set_rating("/guide/x", 3);
        store.clear_rating("/guide/x");
        assert_eq!(store.record("/guide/x"), PreferenceRecord::default());
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let mut storage = MemoryStorage::new();
        storage.set("other_rating_/guide/a", "2".to_string()).unwrap();
        let store = PreferenceStore::with_namespace(storage, "wc26");
        assert_eq!(store.get_rating("/guide/a"), 0);
    }

    #[test]
    fn test_file_storage_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        {
            let mut store = PreferenceStore::new(FileStorage::load_or_ephemeral(Some(&path)));
            store.set_saved("/guide/seattle", true);
            store.set_rating("/guide/seattle", 4);
        }

        let store = PreferenceStore::new(FileStorage::load_or_ephemeral(Some(&path)));
        assert_eq!(
            store.record("/guide/seattle"),
            PreferenceRecord {
                saved: true,
                rating: 4
            }
        );

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"entries\""));
        assert!(raw.contains("wc26_saved_guides"));
    }

    #[test]
    fn test_corrupted_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "this is not json").unwrap();

        assert!(FileStorage::load_from_file(&path).is_err());
        let storage = FileStorage::load_or_ephemeral(Some(&path));
        assert_eq!(storage.file_path(), Some(path.as_path()));

        let store = PreferenceStore::new(storage);
        assert!(!store.get_saved("/guide/seattle"));
        assert_eq!(store.get_rating("/guide/seattle"), 0);
    }

    #[test]
    fn test_ephemeral_file_storage_writes_nothing() {
        let mut storage = FileStorage::ephemeral();
        storage.set("k", "v".to_string()).unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        assert!(storage.file_path().is_none());
    }
}
