use crate::models::{DOCUMENT_VERSION, Document, is_supported_version};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, error, warn};

pub const STORAGE_KEY: &str = "habit-tracker-data";

/// String key-value store holding whole serialized documents.
///
/// Each call acquires and releases the underlying resource on its own.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        // write then rename so readers never see a half-written file
        let target = self.path_for(key);
        let staging = target.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(staging, target)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn entries(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

pub fn resolve_data_dir() -> PathBuf {
    env::var("APP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Whole-document persistence. Failures never reach the caller: reads fall
/// back to an empty document and writes are logged.
pub struct Storage {
    store: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn file(dir: &Path) -> Self {
        Self::new(FileStore::new(dir))
    }

    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }

    pub fn load(&self) -> Document {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Document {
        let raw = match self.store.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored document, starting empty");
                return Document::empty(now);
            }
            Err(err) => {
                error!("failed to read stored document: {err}");
                return Document::empty(now);
            }
        };

        let mut value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                error!("failed to parse stored document: {err}");
                return Document::empty(now);
            }
        };

        if !is_supported_version(value.get("version")) {
            let version = value.get("version");
            warn!(?version, "stored document has unsupported version, starting empty");
            return Document::empty(now);
        }
        value["version"] = Value::from(DOCUMENT_VERSION);

        match serde_json::from_value(value) {
            Ok(document) => document,
            Err(err) => {
                error!("stored document does not match schema: {err}");
                Document::empty(now)
            }
        }
    }

    pub fn save(&self, document: &Document) {
        self.save_at(document, Utc::now());
    }

    pub fn save_at(&self, document: &Document, now: DateTime<Utc>) {
        let stamped = Document {
            last_modified: now,
            ..document.clone()
        };
        let payload = match serde_json::to_string_pretty(&stamped) {
            Ok(payload) => payload,
            Err(err) => {
                error!("failed to serialize document: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(STORAGE_KEY, &payload) {
            error!("failed to save document: {err}");
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(STORAGE_KEY) {
            error!("failed to clear stored document: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completions::CompletionLog;
    use chrono::{NaiveDate, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, 9, 30, 0).unwrap()
    }

    fn sample() -> Document {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        Document {
            completions: CompletionLog::default().toggle("h1", date),
            ..Document::empty(at(1))
        }
    }

    fn unique_dir() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        env::temp_dir().join(format!("habit_tracker_store_{}_{}", std::process::id(), nanos))
    }

    #[test]
    fn missing_value_loads_empty() {
        let storage = Storage::memory();
        assert_eq!(storage.load_at(at(2)), Document::empty(at(2)));
    }

    #[test]
    fn save_stamps_last_modified() {
        let storage = Storage::memory();
        storage.save_at(&sample(), at(5));
        let loaded = storage.load_at(at(6));
        assert_eq!(loaded.last_modified, at(5));
        assert_eq!(loaded.completions, sample().completions);
    }

    #[test]
    fn wrong_version_loads_empty() {
        let store = MemoryStore::default();
        let mut value = serde_json::to_value(sample()).unwrap();
        value["version"] = serde_json::json!(2);
        store.set(STORAGE_KEY, &value.to_string()).unwrap();
        assert_eq!(Storage::new(store).load_at(at(3)), Document::empty(at(3)));
    }

    #[test]
    fn float_version_loads() {
        let store = MemoryStore::default();
        let mut value = serde_json::to_value(sample()).unwrap();
        value["version"] = serde_json::json!(1.0);
        store.set(STORAGE_KEY, &value.to_string()).unwrap();
        let loaded = Storage::new(store).load_at(at(3));
        assert_eq!(loaded.version, DOCUMENT_VERSION);
        assert_eq!(loaded.completions, sample().completions);
    }

    #[test]
    fn stored_log_is_normalised() {
        let store = MemoryStore::default();
        let mut value = serde_json::to_value(sample()).unwrap();
        value["completions"] = serde_json::json!({
            "2024-04-01": ["h1", "h1"],
            "2024-04-02": []
        });
        store.set(STORAGE_KEY, &value.to_string()).unwrap();
        let loaded = Storage::new(store).load_at(at(3));
        assert_eq!(loaded.completions, sample().completions);
        assert_eq!(loaded.completions.days().count(), 1);
    }

    #[test]
    fn corrupt_value_loads_empty() {
        let store = MemoryStore::default();
        store.set(STORAGE_KEY, "{not json").unwrap();
        assert_eq!(Storage::new(store).load_at(at(3)), Document::empty(at(3)));

        let store = MemoryStore::default();
        store
            .set(STORAGE_KEY, r#"{"version":1,"habits":"nope","completions":{}}"#)
            .unwrap();
        assert_eq!(Storage::new(store).load_at(at(3)), Document::empty(at(3)));
    }

    #[test]
    fn clear_removes_value() {
        let storage = Storage::memory();
        storage.save_at(&sample(), at(5));
        storage.clear();
        assert_eq!(storage.load_at(at(7)), Document::empty(at(7)));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = unique_dir();
        let storage = Storage::file(&dir);
        storage.save_at(&sample(), at(8));
        assert!(FileStore::new(&dir).path_for(STORAGE_KEY).exists());
        assert_eq!(storage.load_at(at(9)).completions, sample().completions);

        storage.clear();
        storage.clear();
        assert_eq!(storage.load_at(at(9)), Document::empty(at(9)));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unwritable_store_is_not_fatal() {
        let blocker = unique_dir();
        fs::write(&blocker, "file in the way").unwrap();
        let storage = Storage::file(&blocker);
        storage.save_at(&sample(), at(8));
        assert_eq!(storage.load_at(at(9)), Document::empty(at(9)));
        let _ = fs::remove_file(blocker);
    }
}
