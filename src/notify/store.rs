use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("record store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable marker set recording which (booking, event) pairs already fired.
/// Writes are idempotent, so concurrent pollers observing the same transition
/// need nothing beyond an atomic set.
pub trait NotificationRecordStore: Send + Sync {
    fn contains(&self, key: &str) -> bool;
    fn mark(&self, key: &str) -> Result<(), StoreError>;
}

pub fn record_key(booking_id: &str, event_key: &str) -> String {
    format!("{booking_id}:{event_key}")
}

/// In-memory store for tests and keyless local runs. Not durable.
#[derive(Default)]
pub struct MemoryRecordStore {
    keys: DashMap<String, ()>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationRecordStore for MemoryRecordStore {
    fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    fn mark(&self, key: &str) -> Result<(), StoreError> {
        self.keys.insert(key.to_string(), ());
        Ok(())
    }
}

/// JSON-file-backed store that survives restarts. The full key set is small
/// (a handful of events per booking) and rewritten on each new mark.
pub struct FileRecordStore {
    path: PathBuf,
    keys: Mutex<HashSet<String>>,
}

impl FileRecordStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let keys = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<HashSet<String>>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            keys: Mutex::new(keys),
        })
    }

    /// Writes a sibling temp file and renames it over the original, so a
    /// crash mid-write can never leave torn JSON behind. Blocking IO on the
    /// caller's thread; the key set is a handful of entries per booking.
    fn persist(path: &Path, keys: &HashSet<String>) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(keys)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl NotificationRecordStore for FileRecordStore {
    fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .expect("record store poisoned")
            .contains(key)
    }

    fn mark(&self, key: &str) -> Result<(), StoreError> {
        let mut keys = self.keys.lock().expect("record store poisoned");
        if keys.insert(key.to_string()) {
            Self::persist(&self.path, &keys)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{record_key, FileRecordStore, MemoryRecordStore, NotificationRecordStore};

    #[test]
    fn memory_store_marks_and_checks() {
        let store = MemoryRecordStore::new();
        let key = record_key("bk-1", "tech_assigned");

        assert!(!store.contains(&key));
        store.mark(&key).unwrap();
        assert!(store.contains(&key));
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = std::env::temp_dir().join(format!("records-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let store = FileRecordStore::open(&path).unwrap();
            store.mark(&record_key("bk-1", "status_completed")).unwrap();
        }

        let reopened = FileRecordStore::open(&path).unwrap();
        assert!(reopened.contains(&record_key("bk-1", "status_completed")));
        assert!(!reopened.contains(&record_key("bk-2", "status_completed")));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_store_replaces_file_without_leftover_tmp() {
        let path =
            std::env::temp_dir().join(format!("records-rename-{}.json", std::process::id()));
        let tmp = path.with_extension("tmp");
        let _ = std::fs::remove_file(&path);

        // A stale temp file from an interrupted write must not get in the way.
        std::fs::write(&tmp, b"{torn").unwrap();

        let store = FileRecordStore::open(&path).unwrap();
        store.mark(&record_key("bk-1", "tech_assigned")).unwrap();
        assert!(!tmp.exists());

        let reopened = FileRecordStore::open(&path).unwrap();
        assert!(reopened.contains(&record_key("bk-1", "tech_assigned")));

        let _ = std::fs::remove_file(&path);
    }
}
