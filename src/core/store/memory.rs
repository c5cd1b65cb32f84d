//! In-memory store double used by the test suite

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::error::{StoreError, StoreResult};
use super::{object_key, ObjectMeta, ObjectStore};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    backup_time: String,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    put_count: Arc<Mutex<usize>>,
    fail_puts: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, as if a prior process had uploaded it.
    pub fn insert_object(&self, key: &str, data: Vec<u8>, backup_time: &str) {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                backup_time: backup_time.to_string(),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn backup_time(&self, key: &str) -> Option<String> {
        let objects = self.objects.lock().unwrap();
        objects.get(key).map(|o| o.backup_time.clone())
    }

    pub fn object_data(&self, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects.get(key).map(|o| o.data.clone())
    }

    /// Number of successful uploads observed.
    pub fn put_count(&self) -> usize {
        *self.put_count.lock().unwrap()
    }

    /// Make subsequent uploads fail with a transport error.
    pub fn set_fail_puts(&self, fail: bool) {
        *self.fail_puts.lock().unwrap() = fail;
    }
}

impl ObjectStore for MemoryStore {
    fn put(&self, local_path: &Path, backup_time: &str) -> StoreResult<()> {
        if *self.fail_puts.lock().unwrap() {
            return Err(StoreError::Transport("simulated upload failure".to_string()));
        }
        let key = object_key(local_path)?;
        let data = fs::read(local_path)?;
        self.insert_object(&key, data, backup_time);
        *self.put_count.lock().unwrap() += 1;
        Ok(())
    }

    fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.get(key).map(|o| ObjectMeta {
            backup_time: Some(o.backup_time.clone()),
        }))
    }

    fn get(&self, key: &str, local_path: &Path) -> StoreResult<bool> {
        let data = {
            let objects = self.objects.lock().unwrap();
            objects.get(key).map(|o| o.data.clone())
        };
        match data {
            Some(data) => {
                fs::write(local_path, data)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_head_get_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("u.tar.gz");
        fs::write(&source, b"artifact").unwrap();

        let store = MemoryStore::new();
        store.put(&source, "2024-05-01T00:00:00Z").unwrap();

        let meta = store.head("u.tar.gz").unwrap().unwrap();
        assert_eq!(meta.backup_time.as_deref(), Some("2024-05-01T00:00:00Z"));

        let target = temp_dir.path().join("restored.tar.gz");
        assert!(store.get("u.tar.gz", &target).unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"artifact");
    }

    #[test]
    fn test_absent_key_is_reported_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        assert!(store.head("missing.tar.gz").unwrap().is_none());
        assert!(!store
            .get("missing.tar.gz", &temp_dir.path().join("x"))
            .unwrap());
    }

    #[test]
    fn test_failing_puts() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("u.tar.gz");
        fs::write(&source, b"artifact").unwrap();

        let store = MemoryStore::new();
        store.set_fail_puts(true);
        assert!(store.put(&source, "t").is_err());
        assert_eq!(store.put_count(), 0);
        assert!(!store.contains("u.tar.gz"));
    }
}
