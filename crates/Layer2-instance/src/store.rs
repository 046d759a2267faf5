//! Durable instance store
//!
//! Keyed collection of instance records with write-through persistence:
//! every mutation rewrites the whole JSON document before returning. The
//! reader/writer lock serializes access within one process only; concurrent
//! mutation of the persisted file by a second process is undefined behavior
//! (last writer wins, no optimistic concurrency check).

use crate::instance::Instance;
use sprig_foundation::{Error, JsonStore, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// Store document file name
pub const INSTANCES_FILE: &str = "sprig_instances.json";

/// File-backed instance store
#[derive(Debug)]
pub struct InstanceStore {
    files: JsonStore,
    instances: RwLock<HashMap<String, Instance>>,
}

impl InstanceStore {
    /// Open the store at a directory, loading any persisted document.
    ///
    /// A missing or empty file is a legitimate empty store. A document that
    /// fails to decode resets the in-memory state to empty and surfaces the
    /// decode error; no partial recovery is attempted.
    pub fn open(store_dir: impl Into<PathBuf>) -> Result<Self> {
        let files = JsonStore::new(store_dir);
        let instances = match files.load_optional::<HashMap<String, Instance>>(INSTANCES_FILE) {
            Ok(Some(map)) => map,
            Ok(None) => HashMap::new(),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "failed to load instances, store reset to empty: {e}"
                )))
            }
        };

        debug!(
            "opened instance store at {} with {} record(s)",
            files.base_dir().display(),
            instances.len()
        );

        Ok(Self {
            files,
            instances: RwLock::new(instances),
        })
    }

    /// Path of the persisted document
    pub fn document_path(&self) -> PathBuf {
        self.files.file_path(INSTANCES_FILE)
    }

    /// Add a new instance. Fails with `AlreadyExists` on a duplicate id.
    pub async fn add(&self, instance: Instance) -> Result<()> {
        let mut instances = self.instances.write().await;
        if instances.contains_key(&instance.id) {
            return Err(Error::AlreadyExists(instance.id));
        }
        instances.insert(instance.id.clone(), instance);
        self.files.save(INSTANCES_FILE, &*instances)
    }

    /// Look up an instance by id
    pub async fn get(&self, id: &str) -> Option<Instance> {
        self.instances.read().await.get(id).cloned()
    }

    /// Snapshot of all stored instances
    pub async fn get_all(&self) -> Vec<Instance> {
        self.instances.read().await.values().cloned().collect()
    }

    /// Replace an existing instance. Fails with `NotFound` if absent.
    pub async fn update(&self, id: &str, instance: Instance) -> Result<()> {
        let mut instances = self.instances.write().await;
        if !instances.contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        instances.insert(id.to_string(), instance);
        self.files.save(INSTANCES_FILE, &*instances)
    }

    /// Remove an instance. Fails with `NotFound` if absent.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut instances = self.instances.write().await;
        if instances.remove(id).is_none() {
            return Err(Error::NotFound(id.to_string()));
        }
        self.files.save(INSTANCES_FILE, &*instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;

    fn sample(id_hint: &str) -> Instance {
        let ws = Workspace {
            id: format!("ws-{id_hint}"),
            path: std::path::PathBuf::from(format!("/tmp/sprig-test/{id_hint}")),
        };
        Instance::new(&ws, "main", "true", 0)
    }

    #[tokio::test]
    async fn test_add_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstanceStore::open(dir.path()).unwrap();

        let inst = sample("a");
        store.add(inst.clone()).await.unwrap();

        let got = store.get(&inst.id).await.unwrap();
        assert_eq!(got, inst);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_add_duplicate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstanceStore::open(dir.path()).unwrap();

        let inst = sample("a");
        store.add(inst.clone()).await.unwrap();
        let err = store.add(inst).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_fail() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstanceStore::open(dir.path()).unwrap();

        let inst = sample("a");
        let err = store.update(&inst.id, inst.clone()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = store.delete(&inst.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reload_reproduces_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut expected = Vec::new();
        {
            let store = InstanceStore::open(dir.path()).unwrap();
            for hint in ["a", "b", "c"] {
                let inst = sample(hint);
                store.add(inst.clone()).await.unwrap();
                expected.push(inst);
            }
        }

        let reloaded = InstanceStore::open(dir.path()).unwrap();
        for inst in expected {
            assert_eq!(reloaded.get(&inst.id).await.unwrap(), inst);
        }
    }

    #[tokio::test]
    async fn test_delete_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let inst = sample("a");
        {
            let store = InstanceStore::open(dir.path()).unwrap();
            store.add(inst.clone()).await.unwrap();
            store.delete(&inst.id).await.unwrap();
        }

        let reloaded = InstanceStore::open(dir.path()).unwrap();
        assert!(reloaded.get(&inst.id).await.is_none());
        assert!(reloaded.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_surfaces_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INSTANCES_FILE), "{broken").unwrap();
        let err = InstanceStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INSTANCES_FILE), "").unwrap();
        let store = InstanceStore::open(dir.path()).unwrap();
        assert!(store.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_in_document_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = r#"{"i1": {"id": "i1", "name": "x-i1", "pid": 0, "port": 0,
            "path": "/tmp/x", "status": "hibernating", "command": "true",
            "workspaceId": "ws", "startTime": "2026-01-01T00:00:00Z",
            "logPath": "/tmp/x/i1.out.log"}}"#;
        std::fs::write(dir.path().join(INSTANCES_FILE), doc).unwrap();
        assert!(InstanceStore::open(dir.path()).is_err());
    }
}
