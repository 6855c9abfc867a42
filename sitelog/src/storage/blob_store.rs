//! Keyed blob storage
//!
//! Stores binary image content under generated identifiers of the form
//! `img_<unix millis>_<64 random bits in hex>`.
//!
//! Each store lives in its own namespace directory with a `store.json`
//! carrying its name and schema version:
//!
//! ```text
//! blobs/sitelog-images/store.json
//! blobs/sitelog-images/objects/img_1700000000000_9f86d081884c7d65
//! ```

use crate::config::BLOB_ID_PREFIX;
use crate::error::{AppError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const METADATA_FILENAME: &str = "store.json";
const OBJECTS_DIRNAME: &str = "objects";

#[derive(Debug, Serialize, Deserialize)]
struct StoreMetadata {
    name: String,
    version: u32,
}

/// Namespaced, versioned blob store
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    name: String,
    version: u32,
    ready: Arc<AtomicBool>,
}

impl BlobStore {
    /// Create a handle for the store `name` under `parent`.
    /// Nothing touches the disk until [`BlobStore::initialize`].
    pub fn new(parent: &Path, name: &str, version: u32) -> Self {
        Self {
            root: parent.join(name),
            name: name.to_string(),
            version,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open the store, running the upgrade step when the persisted version
    /// is behind. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<()> {
        self.open().await.map_err(|e| match e {
            AppError::StorageUnavailable(_) => e,
            other => AppError::StorageUnavailable(format!(
                "cannot open blob store {}: {}",
                self.name, other
            )),
        })?;

        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(
            "Blob store {} (v{}) initialized at: {:?}",
            self.name,
            self.version,
            self.root
        );
        Ok(())
    }

    async fn open(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        let stored_version = match self.read_metadata().await? {
            Some(meta) if meta.name != self.name => {
                return Err(AppError::StorageUnavailable(format!(
                    "directory {:?} belongs to blob store {}",
                    self.root, meta.name
                )));
            }
            Some(meta) => meta.version,
            None => 0,
        };

        if stored_version > self.version {
            return Err(AppError::StorageUnavailable(format!(
                "blob store {} is at version {}, newer than supported version {}",
                self.name, stored_version, self.version
            )));
        }

        if stored_version < self.version {
            self.upgrade(stored_version).await?;
        }

        fs::create_dir_all(self.objects_dir()).await?;
        Ok(())
    }

    /// Bring the on-disk layout from `from_version` up to the current version
    async fn upgrade(&self, from_version: u32) -> Result<()> {
        tracing::info!(
            "Upgrading blob store {} from version {} to {}",
            self.name,
            from_version,
            self.version
        );

        // v1: flat objects/ directory
        if from_version < 1 {
            fs::create_dir_all(self.objects_dir()).await?;
        }

        let meta = StoreMetadata {
            name: self.name.clone(),
            version: self.version,
        };
        let path = self.root.join(METADATA_FILENAME);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(&meta)?).await?;
        fs::rename(temp_path, path).await?;

        Ok(())
    }

    async fn read_metadata(&self) -> Result<Option<StoreMetadata>> {
        let path = self.root.join(METADATA_FILENAME);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Store content under a freshly generated identifier
    pub async fn put(&self, data: &[u8]) -> Result<String> {
        self.ensure_ready()?;

        let id = generate_blob_id();
        let path = self.object_path(&id);

        // Write to temp file first (atomic write)
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        fs::rename(temp_path, &path).await?;

        tracing::debug!("Wrote blob: {} ({} bytes)", id, data.len());

        Ok(id)
    }

    /// Read the content stored under `id`
    pub async fn get(&self, id: &str) -> Result<Vec<u8>> {
        self.ensure_ready()?;

        if !is_safe_key(id) {
            return Err(AppError::NotFound(id.to_string()));
        }

        let path = self.object_path(id);
        if !path.exists() {
            return Err(AppError::NotFound(id.to_string()));
        }

        let mut file = fs::File::open(&path).await?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;

        tracing::debug!("Read blob: {} ({} bytes)", id, data.len());

        Ok(data)
    }

    /// Check if a blob exists
    pub async fn exists(&self, id: &str) -> Result<bool> {
        self.ensure_ready()?;
        Ok(is_safe_key(id) && self.object_path(id).exists())
    }

    /// Delete a blob
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.ensure_ready()?;

        if !is_safe_key(id) {
            return Ok(());
        }

        let path = self.object_path(id);
        if !path.exists() {
            return Ok(()); // Already deleted
        }

        fs::remove_file(&path).await?;

        tracing::debug!("Deleted blob: {}", id);

        Ok(())
    }

    /// Remove every blob. References held elsewhere are left dangling.
    pub async fn clear(&self) -> Result<()> {
        self.ensure_ready()?;

        let objects = self.objects_dir();
        if objects.exists() {
            fs::remove_dir_all(&objects).await?;
        }
        fs::create_dir_all(&objects).await?;

        tracing::info!("Cleared blob store {}", self.name);

        Ok(())
    }

    /// List all blob identifiers, sorted
    pub async fn list_all(&self) -> Result<Vec<String>> {
        self.ensure_ready()?;

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(self.objects_dir()).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_safe_key(name) {
                    ids.push(name.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::StorageUnavailable(format!(
                "blob store {} is not initialized",
                self.name
            )))
        }
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIRNAME)
    }

    fn object_path(&self, id: &str) -> PathBuf {
        self.objects_dir().join(id)
    }
}

fn generate_blob_id() -> String {
    format!(
        "{}{}_{:016x}",
        BLOB_ID_PREFIX,
        Utc::now().timestamp_millis(),
        rand::random::<u64>()
    )
}

/// Keys map straight to file names, so no separators or dots
fn is_safe_key(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path(), "test-images", 1);
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _temp) = create_test_store().await;

        let data = b"Hello, World!";
        let id = store.put(data).await.unwrap();
        assert!(id.starts_with("img_"));

        let read_data = store.get(&id).await.unwrap();
        assert_eq!(data, read_data.as_slice());
    }

    #[tokio::test]
    async fn test_ids_are_unique_for_same_content() {
        let (store, _temp) = create_test_store().await;

        let id1 = store.put(b"same").await.unwrap();
        let id2 = store.put(b"same").await.unwrap();

        assert_ne!(id1, id2);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp) = create_test_store().await;

        let kept = store.put(b"kept").await.unwrap();
        let gone = store.put(b"gone").await.unwrap();

        store.delete(&gone).await.unwrap();
        assert!(!store.exists(&gone).await.unwrap());
        assert_eq!(store.list_all().await.unwrap(), vec![kept]);

        // Deleting again or deleting a bad key is a no-op
        store.delete(&gone).await.unwrap();
        store.delete("../store.json").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (store, _temp) = create_test_store().await;

        let result = store.get("img_0_0000000000000000").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = store.get("../store.json").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, _temp) = create_test_store().await;

        let id = store.put(b"Clear test").await.unwrap();
        assert!(store.exists(&id).await.unwrap());

        store.clear().await.unwrap();

        assert!(!store.exists(&id).await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());

        // Store stays usable
        let id = store.put(b"after clear").await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), b"after clear");
    }

    #[tokio::test]
    async fn test_requires_initialize() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path(), "test-images", 1);

        let result = store.put(b"too early").await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));

        store.initialize().await.unwrap();
        assert!(store.put(b"now").await.is_ok());
    }

    #[tokio::test]
    async fn test_reinitialize_keeps_content() {
        let (store, temp) = create_test_store().await;
        let id = store.put(b"persisted").await.unwrap();

        store.initialize().await.unwrap();

        let reopened = BlobStore::new(temp.path(), "test-images", 1);
        reopened.initialize().await.unwrap();
        assert_eq!(reopened.get(&id).await.unwrap(), b"persisted");
    }

    #[tokio::test]
    async fn test_version_upgrade() {
        let (store, temp) = create_test_store().await;
        let id = store.put(b"v1 data").await.unwrap();

        let upgraded = BlobStore::new(temp.path(), "test-images", 2);
        upgraded.initialize().await.unwrap();
        assert_eq!(upgraded.get(&id).await.unwrap(), b"v1 data");

        let raw = std::fs::read(temp.path().join("test-images").join("store.json")).unwrap();
        let meta: StoreMetadata = serde_json::from_slice(&raw).unwrap();
        assert_eq!(meta.version, 2);

        // Older code cannot open a newer store
        let downgraded = BlobStore::new(temp.path(), "test-images", 1);
        let result = downgraded.initialize().await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unwritable_root_is_storage_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = BlobStore::new(&blocker, "test-images", 1);
        let result = store.initialize().await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }
}
