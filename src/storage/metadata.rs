//! Metadata store
//!
//! Asset records are kept behind the [`MetadataStore`] trait. The memory
//! store is used by default and in tests; the JSON store mirrors the map to
//! a file so assets survive a restart.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::asset::Asset;
use crate::error::MetadataError;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or replace an asset record
    async fn put(&self, asset: Asset) -> Result<(), MetadataError>;

    async fn get(&self, id: &str) -> Result<Option<Asset>, MetadataError>;

    /// First asset whose title matches exactly
    async fn find_by_title(&self, title: &str) -> Result<Option<Asset>, MetadataError>;

    /// All assets, oldest first
    async fn list(&self) -> Result<Vec<Asset>, MetadataError>;
}

fn sorted(mut assets: Vec<Asset>) -> Vec<Asset> {
    assets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    assets
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    assets: DashMap<String, Asset>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn put(&self, asset: Asset) -> Result<(), MetadataError> {
        self.assets.insert(asset.id.clone(), asset);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Asset>, MetadataError> {
        Ok(self.assets.get(id).map(|r| r.clone()))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Asset>, MetadataError> {
        let matches = self
            .assets
            .iter()
            .filter(|r| r.title == title)
            .map(|r| r.clone())
            .collect();
        Ok(sorted(matches).into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Asset>, MetadataError> {
        Ok(sorted(self.assets.iter().map(|r| r.clone()).collect()))
    }
}

/// Store persisted as a single JSON document
#[derive(Debug)]
pub struct JsonFileMetadataStore {
    path: PathBuf,
    assets: RwLock<HashMap<String, Asset>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileMetadataStore {
    /// Open the store at `path`, loading existing records if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, MetadataError> {
        let path = path.into();
        let assets = match tokio::fs::read(&path).await {
            Ok(data) => {
                let list: Vec<Asset> =
                    serde_json::from_slice(&data).map_err(|e| MetadataError::Load {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                list.into_iter().map(|a| (a.id.clone(), a)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(MetadataError::Load {
                    path,
                    message: e.to_string(),
                })
            }
        };

        tracing::info!("Loaded {} asset record(s) from {}", assets.len(), path.display());

        Ok(Self {
            path,
            assets: RwLock::new(assets),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Rewrite the file from the in-memory map. Callers hold `write_lock`.
    async fn persist(&self) -> Result<(), MetadataError> {
        let snapshot = {
            let assets = self.assets.read();
            sorted(assets.values().cloned().collect())
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;
        write_atomic(&self.path, &data)
            .await
            .map_err(|source| MetadataError::Persist {
                path: self.path.clone(),
                source,
            })
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await
}

#[async_trait]
impl MetadataStore for JsonFileMetadataStore {
    async fn put(&self, asset: Asset) -> Result<(), MetadataError> {
        let _guard = self.write_lock.lock().await;
        let id = asset.id.clone();
        let previous = self.assets.write().insert(id.clone(), asset);

        if let Err(e) = self.persist().await {
            let mut assets = self.assets.write();
            match previous {
                Some(prev) => assets.insert(id, prev),
                None => assets.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Asset>, MetadataError> {
        Ok(self.assets.read().get(id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Asset>, MetadataError> {
        let matches = self
            .assets
            .read()
            .values()
            .filter(|a| a.title == title)
            .cloned()
            .collect();
        Ok(sorted(matches).into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Asset>, MetadataError> {
        Ok(sorted(self.assets.read().values().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(title: &str) -> Asset {
        Asset::new(
            title,
            "description",
            PathBuf::from(format!("/videos/{}.mp4", title)),
            "video/mp4",
        )
    }

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryMetadataStore::new();
        let first = asset("first");
        let second = asset("second");

        store.put(first.clone()).await.unwrap();
        store.put(second.clone()).await.unwrap();

        assert_eq!(store.get(&first.id).await.unwrap(), Some(first.clone()));
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert_eq!(
            store.find_by_title("second").await.unwrap().map(|a| a.id),
            Some(second.id.clone())
        );
        assert!(store.find_by_title("third").await.unwrap().is_none());

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id) && ids.contains(&second.id));
    }

    #[tokio::test]
    async fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta/assets.json");
        let a = asset("persisted");

        {
            let store = JsonFileMetadataStore::open(&path).await.unwrap();
            assert!(store.list().await.unwrap().is_empty());
            store.put(a.clone()).await.unwrap();
        }

        let reopened = JsonFileMetadataStore::open(&path).await.unwrap();
        assert_eq!(reopened.get(&a.id).await.unwrap(), Some(a.clone()));
        assert_eq!(
            reopened.find_by_title("persisted").await.unwrap(),
            Some(a)
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_store_concurrent_puts_match_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        let store = std::sync::Arc::new(JsonFileMetadataStore::open(&path).await.unwrap());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.put(asset(&format!("clip-{}", i))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let on_disk = JsonFileMetadataStore::open(&path).await.unwrap();
        assert_eq!(on_disk.list().await.unwrap().len(), 16);
        assert_eq!(on_disk.list().await.unwrap(), store.list().await.unwrap());
    }

    #[tokio::test]
    async fn test_json_store_failed_put_not_persisted_by_later_put() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        let store = JsonFileMetadataStore::open(&path).await.unwrap();

        // Block the rename for one put, then clear the way again
        std::fs::create_dir_all(path.join("blocker")).unwrap();
        let doomed = asset("doomed");
        assert!(store.put(doomed.clone()).await.is_err());
        std::fs::remove_dir_all(&path).unwrap();

        let kept = asset("kept");
        store.put(kept.clone()).await.unwrap();

        let reopened = JsonFileMetadataStore::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileMetadataStore::open(&path).await.unwrap_err();
        assert!(matches!(err, MetadataError::Load { .. }));
    }

    #[tokio::test]
    async fn test_json_store_put_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the JSON file should be makes every rename fail
        let path = dir.path().join("assets.json");
        let store = JsonFileMetadataStore::open(&path).await.unwrap();
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let a = asset("doomed");
        assert!(store.put(a.clone()).await.is_err());
        assert!(store.get(&a.id).await.unwrap().is_none());
    }
}
