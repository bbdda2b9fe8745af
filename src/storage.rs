//! Resource storage
//!
//! Implements the resource collection:
//! 1. In-memory map holding every resource, used for all reads
//! 2. Optional sled embedded database, written through on every mutation
//!    and loaded back on open
//!
//! Consistency between concurrent writers is whatever the write lock gives:
//! last write wins, no conflict detection.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DirectoryError, Result};
use crate::query::QueryFilter;
use crate::resource::{Resource, ResourceDraft, ResourceId, ResourcePatch};

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path for persistent storage
    pub persist_path: Option<PathBuf>,
    /// Enable disk persistence
    pub enable_persistence: bool,
}

impl StorageConfig {
    /// Create config for in-memory only storage
    pub fn memory_only() -> Self {
        Self {
            persist_path: None,
            enable_persistence: false,
        }
    }

    /// Create config with disk persistence
    pub fn with_persistence(path: impl Into<PathBuf>) -> Self {
        Self {
            persist_path: Some(path.into()),
            enable_persistence: true,
        }
    }
}

/// The resource collection
pub struct ResourceStore {
    resources: Arc<RwLock<HashMap<ResourceId, Resource>>>,
    #[cfg(feature = "persistence")]
    disk_store: Option<sled::Db>,
}

impl ResourceStore {
    /// Open the store, loading any persisted resources
    #[cfg(feature = "persistence")]
    pub fn new(config: StorageConfig) -> Result<Self> {
        let disk_store = if config.enable_persistence {
            let path = config
                .persist_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("./data/resources"));

            // Ensure directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            Some(sled::open(&path)?)
        } else {
            None
        };

        let mut resources = HashMap::new();
        if let Some(ref db) = disk_store {
            for entry in db.iter() {
                let (_, data) = entry?;
                let resource: Resource = serde_json::from_slice(&data)?;
                resources.insert(resource.id.clone(), resource);
            }
            info!("Loaded {} persisted resources", resources.len());
        }

        Ok(Self {
            resources: Arc::new(RwLock::new(resources)),
            disk_store,
        })
    }

    /// Open the store; persistence is unavailable in this build
    #[cfg(not(feature = "persistence"))]
    pub fn new(config: StorageConfig) -> Result<Self> {
        if config.enable_persistence {
            return Err(DirectoryError::Config(
                "built without the `persistence` feature".into(),
            ));
        }

        Ok(Self::in_memory())
    }

    /// In-memory store
    pub fn in_memory() -> Self {
        Self {
            resources: Arc::new(RwLock::new(HashMap::new())),
            #[cfg(feature = "persistence")]
            disk_store: None,
        }
    }

    /// All resources matching `filter`, most recently created first
    pub async fn list(&self, filter: &QueryFilter) -> Result<Vec<Resource>> {
        let matcher = filter.resolve()?;

        let mut results: Vec<Resource> = {
            let resources = self.resources.read().await;
            resources
                .values()
                .filter(|r| matcher.matches(r))
                .cloned()
                .collect()
        };

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("{} resources matched {:?}", results.len(), filter);
        Ok(results)
    }

    /// Retrieve a resource by ID
    pub async fn get(&self, id: &ResourceId) -> Result<Option<Resource>> {
        let resources = self.resources.read().await;
        Ok(resources.get(id).cloned())
    }

    /// Validate and store a new resource
    pub async fn create(&self, draft: ResourceDraft) -> Result<Resource> {
        let resource = draft.into_resource(ResourceId::new(), Utc::now())?;

        self.persist(&resource).await?;
        self.resources
            .write()
            .await
            .insert(resource.id.clone(), resource.clone());

        info!("Created resource {} ({})", resource.id, resource.title);
        Ok(resource)
    }

    /// Merge `patch` over an existing resource
    pub async fn update(&self, id: &ResourceId, patch: ResourcePatch) -> Result<Resource> {
        let mut updated = self
            .get(id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;

        patch.apply(&mut updated)?;
        self.persist(&updated).await?;

        {
            let mut resources = self.resources.write().await;
            if !resources.contains_key(id) {
                // Deleted while the update was being written
                drop(resources);
                self.unpersist(id).await?;
                return Err(DirectoryError::NotFound(id.to_string()));
            }
            resources.insert(id.clone(), updated.clone());
        }

        info!("Updated resource {}", id);
        Ok(updated)
    }

    /// Delete a resource by ID; returns whether it existed
    pub async fn delete(&self, id: &ResourceId) -> Result<bool> {
        let found = self.resources.write().await.remove(id).is_some();
        self.unpersist(id).await?;

        if found {
            info!("Deleted resource {}", id);
        } else {
            debug!("Delete of absent resource {}", id);
        }
        Ok(found)
    }

    /// Number of stored resources
    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get storage statistics
    pub async fn stats(&self) -> StorageStats {
        let resource_count = self.len().await;

        #[cfg(feature = "persistence")]
        let (persistent, disk_count) = match self.disk_store {
            Some(ref db) => (true, db.len()),
            None => (false, 0),
        };
        #[cfg(not(feature = "persistence"))]
        let (persistent, disk_count) = (false, 0);

        StorageStats {
            resource_count,
            disk_count,
            persistent,
        }
    }

    #[cfg(feature = "persistence")]
    async fn persist(&self, resource: &Resource) -> Result<()> {
        if let Some(ref db) = self.disk_store {
            let serialized = serde_json::to_vec(resource)?;
            db.insert(resource.id.as_str().as_bytes(), serialized)?;
            db.flush_async().await?;
        }
        Ok(())
    }

    #[cfg(not(feature = "persistence"))]
    async fn persist(&self, _resource: &Resource) -> Result<()> {
        Ok(())
    }

    #[cfg(feature = "persistence")]
    async fn unpersist(&self, id: &ResourceId) -> Result<()> {
        if let Some(ref db) = self.disk_store {
            if db.remove(id.as_str().as_bytes())?.is_some() {
                db.flush_async().await?;
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "persistence"))]
    async fn unpersist(&self, _id: &ResourceId) -> Result<()> {
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// Number of resources held in memory
    pub resource_count: usize,
    /// Number of resources on disk
    pub disk_count: usize,
    /// Whether mutations are written to disk
    pub persistent: bool,
}
