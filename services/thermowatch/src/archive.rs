//! Durable, append-only snapshot archive

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::RwLock;

/// Object store interface: write a blob under a key
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait DurableArchive: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> crate::Result<()>;
}

/// Archive key for a snapshot, e.g. `temperatures/2024-03-01T12:00:00.000Z.json`
pub fn archive_key(taken_at: DateTime<Utc>) -> String {
    format!(
        "temperatures/{}.json",
        taken_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Bound an archive call, reporting an overrun as `ArchiveUnavailable`
pub async fn bounded<T, F>(timeout: Duration, operation: &str, call: F) -> crate::Result<T>
where
    F: Future<Output = crate::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(crate::ThermowatchError::ArchiveUnavailable(format!(
            "{} timed out after {:?}",
            operation, timeout
        ))),
    }
}

fn already_archived(key: &str) -> crate::ThermowatchError {
    crate::ThermowatchError::ArchiveUnavailable(format!("{} is already archived", key))
}

/// Archive that stores each object as a file below a root directory
#[derive(Debug, Clone)]
pub struct FsArchive {
    root: PathBuf,
}

impl FsArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> crate::Result<PathBuf> {
        let relative = Path::new(key);
        let well_formed = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(crate::ThermowatchError::ArchiveUnavailable(format!(
                "Invalid archive key {:?}",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DurableArchive for FsArchive {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> crate::Result<()> {
        let path = self.object_path(key)?;
        let unavailable = |e: std::io::Error| {
            crate::ThermowatchError::ArchiveUnavailable(format!("Writing {:?}: {}", path, e))
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(unavailable)?;
        }

        // Stage next to the target and link it into place: readers never see a
        // partial object and an existing object is never replaced
        let staging = path.with_extension("json.partial");
        let published = match tokio::fs::write(&staging, &bytes).await {
            Ok(()) => tokio::fs::hard_link(&staging, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove staging file {:?}: {}", staging, e);
            }
        }

        match published {
            Ok(()) => {
                tracing::debug!("Archived {} ({} bytes)", key, bytes.len());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(already_archived(key)),
            Err(e) => Err(unavailable(e)),
        }
    }
}

/// Archive held in process memory
#[derive(Debug, Default)]
pub struct MemoryArchive {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl DurableArchive for MemoryArchive {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> crate::Result<()> {
        match self.objects.write().await.entry(key.to_string()) {
            Entry::Occupied(_) => Err(already_archived(key)),
            Entry::Vacant(slot) => {
                tracing::debug!("Archived {} ({} bytes) in memory", key, bytes.len());
                slot.insert(bytes);
                Ok(())
            }
        }
    }
}
