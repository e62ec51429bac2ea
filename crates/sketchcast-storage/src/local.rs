//! Job store on local disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use sketchcast_models::{JobId, LocationRef};

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::move_file;
use crate::key::{job_prefix, ArtifactKey};
use crate::store::{JobStore, StoredObject};

/// Stores artifacts as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// A relative `root` is resolved against the working directory once,
    /// so every location this store hands out is absolute.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a location, provided it lives under this store.
    fn own_path<'a>(&self, location: &'a LocationRef) -> StorageResult<&'a Path> {
        match location {
            LocationRef::Local { path } if path.starts_with(&self.root) => Ok(path.as_path()),
            other => Err(StorageError::foreign_location(self.backend_name(), other)),
        }
    }
}

#[async_trait]
impl JobStore for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, local: &Path, key: &ArtifactKey) -> StorageResult<LocationRef> {
        let dest = self.root.join(key.object_key()?);
        move_file(local, &dest).await?;
        debug!("Stored {} at {}", key, dest.display());
        Ok(LocationRef::local(dest))
    }

    async fn get(&self, location: &LocationRef) -> StorageResult<Vec<u8>> {
        let path = self.own_path(location)?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn materialize(
        &self,
        location: &LocationRef,
        _scratch_dir: &Path,
    ) -> StorageResult<PathBuf> {
        let path = self.own_path(location)?;
        if !path.exists() {
            return Err(StorageError::not_found(path.display().to_string()));
        }
        Ok(path.to_path_buf())
    }

    async fn list(&self, job_id: &JobId) -> StorageResult<Vec<StoredObject>> {
        let job_dir = self.root.join(job_prefix(job_id)?);
        let mut objects = Vec::new();
        if !job_dir.exists() {
            return Ok(objects);
        }

        let mut kinds = tokio::fs::read_dir(&job_dir).await?;
        while let Some(kind_dir) = kinds.next_entry().await? {
            if !kind_dir.file_type().await?.is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(kind_dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let object_key = relative.to_string_lossy().replace('\\', "/");
                let Some(key) = ArtifactKey::parse(&object_key) else {
                    continue;
                };
                let size = file.metadata().await?.len();
                objects.push(StoredObject {
                    key,
                    location: LocationRef::local(path),
                    size,
                });
            }
        }

        objects.sort_by(|a, b| (a.key.kind, a.key.index).cmp(&(b.key.kind, b.key.index)));
        Ok(objects)
    }

    async fn delete(&self, location: &LocationRef) -> StorageResult<()> {
        let path = self.own_path(location)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::delete_failed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }
}
