//! Job store capability.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sketchcast_models::{JobId, LocationRef};

use crate::error::StorageResult;
use crate::key::ArtifactKey;

/// One stored artifact as seen by [`JobStore::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: ArtifactKey,
    pub location: LocationRef,
    /// Size in bytes
    pub size: u64,
}

/// Persistence for job artifacts, on local disk or in object storage.
///
/// Every write is keyed by `(job, kind, index)`, so concurrent writes from
/// different sentences or jobs never collide.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Store the file at `local` under `key`.
    ///
    /// The local file is consumed: it is moved into place or removed after upload.
    async fn put(&self, local: &Path, key: &ArtifactKey) -> StorageResult<LocationRef>;

    /// Read a stored artifact.
    async fn get(&self, location: &LocationRef) -> StorageResult<Vec<u8>>;

    /// Make a stored artifact available as a local file.
    ///
    /// Returns the existing path for local artifacts, otherwise downloads
    /// into `scratch_dir`.
    async fn materialize(&self, location: &LocationRef, scratch_dir: &Path)
        -> StorageResult<PathBuf>;

    /// Every artifact currently stored for a job.
    async fn list(&self, job_id: &JobId) -> StorageResult<Vec<StoredObject>>;

    /// Delete a stored artifact. Deleting a missing artifact succeeds.
    async fn delete(&self, location: &LocationRef) -> StorageResult<()>;
}
