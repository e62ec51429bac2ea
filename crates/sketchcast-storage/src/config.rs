//! Explicit storage backend selection.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::local::LocalStore;
use crate::s3::{S3Config, S3Store};
use crate::store::JobStore;

/// Default root for the local store.
pub const DEFAULT_LOCAL_ROOT: &str = "./data/storage";

/// Which backend persists job artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

impl FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "disk" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(StorageError::config_error(format!(
                "unknown STORAGE_BACKEND '{}', expected local or s3",
                other
            ))),
        }
    }
}

/// Storage configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory of the local store
    pub local_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_root: PathBuf::from(DEFAULT_LOCAL_ROOT),
        }
    }
}

impl StorageConfig {
    /// Read `STORAGE_BACKEND` and `LOCAL_STORAGE_DIR`.
    ///
    /// An unknown backend name is an error rather than a silent fallback.
    pub fn from_env() -> StorageResult<Self> {
        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => StorageBackend::default(),
        };
        let local_root = std::env::var("LOCAL_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOCAL_ROOT));

        Ok(Self {
            backend,
            local_root,
        })
    }

    /// Build the configured store.
    pub fn build(&self) -> StorageResult<Arc<dyn JobStore>> {
        let store: Arc<dyn JobStore> = match self.backend {
            StorageBackend::Local => Arc::new(LocalStore::new(&self.local_root)),
            StorageBackend::S3 => Arc::new(S3Store::new(S3Config::from_env()?)),
        };
        info!(backend = store.backend_name(), "Job store configured");
        Ok(store)
    }
}
