//! Job artifact storage.
//!
//! This crate provides:
//! - The `JobStore` capability (put/get/list/delete keyed by job, kind, index)
//! - A local-disk store and an S3 store
//! - Explicit backend selection from configuration

pub mod config;
pub mod error;
pub mod fs_utils;
pub mod key;
pub mod local;
pub mod s3;
pub mod store;

pub use config::{StorageBackend, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use key::{job_prefix, ArtifactKey};
pub use local::LocalStore;
pub use s3::{S3Config, S3Store};
pub use store::{JobStore, StoredObject};
