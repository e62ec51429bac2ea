//! Job store on S3-compatible object storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

use sketchcast_models::{JobId, LocationRef};

use crate::error::{StorageError, StorageResult};
use crate::key::{job_prefix, ArtifactKey};
use crate::store::{JobStore, StoredObject};

/// Configuration for the S3 store.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region
    pub region: String,
    /// Custom S3 API endpoint (MinIO, R2, ...)
    pub endpoint_url: Option<String>,
    /// Base URL artifacts are served from, when not the bucket's own host
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("AWS_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("AWS_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("AWS_S3_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("AWS_S3_BUCKET_NAME not set"))?,
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
            public_base_url: std::env::var("S3_PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }

    /// Retrievable URL for an object key.
    pub fn object_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket_name, self.region, key
            ),
        }
    }
}

/// S3 job store.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    config: S3Config,
}

impl S3Store {
    /// Create a new store from configuration.
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "sketchcast",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(S3Config::from_env()?))
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Check connectivity by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket_name)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("S3 connectivity check failed: {}", e)))?;
        Ok(())
    }

    fn own_key<'a>(&self, location: &'a LocationRef) -> StorageResult<&'a str> {
        match location {
            LocationRef::Remote { key, .. } => Ok(key.as_str()),
            other => Err(StorageError::foreign_location(self.backend_name(), other)),
        }
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }
}

#[async_trait]
impl JobStore for S3Store {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, local: &Path, key: &ArtifactKey) -> StorageResult<LocationRef> {
        let object_key = key.object_key()?;
        debug!("Uploading {} to {}", local.display(), object_key);

        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&object_key)
            .body(body)
            .content_type(key.content_type())
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", object_key, e)))?;

        if let Err(e) = tokio::fs::remove_file(local).await {
            warn!("Failed to remove uploaded file {}: {}", local.display(), e);
        }

        let url = self.config.object_url(&object_key);
        info!("Uploaded {} to {}", key, url);
        Ok(LocationRef::remote(object_key, url))
    }

    async fn get(&self, location: &LocationRef) -> StorageResult<Vec<u8>> {
        let key = self.own_key(location)?;
        self.download(key).await
    }

    async fn materialize(
        &self,
        location: &LocationRef,
        scratch_dir: &Path,
    ) -> StorageResult<PathBuf> {
        let key = self.own_key(location)?;
        let bytes = self.download(key).await?;

        // Object keys are job/kind/file; keep the layout to avoid collisions
        let dest = scratch_dir.join("materialized").join(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, bytes).await?;
        Ok(dest)
    }

    async fn list(&self, job_id: &JobId) -> StorageResult<Vec<StoredObject>> {
        let prefix = job_prefix(job_id)?;
        debug!("Listing objects with prefix: {}", prefix);

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.config.bucket_name)
                .prefix(&prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            for obj in response.contents() {
                let Some(object_key) = obj.key() else {
                    continue;
                };
                let Some(key) = ArtifactKey::parse(object_key) else {
                    continue;
                };
                objects.push(StoredObject {
                    key,
                    location: LocationRef::remote(object_key, self.config.object_url(object_key)),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                });
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        objects.sort_by(|a, b| (a.key.kind, a.key.index).cmp(&(b.key.kind, b.key.index)));
        Ok(objects)
    }

    async fn delete(&self, location: &LocationRef) -> StorageResult<()> {
        let key = self.own_key(location)?;
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(format!("{}: {}", key, e)))?;

        Ok(())
    }
}
