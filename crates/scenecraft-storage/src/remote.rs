//! S3-compatible remote object store backend.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::config::{RemoteConfig, PRESIGN_TTL_MAX, PRESIGN_TTL_MIN};
use crate::error::{StorageError, StorageResult};

/// Thin wrapper around the S3 SDK client, scoped to one bucket.
#[derive(Clone)]
pub struct RemoteBackend {
    client: Client,
    bucket: String,
}

impl RemoteBackend {
    pub fn new(config: &RemoteConfig) -> Self {
        let credentials = Credentials::new(&config.access_key_id, &config.secret_access_key, None, None, "scenecraft");

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self { client: Client::from_conf(sdk_config), bucket: config.bucket_name.clone() }
    }

    pub async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<()> {
        debug!(bytes = data.len(), key, "uploading object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        Ok(())
    }

    /// Multipart upload used once `size >= multipart_threshold_bytes`.
    /// The S3 SDK's basic client does not expose a high-level multipart
    /// helper; for file-backed uploads beyond the threshold this streams
    /// the ByteStream from disk instead of buffering in memory.
    pub async fn upload_file(&self, path: impl AsRef<Path>, key: &str, content_type: &str) -> StorageResult<()> {
        let path = path.as_ref();
        let body = ByteStream::from_path(path).await.map_err(|e| StorageError::upload_failed(e.to_string()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        info!(path = %path.display(), key, "uploaded file");
        Ok(())
    }

    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let response = self.client.get_object().bucket(&self.bucket).key(key).send().await.map_err(|e| {
            if e.to_string().contains("NoSuchKey") {
                StorageError::not_found(key)
            } else {
                StorageError::DownloadFailed(e.to_string())
            }
        })?;

        let bytes = response.body.collect().await.map_err(|e| StorageError::DownloadFailed(e.to_string()))?.into_bytes().to_vec();
        Ok(bytes)
    }

    /// Presigned GET URL; `ttl` is clamped into `[60s, 7 days]` here so
    /// callers never need to validate it themselves.
    pub async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let clamped = ttl.clamp(PRESIGN_TTL_MIN, PRESIGN_TTL_MAX);
        let presign_config = PresigningConfig::expires_in(clamped).map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client.delete_object().bucket(&self.bucket).key(key).send().await.map_err(|e| StorageError::delete_failed(e.to_string()))?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client.head_bucket().bucket(&self.bucket).send().await.map_err(|e| StorageError::AwsSdk(format!("connectivity check failed: {e}")))?;
        Ok(())
    }
}
