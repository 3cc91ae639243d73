//! StorageManager configuration.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    LocalOnly,
    RemoteOnly,
    LocalAndRemote,
}

impl StorageMode {
    fn from_env_str(s: &str) -> Self {
        match s {
            "local_only" => StorageMode::LocalOnly,
            "remote_only" => StorageMode::RemoteOnly,
            _ => StorageMode::LocalAndRemote,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
}

impl RemoteConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL").ok()?,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID").ok()?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY").ok()?,
            bucket_name: std::env::var("STORAGE_BUCKET_NAME").ok()?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub mode: StorageMode,
    pub work_dir: std::path::PathBuf,
    pub multipart_threshold_bytes: u64,
    pub presign_ttl: Duration,
    pub remote: Option<RemoteConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::LocalAndRemote,
            work_dir: std::path::PathBuf::from("work"),
            multipart_threshold_bytes: 26_214_400,
            presign_ttl: Duration::from_secs(3600),
            remote: None,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            mode: std::env::var("STORAGE_MODE").ok().map(|s| StorageMode::from_env_str(&s)).unwrap_or(default.mode),
            work_dir: std::env::var("STORAGE_WORK_DIR").map(std::path::PathBuf::from).unwrap_or(default.work_dir),
            multipart_threshold_bytes: std::env::var("MULTIPART_THRESHOLD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.multipart_threshold_bytes),
            presign_ttl: std::env::var("PRESIGN_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.presign_ttl),
            remote: RemoteConfig::from_env(),
        }
    }
}

/// Presigned URL TTL bound: `[60s, 7 days]` per spec §4.5.
pub const PRESIGN_TTL_MIN: Duration = Duration::from_secs(60);
pub const PRESIGN_TTL_MAX: Duration = Duration::from_secs(604_800);
