//! Local-filesystem object backend, used standalone in `local_only` mode
//! and as the staging area ahead of a remote upload otherwise.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

/// Size and content hash observed while streaming a write to disk.
pub struct WrittenObject {
    pub size_bytes: u64,
    pub sha256: String,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    pub async fn write_bytes(&self, key: &str, data: &[u8]) -> StorageResult<WrittenObject> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        let mut hasher = Sha256::new();
        hasher.update(data);
        Ok(WrittenObject { size_bytes: data.len() as u64, sha256: format!("{:x}", hasher.finalize()) })
    }

    /// Copies `source` into the backend's root under `key`, hashing the
    /// content as it streams through rather than re-reading the file twice.
    pub async fn ingest_file(&self, source: impl AsRef<Path>, key: &str) -> StorageResult<WrittenObject> {
        let dest = self.resolve(key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut reader = fs::File::open(source.as_ref()).await?;
        let mut writer = fs::File::create(&dest).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        let mut size_bytes = 0u64;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size_bytes += n as u64;
            tokio::io::AsyncWriteExt::write_all(&mut writer, &buf[..n]).await?;
        }

        Ok(WrittenObject { size_bytes, sha256: format!("{:x}", hasher.finalize()) })
    }

    pub async fn read_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::not_found(key)
            } else {
                StorageError::Io(e)
            }
        })
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve(key)?;
        Ok(fs::metadata(&path).await.is_ok())
    }

    pub fn local_path(&self, key: &str) -> StorageResult<PathBuf> {
        self.resolve(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let written = backend.write_bytes("a/b/c.bin", b"hello world").await.unwrap();
        assert_eq!(written.size_bytes, 11);

        let read_back = backend.read_bytes("a/b/c.bin").await.unwrap();
        assert_eq!(read_back, b"hello world");
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let result = backend.write_bytes("../escape.bin", b"x").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        assert!(backend.delete("missing.bin").await.is_ok());
    }
}
