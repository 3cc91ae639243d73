//! File metadata repository.

use scenecraft_models::{FileId, FileKind, FileMetadata, JobId, UserId};
use sqlx::PgPool;
use sqlx::Row;

use crate::error::{DbError, DbResult};

#[derive(Clone)]
pub struct FileRepo {
    pool: PgPool,
}

impl FileRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserted only after the producing backend (local write or remote
    /// PUT) has acknowledged the artifact, per spec §4.5.
    pub async fn insert_file(&self, metadata: &FileMetadata) -> DbResult<()> {
        if !metadata.has_location() {
            return Err(DbError::Conflict("file metadata requires object_key or local_path".into()));
        }
        sqlx::query(
            r#"
            INSERT INTO file_metadata
                (file_id, user_id, job_id, kind, bucket, object_key, local_path, size_bytes,
                 content_type, checksum_sha256, version_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(metadata.file_id.0)
        .bind(metadata.owner_user_id.as_str())
        .bind(metadata.job_id.map(|id| id.0))
        .bind(kind_to_str(metadata.kind))
        .bind(&metadata.bucket)
        .bind(&metadata.object_key)
        .bind(&metadata.local_path)
        .bind(metadata.size_bytes as i64)
        .bind(&metadata.content_type)
        .bind(&metadata.checksum_sha256)
        .bind(&metadata.version_id)
        .bind(metadata.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: FileId) -> DbResult<Option<FileMetadata>> {
        let row = sqlx::query(
            r#"SELECT file_id, user_id, job_id, kind, bucket, object_key, local_path, size_bytes,
                      content_type, checksum_sha256, version_id, created_at
               FROM file_metadata WHERE file_id = $1"#,
        )
        .bind(file_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_file).transpose()
    }

    pub async fn list_files(&self, job_id: JobId) -> DbResult<Vec<FileMetadata>> {
        let rows = sqlx::query(
            r#"SELECT file_id, user_id, job_id, kind, bucket, object_key, local_path, size_bytes,
                      content_type, checksum_sha256, version_id, created_at
               FROM file_metadata WHERE job_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(job_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_file).collect()
    }

    /// Looks up a file by its idempotent logical key, used by the
    /// Uploader stage to decide whether an artifact was already uploaded.
    pub async fn find_by_logical_name(&self, job_id: JobId, kind: FileKind, name: &str) -> DbResult<Option<FileMetadata>> {
        let row = sqlx::query(
            r#"SELECT file_id, user_id, job_id, kind, bucket, object_key, local_path, size_bytes,
                      content_type, checksum_sha256, version_id, created_at
               FROM file_metadata
               WHERE job_id = $1 AND kind = $2 AND (object_key LIKE $3 OR local_path LIKE $3)"#,
        )
        .bind(job_id.0)
        .bind(kind_to_str(kind))
        .bind(format!("%{name}"))
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_file).transpose()
    }
}

fn kind_to_str(kind: FileKind) -> &'static str {
    kind.as_str()
}

fn str_to_kind(s: &str) -> DbResult<FileKind> {
    Ok(match s {
        "scene_video" => FileKind::SceneVideo,
        "combined_video" => FileKind::CombinedVideo,
        "thumbnail" => FileKind::Thumbnail,
        "scene_code" => FileKind::SceneCode,
        "asset" => FileKind::Asset,
        other => return Err(DbError::Conflict(format!("unknown file kind {other}"))),
    })
}

fn row_to_file(row: sqlx::postgres::PgRow) -> DbResult<FileMetadata> {
    Ok(FileMetadata {
        file_id: FileId(row.get("file_id")),
        owner_user_id: UserId::from(row.get::<String, _>("user_id")),
        job_id: row.get::<Option<uuid::Uuid>, _>("job_id").map(JobId),
        kind: str_to_kind(row.get("kind"))?,
        bucket: row.get("bucket"),
        object_key: row.get("object_key"),
        local_path: row.get("local_path"),
        size_bytes: row.get::<i64, _>("size_bytes") as u64,
        content_type: row.get("content_type"),
        checksum_sha256: row.get("checksum_sha256"),
        created_at: row.get("created_at"),
        version_id: row.get("version_id"),
    })
}
