//! `FileMetadata`: a record of a stored artifact, local and/or remote.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{FileId, JobId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    SceneVideo,
    CombinedVideo,
    Thumbnail,
    SceneCode,
    Asset,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::SceneVideo => "scene_video",
            FileKind::CombinedVideo => "combined_video",
            FileKind::Thumbnail => "thumbnail",
            FileKind::SceneCode => "scene_code",
            FileKind::Asset => "asset",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FileMetadata {
    pub file_id: FileId,
    pub owner_user_id: UserId,
    pub job_id: Option<JobId>,
    pub kind: FileKind,
    pub bucket: Option<String>,
    pub object_key: Option<String>,
    pub local_path: Option<String>,
    pub size_bytes: u64,
    pub content_type: String,
    pub checksum_sha256: String,
    pub created_at: DateTime<Utc>,
    pub version_id: Option<String>,
}

impl FileMetadata {
    /// `at least one of (object_key, local_path) is set` invariant.
    pub fn has_location(&self) -> bool {
        self.object_key.is_some() || self.local_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileMetadata {
        FileMetadata {
            file_id: FileId::new(),
            owner_user_id: UserId::from("u1"),
            job_id: Some(JobId::new()),
            kind: FileKind::SceneVideo,
            bucket: None,
            object_key: None,
            local_path: None,
            size_bytes: 0,
            content_type: "video/mp4".into(),
            checksum_sha256: String::new(),
            created_at: Utc::now(),
            version_id: None,
        }
    }

    #[test]
    fn requires_at_least_one_location() {
        let mut m = sample();
        assert!(!m.has_location());
        m.local_path = Some("work/job/x.mp4".into());
        assert!(m.has_location());
    }
}
