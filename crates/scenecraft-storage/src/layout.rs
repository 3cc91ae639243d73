//! Bit-exact object layout rules (spec §4.5).

use scenecraft_models::{FileKind, JobId, UserId};

/// Zero-pads a scene index to 3 digits, per `scene_{NNN}`.
pub fn scene_suffix(scene_index: u32) -> String {
    format!("{scene_index:03}")
}

pub fn scene_video_key(user_id: &UserId, job_id: JobId, scene_index: u32) -> String {
    format!("users/{user_id}/jobs/{job_id}/videos/scene_{}/output.mp4", scene_suffix(scene_index))
}

pub fn combined_video_key(user_id: &UserId, job_id: JobId) -> String {
    format!("users/{user_id}/jobs/{job_id}/videos/combined.mp4")
}

pub fn scene_code_key(user_id: &UserId, job_id: JobId, scene_index: u32) -> String {
    format!("users/{user_id}/jobs/{job_id}/code/scene_{}.py", scene_suffix(scene_index))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    Small,
    Medium,
    Large,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 3] = [ThumbnailSize::Small, ThumbnailSize::Medium, ThumbnailSize::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            ThumbnailSize::Small => "small",
            ThumbnailSize::Medium => "medium",
            ThumbnailSize::Large => "large",
        }
    }

    /// Target pixel width for this thumbnail size.
    pub fn width(self) -> u32 {
        match self {
            ThumbnailSize::Small => 320,
            ThumbnailSize::Medium => 640,
            ThumbnailSize::Large => 1280,
        }
    }
}

pub fn thumbnail_key(user_id: &UserId, job_id: JobId, size: ThumbnailSize) -> String {
    format!("users/{user_id}/jobs/{job_id}/thumbnails/{}.jpg", size.as_str())
}

/// The logical name an upload is keyed by for idempotent-at-most-once
/// finalization: `(job_id, kind, scene_index?, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalName {
    pub job_id: JobId,
    pub kind: FileKind,
    pub scene_index: Option<u32>,
    pub name: String,
}

impl LogicalName {
    pub fn new(job_id: JobId, kind: FileKind, scene_index: Option<u32>, name: impl Into<String>) -> Self {
        Self { job_id, kind, scene_index, name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_index_is_zero_padded_to_three_digits() {
        assert_eq!(scene_suffix(7), "007");
        assert_eq!(scene_suffix(42), "042");
    }

    #[test]
    fn scene_video_key_matches_layout_rule() {
        let user = UserId::from("u1");
        let job = JobId::new();
        let key = scene_video_key(&user, job, 3);
        assert!(key.ends_with("/videos/scene_003/output.mp4"));
        assert!(key.starts_with(&format!("users/{user}/jobs/{job}/")));
    }

    #[test]
    fn thumbnail_widths_are_ascending() {
        assert!(ThumbnailSize::Small.width() < ThumbnailSize::Medium.width());
        assert!(ThumbnailSize::Medium.width() < ThumbnailSize::Large.width());
    }
}
