//! Intermediate artifacts passed between stage executors. These are
//! worker-internal: nothing outside the pipeline serializes them over
//! the wire, so they live here rather than in `scenecraft-models`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry of a Planner output, in scene order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDescriptor {
    pub index: u32,
    pub title: String,
    pub beats: Vec<String>,
}

/// The Planner stage's full output: `1 <= scenes.len() <= max_scenes`.
pub type SceneOutline = Vec<SceneDescriptor>;

/// A ScenarioBuilder expansion of one `SceneDescriptor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationPlan {
    pub scene_index: u32,
    pub shot_list: Vec<String>,
    pub assets: Vec<String>,
    pub narration: String,
}

/// CodeGenerator's output for one scene: the path to the generated
/// animation program on the job's local working directory.
#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub scene_index: u32,
    pub program_path: PathBuf,
}

/// Renderer's output for one scene.
#[derive(Debug, Clone)]
pub struct RenderedScene {
    pub scene_index: u32,
    pub video_path: PathBuf,
    pub duration_secs: f64,
}

/// Combiner's output: the concatenated video.
#[derive(Debug, Clone)]
pub struct CombinedVideo {
    pub video_path: PathBuf,
    pub duration_secs: f64,
}

/// A single retrieved snippet from the (out-of-scope) RAG index.
#[derive(Debug, Clone)]
pub struct RagSnippet {
    pub text: String,
}

/// Interface to the external retrieval index CodeGenerator augments its
/// prompt with when `configuration.use_rag` is set. The index itself is
/// out of scope (spec §4.9); this crate only depends on the interface.
pub trait RagIndex: Send + Sync {
    fn query(&self, text: &str, k: usize) -> Vec<RagSnippet>;
}

/// A `RagIndex` that returns nothing, used when no index is configured.
pub struct NullRagIndex;

impl RagIndex for NullRagIndex {
    fn query(&self, _text: &str, _k: usize) -> Vec<RagSnippet> {
        Vec::new()
    }
}

/// Mutable state threaded through the pipeline as stages complete,
/// accumulating each stage's contribution.
#[derive(Debug, Clone, Default)]
pub struct PipelineArtifacts {
    pub outline: Vec<SceneDescriptor>,
    pub scenarios: Vec<ImplementationPlan>,
    pub programs: Vec<GeneratedProgram>,
    pub rendered: Vec<RenderedScene>,
    pub combined: Option<CombinedVideo>,
}
