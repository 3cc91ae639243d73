//! The `Configuration` options recognized on job submission.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
    Ultra,
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Mp4
    }
}

fn default_true() -> bool {
    true
}

fn default_max_scene_concurrency() -> u32 {
    3
}

/// Validated, typed job configuration. Unknown fields are rejected at the
/// submission boundary (handled by `#[serde(deny_unknown_fields)]`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    pub topic: String,

    #[serde(default)]
    pub context: String,

    #[serde(default)]
    pub quality: Quality,

    #[serde(default)]
    pub use_rag: bool,

    #[serde(default)]
    pub use_context_learning: bool,

    #[serde(default)]
    pub enable_subtitles: bool,

    #[serde(default = "default_true")]
    pub enable_thumbnails: bool,

    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default)]
    pub model_planner: Option<String>,
    #[serde(default)]
    pub model_scene: Option<String>,
    #[serde(default)]
    pub model_helper: Option<String>,

    #[serde(default = "default_max_scene_concurrency")]
    pub max_scene_concurrency: u32,
}

/// Errors from validating a submitted `Configuration`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("topic must be at most 512 characters")]
    TopicTooLong,
    #[error("context must be at most 8000 characters")]
    ContextTooLong,
    #[error("max_scene_concurrency must be at least 1")]
    InvalidConcurrency,
}

impl Configuration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigurationError::EmptyTopic);
        }
        if self.topic.len() > 512 {
            return Err(ConfigurationError::TopicTooLong);
        }
        if self.context.len() > 8_000 {
            return Err(ConfigurationError::ContextTooLong);
        }
        if self.max_scene_concurrency < 1 {
            return Err(ConfigurationError::InvalidConcurrency);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Configuration {
        Configuration {
            topic: "Pythagorean theorem".into(),
            context: String::new(),
            quality: Quality::Medium,
            use_rag: false,
            use_context_learning: false,
            enable_subtitles: false,
            enable_thumbnails: true,
            output_format: OutputFormat::Mp4,
            model_planner: None,
            model_scene: None,
            model_helper: None,
            max_scene_concurrency: 3,
        }
    }

    #[test]
    fn rejects_empty_topic() {
        let mut c = base();
        c.topic = "   ".into();
        assert!(matches!(c.validate(), Err(ConfigurationError::EmptyTopic)));
    }

    #[test]
    fn rejects_oversized_topic() {
        let mut c = base();
        c.topic = "x".repeat(513);
        assert!(matches!(c.validate(), Err(ConfigurationError::TopicTooLong)));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut c = base();
        c.max_scene_concurrency = 0;
        assert!(matches!(c.validate(), Err(ConfigurationError::InvalidConcurrency)));
    }

    #[test]
    fn accepts_valid_configuration() {
        assert!(base().validate().is_ok());
    }
}
