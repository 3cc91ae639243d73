//! Provider-agnostic client for the generative text models used by the
//! Planner, ScenarioBuilder, CodeGenerator, and Helper stages. The
//! provider itself is treated as an opaque request/response endpoint;
//! circuit-breaking and retry policy live at the stage executor layer.

pub mod client;
pub mod error;
pub mod model_family;

pub use client::{LlmClient, LlmConfig};
pub use error::{LlmError, LlmResult};
pub use model_family::ModelFamily;
