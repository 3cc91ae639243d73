#![deny(unreachable_patterns)]
//! The pipeline worker: dequeues jobs and runs them through the
//! Planner → ScenarioBuilder → CodeGenerator → Renderer → Combiner →
//! Uploader stage sequence.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod pool;
pub mod stages;
pub mod subprocess;

pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use orchestrator::{JobOutcome, PipelineOrchestrator};
pub use pool::WorkerPool;
