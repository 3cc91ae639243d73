//! `StageExecutor` is a capability set — `{stage, timeout, run}` — rather
//! than a class hierarchy; `pipeline()` composes the six stages as a
//! data-driven list the orchestrator walks in order.

pub mod code_generator;
pub mod combiner;
pub mod planner;
pub mod renderer;
pub mod scenario;
pub mod types;
pub mod uploader;

use std::time::Duration;

use async_trait::async_trait;
use scenecraft_models::{Job, Stage};
use scenecraft_resilience::CircuitError;
use tokio::sync::watch;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use types::PipelineArtifacts;

#[async_trait]
pub trait StageExecutor: Send + Sync {
    fn stage(&self) -> Stage;

    /// Wall-clock bound for this stage given the current job and the
    /// artifacts accumulated so far (Rendering's bound depends on the
    /// scene count the Planner produced).
    fn timeout(&self, ctx: &WorkerContext, artifacts: &PipelineArtifacts) -> Duration;

    async fn run(
        &self,
        job: &Job,
        ctx: &WorkerContext,
        artifacts: &mut PipelineArtifacts,
        cancel: &mut watch::Receiver<bool>,
    ) -> WorkerResult<()>;
}

/// The canonical, data-driven stage list (spec §4.9/§9): `Initializing`
/// and `Completed` are orchestrator-owned bookends, not executors.
pub fn pipeline() -> Vec<Box<dyn StageExecutor>> {
    vec![
        Box::new(planner::PlannerStage),
        Box::new(scenario::ScenarioBuilderStage),
        Box::new(code_generator::CodeGeneratorStage),
        Box::new(renderer::RendererStage),
        Box::new(combiner::CombinerStage),
        Box::new(uploader::UploaderStage),
    ]
}

/// Flattens a circuit breaker's rejection/timeout/inner-error cases into
/// the single `WorkerError` taxonomy used above the breaker.
pub(crate) fn from_circuit_error<E>(err: CircuitError<E>) -> WorkerError
where
    WorkerError: From<E>,
{
    match err {
        CircuitError::Open { dependency, retry_after } => WorkerError::CircuitOpen { dependency, retry_after },
        CircuitError::Timeout { dependency, timeout } => WorkerError::DependencyTimeout { dependency, timeout },
        CircuitError::Inner(e) => WorkerError::from(e),
    }
}
