//! CodeGenerator stage (spec §4.9): produces one animation program per
//! scene, optionally augmented by a retrieval index, with a single
//! repair round on a syntactic-validation failure.

use std::time::Duration;

use async_trait::async_trait;
use scenecraft_llm::ModelFamily;
use scenecraft_models::{Job, Stage};
use scenecraft_resilience::CircuitBreakerConfig;
use tokio::sync::{watch, Semaphore};

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

use super::types::{GeneratedProgram, ImplementationPlan, PipelineArtifacts, RagIndex};
use super::{from_circuit_error, StageExecutor};

pub struct CodeGeneratorStage;

#[async_trait]
impl StageExecutor for CodeGeneratorStage {
    fn stage(&self) -> Stage {
        Stage::CodeGeneration
    }

    fn timeout(&self, ctx: &WorkerContext, _artifacts: &PipelineArtifacts) -> Duration {
        ctx.config.stage_timeout_code_generation
    }

    async fn run(
        &self,
        job: &Job,
        ctx: &WorkerContext,
        artifacts: &mut PipelineArtifacts,
        _cancel: &mut watch::Receiver<bool>,
    ) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.id, self.stage().as_str());
        let concurrency = job.configuration.max_scene_concurrency.max(1) as usize;
        let scene_semaphore = std::sync::Arc::new(Semaphore::new(concurrency));
        let scene_breaker = ctx.circuit_breakers.get_or_create("llm_scene", CircuitBreakerConfig::default());
        let helper_breaker = ctx.circuit_breakers.get_or_create("llm_helper", CircuitBreakerConfig::default());
        let job_dir = ctx.config.work_dir.join(job.id.to_string());
        tokio::fs::create_dir_all(&job_dir).await?;

        let mut tasks = tokio::task::JoinSet::new();
        for scenario in artifacts.scenarios.clone() {
            let scene_semaphore = scene_semaphore.clone();
            let scene_breaker = scene_breaker.clone();
            let helper_breaker = helper_breaker.clone();
            let llm = ctx.llm.clone();
            let llm_semaphore = ctx.llm_semaphore.clone();
            let rag = ctx.rag.clone();
            let use_rag = job.configuration.use_rag;
            let model_scene = job.configuration.model_scene.clone();
            let model_helper = job.configuration.model_helper.clone();
            let job_dir = job_dir.clone();
            let stage = self.stage();

            tasks.spawn(async move {
                let _scene_permit = scene_semaphore.acquire_owned().await.map_err(|_| WorkerError::Cancelled)?;

                let snippets = if use_rag { rag.query(&scenario.narration, 3) } else { Vec::new() };
                let prompt = build_prompt(&scenario, &snippets);

                let source = {
                    let _llm_permit = llm_semaphore.acquire().await.map_err(|_| WorkerError::Cancelled)?;
                    match &model_scene {
                        Some(model) => scene_breaker.call(|| async { llm.generate_json(model, &prompt).await }).await,
                        None => scene_breaker.call(|| async { llm.generate_with_fallback(ModelFamily::Scene, &prompt).await }).await,
                    }
                    .map_err(from_circuit_error)?
                };

                let source = if validate_syntax(&source).is_ok() {
                    source
                } else {
                    let repair_prompt = format!(
                        "The following animation program has unbalanced brackets/parentheses and is invalid:\n\n{source}\n\n\
                         Return a corrected version only, no commentary."
                    );
                    let _llm_permit = llm_semaphore.acquire().await.map_err(|_| WorkerError::Cancelled)?;
                    let repaired = match &model_helper {
                        Some(model) => helper_breaker.call(|| async { llm.generate_json(model, &repair_prompt).await }).await,
                        None => helper_breaker.call(|| async { llm.generate_with_fallback(ModelFamily::Helper, &repair_prompt).await }).await,
                    }
                    .map_err(from_circuit_error)?;
                    validate_syntax(&repaired)
                        .map_err(|e| WorkerError::validation(stage, format!("scene {} program invalid after repair: {e}", scenario.scene_index)))?;
                    repaired
                };

                let program_path = job_dir.join(format!("scene_{:03}.py", scenario.scene_index));
                tokio::fs::write(&program_path, &source).await?;

                Ok::<_, WorkerError>(GeneratedProgram { scene_index: scenario.scene_index, program_path })
            });
        }

        let mut programs = Vec::with_capacity(artifacts.scenarios.len());
        while let Some(joined) = tasks.join_next().await {
            let program = joined.map_err(|e| WorkerError::validation(self.stage(), format!("code generation task did not complete: {e}")))??;
            programs.push(program);
        }
        programs.sort_by_key(|p| p.scene_index);

        logger.log_completion(&format!("{} programs generated", programs.len()));
        artifacts.programs = programs;
        Ok(())
    }
}

fn build_prompt(scenario: &ImplementationPlan, snippets: &[super::types::RagSnippet]) -> String {
    let mut prompt = format!(
        "Shot list: {}\nAssets: {}\nNarration: {}\n\n\
         Write a self-contained animation program for this scene. Respond with the program \
         source only, no commentary or markdown fences.",
        scenario.shot_list.join("; "),
        scenario.assets.join(", "),
        scenario.narration,
    );
    if !snippets.is_empty() {
        prompt.push_str("\n\nRelevant reference snippets:\n");
        for snippet in snippets {
            prompt.push_str(&snippet.text);
            prompt.push('\n');
        }
    }
    prompt
}

/// Deterministic syntactic pre-check: balanced brackets/parens/braces and
/// non-empty body. Not a full parse — the renderer subprocess is the
/// final authority on whether a program actually runs.
fn validate_syntax(source: &str) -> Result<(), String> {
    if source.trim().is_empty() {
        return Err("empty program".to_string());
    }
    let mut stack = Vec::new();
    for c in source.chars() {
        match c {
            '(' | '[' | '{' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return Err("unbalanced parentheses".to_string());
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return Err("unbalanced brackets".to_string());
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return Err("unbalanced braces".to_string());
                }
            }
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err("unclosed delimiter".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_program() {
        assert!(validate_syntax("").is_err());
    }

    #[test]
    fn rejects_unbalanced_delimiters() {
        assert!(validate_syntax("def scene(:\n    pass").is_err());
    }

    #[test]
    fn accepts_balanced_program() {
        assert!(validate_syntax("def scene():\n    shapes = [circle(), square()]\n    return shapes").is_ok());
    }
}
