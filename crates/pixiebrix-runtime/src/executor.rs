//! Pipeline executor - runs brick steps in order and threads their outputs.

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use pixiebrix_messenger::{Method, Realm};
use pixiebrix_protocols::{
    BrickError, ElementRoot, Endpoint, LogContext, Logger, MessengerError, PipelineError,
    SerializeError, TOP_FRAME_ID, TabId, Target,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::context::RunContext;
use crate::pipeline::{BrickStep, Pipeline, StepTarget};
use crate::run::{PipelineRun, RunState, RunSummary, StepRecord, StepStatus};
use crate::runner::{BrickRunner, RunBrick, RunBrickRequest};
use crate::template::{is_truthy, render};
use crate::validation::validate_pipeline;

/// Decides whether a step with an `if` expression runs.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        condition: &Value,
        ctx: &RunContext,
        block_id: &str,
    ) -> Result<bool, BrickError>;
}

/// Renders the condition as a template and tests its truthiness.
pub struct TemplateConditionEvaluator;

#[async_trait]
impl ConditionEvaluator for TemplateConditionEvaluator {
    async fn evaluate(
        &self,
        condition: &Value,
        ctx: &RunContext,
        block_id: &str,
    ) -> Result<bool, BrickError> {
        render(condition, ctx, block_id).map(|value| is_truthy(&value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorConfig {
    /// Fail the run on an unavailable brick instead of skipping the step.
    pub strict_availability: bool,
}

enum StepOutcome {
    Output(Value),
    Skipped,
}

enum Destination {
    Local,
    Remote(Target),
    Broadcast(TabId),
}

/// Runs pipelines on behalf of one context.
pub struct PipelineExecutor {
    realm: Arc<Realm>,
    runner: Arc<BrickRunner>,
    logger: Arc<dyn Logger>,
    condition_evaluator: Arc<dyn ConditionEvaluator>,
    config: ExecutorConfig,
}

impl PipelineExecutor {
    pub fn new(realm: Arc<Realm>, runner: Arc<BrickRunner>, logger: Arc<dyn Logger>) -> Self {
        Self {
            realm,
            runner,
            logger,
            condition_evaluator: Arc::new(TemplateConditionEvaluator),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a custom condition evaluator.
    pub fn with_condition_evaluator(mut self, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        self.condition_evaluator = evaluator;
        self
    }

    pub fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    /// A pending run handle, so the caller can subscribe or cancel before
    /// calling [`PipelineExecutor::execute`].
    pub fn prepare(&self) -> PipelineRun {
        PipelineRun::new()
    }

    /// Prepare and execute in one go.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        input: Value,
        options: Value,
    ) -> Result<RunSummary, PipelineError> {
        let run = self.prepare();
        self.execute(&run, pipeline, input, options, None).await
    }

    /// Execute `pipeline` under `run`.
    ///
    /// Steps run strictly one after another. The first step failure that is
    /// not best-effort ends the run with [`PipelineError::StepFailed`].
    /// Cancelling `run` ends it with [`PipelineError::Cancelled`], dropping
    /// whatever the current step was doing.
    pub async fn execute(
        &self,
        run: &PipelineRun,
        pipeline: &Pipeline,
        input: Value,
        options: Value,
        root: Option<ElementRoot>,
    ) -> Result<RunSummary, PipelineError> {
        if let Err(e) = validate_pipeline(pipeline) {
            warn!(run_id = %run.id(), "Rejected pipeline: {}", e);
            run.set_state(RunState::Failed {
                step_index: None,
                error: e.to_serialized(),
            });
            return Err(e);
        }

        info!(
            run_id = %run.id(),
            endpoint = %self.realm.endpoint(),
            "Starting pipeline run with {} steps",
            pipeline.len()
        );

        let started_at = Utc::now();
        let mut ctx = RunContext::new(input, options);
        let mut output = Value::Null;
        let mut steps = Vec::with_capacity(pipeline.len());

        for (index, step) in pipeline.steps().iter().enumerate() {
            if run.is_cancelled() {
                return Err(self.cancelled(run));
            }
            run.set_state(RunState::Running { step_index: index });

            let start = Instant::now();
            let result = tokio::select! {
                biased;
                _ = run.token().cancelled() => return Err(self.cancelled(run)),
                result = self.execute_step(run, index, step, &ctx, root.clone()) => result,
            };
            let record = |status| {
                StepRecord::new(index, &step.id, step.label.as_deref(), status)
                    .with_duration(start.elapsed())
            };

            match result {
                Ok(StepOutcome::Output(value)) => {
                    debug!(run_id = %run.id(), step = index, brick = %step.id, "Step succeeded");
                    if let Some(key) = &step.output_key {
                        ctx = ctx.with_output(key, value.clone());
                    }
                    output = value;
                    steps.push(record(StepStatus::Succeeded));
                }
                Ok(StepOutcome::Skipped) => {
                    debug!(run_id = %run.id(), step = index, brick = %step.id, "Step skipped by condition");
                    steps.push(record(StepStatus::Skipped));
                }
                Err(BrickError::Unavailable(_)) if !self.config.strict_availability => {
                    debug!(run_id = %run.id(), step = index, brick = %step.id, "Brick not available, skipping");
                    steps.push(record(StepStatus::Unavailable));
                }
                Err(e) if step.best_effort => {
                    let serialized = e.to_serialized();
                    self.logger.warn(
                        "Best-effort step failed",
                        &self.log_context(run, index, step).with_error(serialized.clone()),
                    );
                    if let Some(key) = &step.output_key {
                        ctx = ctx.with_output(key, Value::Null);
                    }
                    steps.push(record(StepStatus::FailedIgnored).with_error(serialized));
                }
                Err(e) => {
                    let failure = PipelineError::StepFailed {
                        step_index: index,
                        brick_id: step.id.clone(),
                        source: e,
                    };
                    let serialized = failure.to_serialized();
                    error!(run_id = %run.id(), "Pipeline run failed: {}", failure);
                    self.logger.error(
                        "Step failed",
                        &self.log_context(run, index, step).with_error(serialized.clone()),
                    );
                    run.set_state(RunState::Failed {
                        step_index: Some(index),
                        error: serialized,
                    });
                    return Err(failure);
                }
            }
        }

        info!(run_id = %run.id(), "Pipeline run succeeded");
        run.set_state(RunState::Succeeded {
            output: output.clone(),
        });

        Ok(RunSummary {
            run_id: run.id().to_string(),
            output,
            context: ctx.to_value(),
            steps,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn execute_step(
        &self,
        run: &PipelineRun,
        index: usize,
        step: &BrickStep,
        ctx: &RunContext,
        root: Option<ElementRoot>,
    ) -> Result<StepOutcome, BrickError> {
        if let Some(condition) = &step.condition {
            if !self
                .condition_evaluator
                .evaluate(condition, ctx, &step.id)
                .await?
            {
                return Ok(StepOutcome::Skipped);
            }
        }

        let run_id = run.id();
        let request = RunBrickRequest {
            block_id: step.id.clone(),
            input: render(&step.config, ctx, &step.id)?,
            ctx: ctx.to_value(),
            run_id: run_id.to_string(),
            step_index: index,
        };

        let output = match self.destination(&step.window, run.tab_id())? {
            Destination::Local => self.runner.run(request, root).await?,
            Destination::Remote(target) => {
                debug!(run_id, step = index, %target, "Running brick remotely");
                self.realm.method::<RunBrick>(target).call(request).await?
            }
            Destination::Broadcast(tab_id) => {
                let outcomes = self.realm.broadcast::<RunBrick>(tab_id).call(request).await?;
                let mut outputs = Vec::with_capacity(outcomes.len());
                for outcome in outcomes {
                    match outcome.result {
                        Ok(value) => outputs.push(value),
                        Err(e) => self.logger.warn(
                            "Broadcast step failed in one frame",
                            &LogContext::new()
                                .with_run(run_id)
                                .with_block(step.id.as_str())
                                .with_step(index)
                                .with_endpoint(&outcome.endpoint)
                                .with_error(e.to_serialized()),
                        ),
                    }
                }
                Value::Array(outputs)
            }
        };

        Ok(StepOutcome::Output(output))
    }

    fn destination(
        &self,
        window: &StepTarget,
        run_tab: Option<TabId>,
    ) -> Result<Destination, BrickError> {
        let tab_id = || {
            run_tab
                .or_else(|| self.realm.endpoint().tab_id())
                .ok_or_else(|| {
                    BrickError::Messenger(MessengerError::InvalidTarget {
                        method: RunBrick::NAME.to_string(),
                        reason: format!(
                            "{} is not inside a tab and the run is not bound to one",
                            self.realm.endpoint()
                        ),
                    })
                })
        };

        let target = match window {
            StepTarget::This => return Ok(Destination::Local),
            StepTarget::Broadcast => return Ok(Destination::Broadcast(tab_id()?)),
            StepTarget::BroadcastTab(tab_id) => return Ok(Destination::Broadcast(*tab_id)),
            StepTarget::Top => Target::TopFrameOfTab { tab_id: tab_id()? },
            StepTarget::Frame(frame_id) => Target::tab(tab_id()?, *frame_id),
            StepTarget::Tab { tab_id, frame_id } => Target::Tab {
                tab_id: *tab_id,
                frame_id: *frame_id,
            },
            StepTarget::Background => Target::Background,
            StepTarget::Page(name) => Target::page(name.clone()),
        };

        // A hop back into this context keeps the caller's root element.
        if single_endpoint(&target).as_ref() == Some(self.realm.endpoint()) {
            return Ok(Destination::Local);
        }
        Ok(Destination::Remote(target))
    }

    fn cancelled(&self, run: &PipelineRun) -> PipelineError {
        info!(run_id = %run.id(), "Pipeline run cancelled");
        run.set_state(RunState::Cancelled);
        PipelineError::Cancelled
    }

    fn log_context(&self, run: &PipelineRun, index: usize, step: &BrickStep) -> LogContext {
        LogContext::new()
            .with_run(run.id())
            .with_block(step.id.as_str())
            .with_step(index)
            .with_endpoint(self.realm.endpoint())
    }
}

/// The one endpoint a non-broadcast target names.
fn single_endpoint(target: &Target) -> Option<Endpoint> {
    match target {
        Target::Background => Some(Endpoint::Background),
        Target::Tab { tab_id, frame_id } => {
            Some(Endpoint::frame(*tab_id, frame_id.unwrap_or(TOP_FRAME_ID)))
        }
        Target::TopFrameOfTab { tab_id } => Some(Endpoint::frame(*tab_id, TOP_FRAME_ID)),
        Target::Page { name } => Some(Endpoint::page(name.clone())),
        Target::This | Target::BroadcastToTab { .. } => None,
    }
}
