//! # PixieBrix Runtime
//!
//! Runs brick pipelines inside one context.
//!
//! A [`Pipeline`] is an ordered list of [`BrickStep`]s. The
//! [`PipelineExecutor`] renders each step's configuration against the
//! [`RunContext`], runs the brick, and stores the output under the step's
//! output key for later steps. Steps that declare another `window` are run
//! through the messenger by the [`RunBrick`] method, which
//! [`register_brick_runner`] serves in every context that hosts bricks.
//!
//! ```ignore
//! let executor = PipelineExecutor::new(realm, runner, Arc::new(TracingLogger));
//! let summary = executor.run(&pipeline, json!({"url": url}), json!({})).await?;
//! ```

pub mod context;
pub mod executor;
pub mod logger;
pub mod pipeline;
pub mod run;
pub mod runner;
pub mod template;
pub mod validation;

pub use context::RunContext;
pub use executor::{ConditionEvaluator, ExecutorConfig, PipelineExecutor, TemplateConditionEvaluator};
pub use logger::TracingLogger;
pub use pipeline::{BrickStep, Pipeline, StepTarget};
pub use run::{PipelineRun, RunState, RunSummary, StepRecord, StepStatus};
pub use runner::{BrickRunner, RunBrick, RunBrickRequest, register_brick_runner};
pub use template::{is_truthy, render};
pub use validation::{validate_input, validate_pipeline};
