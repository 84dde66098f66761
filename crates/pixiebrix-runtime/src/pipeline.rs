//! Pipeline definitions.

use pixiebrix_protocols::{FrameId, TabId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a step runs, relative to the context running the pipeline.
///
/// The "current tab" is the tab the run is bound to with
/// [`PipelineRun::with_tab`](crate::PipelineRun::with_tab), or else the tab
/// the running context lives in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StepTarget {
    /// The context running the pipeline.
    #[default]
    #[serde(rename = "self")]
    This,
    /// Top-level frame of the current tab.
    Top,
    /// A specific frame of the current tab.
    Frame(FrameId),
    /// Every frame of the current tab.
    Broadcast,
    Background,
    /// An extension page by name.
    Page(String),
    /// One frame of a given tab. A missing frame id means the top frame.
    Tab {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame_id: Option<FrameId>,
    },
    /// Every frame of a given tab.
    BroadcastTab(TabId),
}

impl StepTarget {
    pub fn is_local(&self) -> bool {
        matches!(self, StepTarget::This)
    }
}

/// One brick invocation inside a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrickStep {
    /// Registry id of the brick.
    pub id: String,

    /// Input template rendered against the run context.
    #[serde(default)]
    pub config: Value,

    /// Context key the output is stored under, without the `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,

    #[serde(default)]
    pub window: StepTarget,

    /// Skip the step unless this renders to a truthy value.
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,

    /// Record a failure and keep going instead of failing the run.
    #[serde(default)]
    pub best_effort: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BrickStep {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: Value::Object(Default::default()),
            output_key: None,
            window: StepTarget::This,
            condition: None,
            best_effort: false,
            label: None,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_window(mut self, window: StepTarget) -> Self {
        self.window = window;
        self
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered sequence of steps, run strictly one after another.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    steps: Vec<BrickStep>,
}

impl Pipeline {
    pub fn new(steps: Vec<BrickStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[BrickStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl From<Vec<BrickStep>> for Pipeline {
    fn from(steps: Vec<BrickStep>) -> Self {
        Self::new(steps)
    }
}
