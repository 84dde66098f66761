//! Run handles, states and summaries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pixiebrix_protocols::{SerializedError, TabId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunState {
    Pending,
    Running { step_index: usize },
    Succeeded { output: Value },
    Failed { step_index: Option<usize>, error: SerializedError },
    Cancelled,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded { .. } | RunState::Failed { .. } | RunState::Cancelled
        )
    }
}

/// How a step that did not fail the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    Succeeded,
    /// The `if` condition was falsy.
    Skipped,
    /// The brick reported it cannot run on the page.
    Unavailable,
    /// A best-effort step failed; its output is null.
    FailedIgnored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub index: usize,
    pub brick_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

impl StepRecord {
    pub(crate) fn new(index: usize, brick_id: &str, label: Option<&str>, status: StepStatus) -> Self {
        Self {
            index,
            brick_id: brick_id.to_string(),
            label: label.map(str::to_string),
            status,
            duration_ms: 0,
            error: None,
        }
    }

    pub(crate) fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub(crate) fn with_error(mut self, error: SerializedError) -> Self {
        self.error = Some(error);
        self
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    /// Output of the last step that produced one, `null` if none did.
    pub output: Value,
    /// Final context, with `@`-prefixed keys.
    pub context: Value,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Handle to a run: observe its state or cancel it.
#[derive(Clone)]
pub struct PipelineRun {
    id: String,
    state: Arc<watch::Sender<RunState>>,
    cancel: CancellationToken,
    tab_id: Option<TabId>,
}

impl PipelineRun {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(RunState::Pending);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            tab_id: None,
        }
    }

    /// Bind the run to a tab. Steps aimed at `top`, `frame` or `broadcast`
    /// address this tab, even when the pipeline runs outside of any tab.
    pub fn with_tab(mut self, tab_id: TabId) -> Self {
        self.tab_id = Some(tab_id);
        self
    }

    pub fn tab_id(&self) -> Option<TabId> {
        self.tab_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Stop scheduling steps. The in-flight step's result is discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn set_state(&self, state: RunState) {
        self.state.send_replace(state);
    }
}

impl std::fmt::Debug for PipelineRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRun")
            .field("id", &self.id)
            .field("tab_id", &self.tab_id)
            .field("state", &*self.state.borrow())
            .finish()
    }
}
