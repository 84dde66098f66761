//! Pipeline run errors.

use thiserror::Error;

use super::brick::BrickError;
use super::serialized::{SerializeError, SerializedError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run was aborted externally.
    #[error("Pipeline run was cancelled")]
    Cancelled,

    #[error("Step {step_index} ({brick_id}) failed: {source}")]
    StepFailed {
        step_index: usize,
        brick_id: String,
        source: BrickError,
    },

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),
}

impl PipelineError {
    /// Index of the step that failed, if the run reached one.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::StepFailed { step_index, .. } => Some(*step_index),
            _ => None,
        }
    }
}

impl SerializeError for PipelineError {
    fn error_name(&self) -> &'static str {
        match self {
            Self::Cancelled => "CancelledError",
            Self::StepFailed { source, .. } => source.error_name(),
            Self::InvalidPipeline(_) => "InvalidPipelineError",
        }
    }

    fn to_serialized(&self) -> SerializedError {
        match self {
            // Keep the brick's own error class so callers see e.g. PropError.
            Self::StepFailed {
                step_index,
                brick_id,
                source,
            } => source
                .to_serialized()
                .with_field("stepIndex", *step_index)
                .with_field("brickId", brick_id.clone()),
            _ => SerializedError::new(self.error_name(), self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled() {
        let err = PipelineError::Cancelled;
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(err.to_serialized().name, "CancelledError");
        assert_eq!(err.step_index(), None);
    }

    #[test]
    fn test_step_failed_serialization() {
        let err = PipelineError::StepFailed {
            step_index: 1,
            brick_id: "@pixiebrix/jquery-reader".to_string(),
            source: BrickError::prop("@pixiebrix/jquery-reader", "selector", "bad selector"),
        };
        assert_eq!(err.step_index(), Some(1));
        assert!(err.to_string().contains("Step 1"));

        let serialized = err.to_serialized();
        assert_eq!(serialized.name, "PropError");
        assert_eq!(serialized.field("stepIndex"), Some(&serde_json::json!(1)));
        assert_eq!(serialized.field_str("brickId"), Some("@pixiebrix/jquery-reader"));
    }

    #[test]
    fn test_invalid_pipeline() {
        let err = PipelineError::InvalidPipeline("forward reference to @b".to_string());
        assert!(err.to_string().contains("forward reference"));
        assert_eq!(err.to_serialized().name, "InvalidPipelineError");
    }
}
