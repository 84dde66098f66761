//! Static pipeline checks and brick input validation.

use std::collections::HashSet;

use pixiebrix_protocols::{BrickError, PipelineError};
use serde_json::Value;

use crate::context::{INPUT_KEY, OPTIONS_KEY};
use crate::pipeline::Pipeline;
use crate::template::references;

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check output keys and context references before anything runs.
///
/// Output keys must be unique identifiers that do not shadow `input` or
/// `options`. Every `@key` a step reads must be `@input`, `@options`, or
/// the output key of an earlier step.
pub fn validate_pipeline(pipeline: &Pipeline) -> Result<(), PipelineError> {
    let mut available: HashSet<&str> = HashSet::from([INPUT_KEY, OPTIONS_KEY]);

    for (index, step) in pipeline.steps().iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(PipelineError::InvalidPipeline(format!(
                "step {} has no brick id",
                index
            )));
        }

        let mut read = references(&step.config);
        if let Some(condition) = &step.condition {
            read.extend(references(condition));
        }
        if let Some(key) = read.iter().find(|key| !available.contains(key.as_str())) {
            return Err(PipelineError::InvalidPipeline(format!(
                "step {} ({}) reads @{} before it is set",
                index, step.id, key
            )));
        }

        if let Some(key) = &step.output_key {
            if !is_identifier(key) {
                return Err(PipelineError::InvalidPipeline(format!(
                    "step {} ({}) has invalid output key {:?}",
                    index, step.id, key
                )));
            }
            if key == INPUT_KEY || key == OPTIONS_KEY {
                return Err(PipelineError::InvalidPipeline(format!(
                    "step {} ({}) output key @{} is reserved",
                    index, step.id, key
                )));
            }
            if !available.insert(key.as_str()) {
                return Err(PipelineError::InvalidPipeline(format!(
                    "step {} ({}) reuses output key @{}",
                    index, step.id, key
                )));
            }
        }
    }

    Ok(())
}

/// Validate rendered input against a brick's JSON schema.
pub fn validate_input(block_id: &str, schema: &Value, input: &Value) -> Result<(), BrickError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        BrickError::validation(block_id, format!("Invalid input schema: {}", e))
    })?;

    let problems: Vec<String> = validator
        .iter_errors(input)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{}: {}", path, error)
            }
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(BrickError::validation(
            block_id,
            format!("Invalid input: {}", problems.join("; ")),
        ))
    }
}
