//! Brick definition types.

use serde::{Deserialize, Serialize};

/// Capability a brick provides. The executor only ever calls `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickKind {
    Reader,
    #[default]
    Transformer,
    Effect,
    Renderer,
}

/// Static description of a brick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickDefinition {
    /// Registry id, e.g. `@pixiebrix/jquery-reader`.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub kind: BrickKind,

    /// JSON Schema the rendered input must satisfy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

impl BrickDefinition {
    /// Create a new brick definition.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: BrickKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            input_schema: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the input schema.
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_builder() {
        let def = BrickDefinition::new("@pixiebrix/jquery-reader", "jQuery Reader", BrickKind::Reader)
            .with_description("Read data from the page")
            .with_input_schema(serde_json::json!({"type": "object"}));

        assert_eq!(def.id, "@pixiebrix/jquery-reader");
        assert_eq!(def.kind, BrickKind::Reader);
        assert!(def.input_schema.is_some());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&BrickKind::Effect).unwrap();
        assert_eq!(json, "\"effect\"");
        assert_eq!(BrickKind::default(), BrickKind::Transformer);
    }
}
