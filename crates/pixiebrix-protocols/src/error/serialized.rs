//! Plain, transport-safe representation of errors.
//!
//! Errors cross realm boundaries as [`SerializedError`] values. Typed errors
//! implement [`SerializeError`] to produce one, and provide constructors
//! that rebuild the typed error from the `name` field on the other side.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Error object as it travels inside a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedError {
    /// Error class name, e.g. `PropError` or `TargetNotFoundError`.
    pub name: String,

    /// Human readable message.
    pub message: String,

    /// Where the error was raised, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// The underlying error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<SerializedError>>,

    /// Custom fields such as `blockId` or `prop`.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl SerializedError {
    /// Create a new serialized error.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            cause: None,
            data: Map::new(),
        }
    }

    /// Serialize an arbitrary error, following its `source()` chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut serialized = Self::new("Error", error.to_string());
        if let Some(source) = error.source() {
            serialized.cause = Some(Box::new(Self::from_source(source)));
        }
        serialized
    }

    fn from_source(error: &(dyn std::error::Error + 'static)) -> Self {
        // Already-serialized causes keep their name and fields.
        if let Some(serialized) = error.downcast_ref::<SerializedError>() {
            return serialized.clone();
        }
        // Typed errors hold their causes boxed.
        if let Some(serialized) = error.downcast_ref::<Box<SerializedError>>() {
            return (**serialized).clone();
        }
        Self::from_error(error)
    }

    /// Set the cause.
    pub fn with_cause(mut self, cause: SerializedError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Set the stack description.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach a custom field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Get a custom field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a custom string field.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Iterate over the cause chain, starting with the direct cause.
    pub fn causes(&self) -> impl Iterator<Item = &SerializedError> {
        std::iter::successors(self.cause.as_deref(), |e| e.cause.as_deref())
    }
}

impl fmt::Display for SerializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for SerializedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Typed errors that know how to cross a realm boundary.
pub trait SerializeError: std::error::Error {
    /// Class name used as the `name` field.
    fn error_name(&self) -> &'static str;

    /// Produce the transport-safe form.
    fn to_serialized(&self) -> SerializedError;
}

/// Serialize the `source()` of a typed error as a cause.
pub(crate) fn serialized_cause(
    source: Option<&(dyn std::error::Error + 'static)>,
) -> Option<Box<SerializedError>> {
    source.map(|s| Box::new(SerializedError::from_source(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_error_json_shape() {
        let error = SerializedError::new("PropError", "Invalid selector")
            .with_field("blockId", "@pixiebrix/jquery-reader")
            .with_field("prop", "selector");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["name"], "PropError");
        assert_eq!(json["message"], "Invalid selector");
        assert_eq!(json["blockId"], "@pixiebrix/jquery-reader");
        assert_eq!(json["prop"], "selector");
        assert!(json.get("cause").is_none());
    }

    #[test]
    fn test_serialized_error_cause_chain() {
        let error = SerializedError::new("Error", "outer")
            .with_cause(SerializedError::new("Error", "middle").with_cause(SerializedError::new(
                "TypeError",
                "inner",
            )));

        let messages: Vec<_> = error.causes().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["middle", "inner"]);
    }

    #[test]
    fn test_source_follows_cause() {
        use std::error::Error;

        let error = SerializedError::new("Error", "outer")
            .with_cause(SerializedError::new("Error", "inner"));
        let source = error.source().unwrap();
        assert_eq!(source.to_string(), "Error: inner");
    }

    #[test]
    fn test_from_error_keeps_serialized_sources() {
        #[derive(Debug, thiserror::Error)]
        #[error("wrapper")]
        struct Wrapper(#[source] SerializedError);

        let wrapped = Wrapper(SerializedError::new("PropError", "bad").with_field("prop", "x"));
        let serialized = SerializedError::from_error(&wrapped);

        assert_eq!(serialized.name, "Error");
        assert_eq!(serialized.message, "wrapper");
        let cause = serialized.cause.unwrap();
        assert_eq!(cause.name, "PropError");
        assert_eq!(cause.field_str("prop"), Some("x"));
    }

    #[test]
    fn test_display() {
        let error = SerializedError::new("ValidationError", "missing field");
        assert_eq!(error.to_string(), "ValidationError: missing field");
    }
}
