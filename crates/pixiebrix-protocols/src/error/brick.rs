//! Brick execution errors.

use thiserror::Error;

use super::messenger::MessengerError;
use super::serialized::{SerializeError, SerializedError, serialized_cause};

#[derive(Debug, Error)]
pub enum BrickError {
    /// A configured property of the brick is invalid.
    #[error("{message}")]
    Prop {
        block_id: String,
        prop: String,
        message: String,
        #[source]
        cause: Option<Box<SerializedError>>,
    },

    /// The brick input failed validation.
    #[error("{message}")]
    Validation {
        block_id: String,
        message: String,
        #[source]
        cause: Option<Box<SerializedError>>,
    },

    #[error("Brick not found: {0}")]
    NotFound(String),

    #[error("Brick {0} is not available on this page")]
    Unavailable(String),

    /// Business-logic failure raised by the brick itself.
    #[error("{message}")]
    Business {
        name: String,
        message: String,
        block_id: Option<String>,
        stack: Option<String>,
        #[source]
        cause: Option<Box<SerializedError>>,
    },

    /// Messaging failed while reaching the context that runs the brick.
    #[error(transparent)]
    Messenger(MessengerError),
}

const PROP: &str = "PropError";
const VALIDATION: &str = "ValidationError";
const NOT_FOUND: &str = "NotFoundError";
const UNAVAILABLE: &str = "BrickUnavailableError";
const BUSINESS: &str = "BusinessError";

impl BrickError {
    pub fn prop(
        block_id: impl Into<String>,
        prop: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Prop {
            block_id: block_id.into(),
            prop: prop.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn validation(block_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            block_id: block_id.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self::Business {
            name: BUSINESS.to_string(),
            message: message.into(),
            block_id: None,
            stack: None,
            cause: None,
        }
    }

    /// Attach a cause to the variants that carry one.
    pub fn with_cause(mut self, error: SerializedError) -> Self {
        match &mut self {
            Self::Prop { cause, .. }
            | Self::Validation { cause, .. }
            | Self::Business { cause, .. } => *cause = Some(Box::new(error)),
            _ => {}
        }
        self
    }

    /// Attribute a business error to `id` unless it already names a brick.
    pub fn with_block_id(mut self, id: &str) -> Self {
        if let Self::Business { block_id, .. } = &mut self {
            block_id.get_or_insert_with(|| id.to_string());
        }
        self
    }

    /// Brick the error is attributed to, if known.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::Prop { block_id, .. } | Self::Validation { block_id, .. } => Some(block_id),
            Self::NotFound(id) | Self::Unavailable(id) => Some(id),
            Self::Business { block_id, .. } => block_id.as_deref(),
            Self::Messenger(_) => None,
        }
    }
}

impl SerializeError for BrickError {
    fn error_name(&self) -> &'static str {
        match self {
            Self::Prop { .. } => PROP,
            Self::Validation { .. } => VALIDATION,
            Self::NotFound(_) => NOT_FOUND,
            Self::Unavailable(_) => UNAVAILABLE,
            Self::Business { .. } => BUSINESS,
            Self::Messenger(e) => e.error_name(),
        }
    }

    fn to_serialized(&self) -> SerializedError {
        let mut serialized = SerializedError::new(self.error_name(), self.to_string());
        serialized.cause = serialized_cause(std::error::Error::source(self));
        match self {
            Self::Prop { block_id, prop, .. } => serialized
                .with_field("blockId", block_id.clone())
                .with_field("prop", prop.clone()),
            Self::Validation { block_id, .. } => serialized.with_field("blockId", block_id.clone()),
            Self::NotFound(id) | Self::Unavailable(id) => serialized.with_field("blockId", id.clone()),
            Self::Business {
                name,
                block_id,
                stack,
                ..
            } => {
                serialized.name = name.clone();
                serialized.stack = stack.clone();
                match block_id {
                    Some(id) => serialized.with_field("blockId", id.clone()),
                    None => serialized,
                }
            }
            Self::Messenger(e) => e.to_serialized(),
        }
    }
}

impl From<SerializedError> for BrickError {
    fn from(error: SerializedError) -> Self {
        let block_id = error.field_str("blockId").map(str::to_string);
        let name = error.name.clone();
        match name.as_str() {
            PROP => Self::Prop {
                block_id: block_id.unwrap_or_default(),
                prop: error.field_str("prop").unwrap_or_default().to_string(),
                message: error.message,
                cause: error.cause,
            },
            VALIDATION => Self::Validation {
                block_id: block_id.unwrap_or_default(),
                message: error.message,
                cause: error.cause,
            },
            NOT_FOUND => Self::NotFound(block_id.unwrap_or(error.message)),
            UNAVAILABLE => Self::Unavailable(block_id.unwrap_or(error.message)),
            other if MessengerError::is_messenger_name(other) => {
                Self::Messenger(MessengerError::from_serialized(error))
            }
            _ => Self::Business {
                name: error.name,
                message: error.message,
                block_id,
                stack: error.stack,
                cause: error.cause,
            },
        }
    }
}

impl From<MessengerError> for BrickError {
    fn from(error: MessengerError) -> Self {
        match error {
            MessengerError::Handler(serialized) => Self::from(serialized),
            other => Self::Messenger(other),
        }
    }
}

impl From<BrickError> for SerializedError {
    fn from(error: BrickError) -> Self {
        error.to_serialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prop_error_round_trip_with_cause_chain() {
        let error = BrickError::prop("@pixiebrix/jquery-reader", "selector", "Invalid selector")
            .with_cause(
                SerializedError::new("SyntaxError", "unexpected token")
                    .with_cause(SerializedError::new("Error", "tokenizer failed")),
            );

        let json = serde_json::to_string(&error.to_serialized()).unwrap();
        let parsed: SerializedError = serde_json::from_str(&json).unwrap();

        match BrickError::from(parsed) {
            BrickError::Prop {
                block_id,
                prop,
                message,
                cause,
            } => {
                assert_eq!(block_id, "@pixiebrix/jquery-reader");
                assert_eq!(prop, "selector");
                assert_eq!(message, "Invalid selector");
                let cause = cause.unwrap();
                assert_eq!(cause.message, "unexpected token");
                assert_eq!(cause.cause.unwrap().message, "tokenizer failed");
            }
            other => panic!("Expected PropError, got {:?}", other),
        }
    }

    #[test]
    fn test_business_error_keeps_custom_name() {
        let serialized = SerializedError::new("SheetNotFoundError", "No such sheet")
            .with_field("blockId", "@pixiebrix/google/sheets-append")
            .with_stack("at appendRow");

        let error = BrickError::from(serialized.clone());
        assert_eq!(error.block_id(), Some("@pixiebrix/google/sheets-append"));

        let again = error.to_serialized();
        assert_eq!(again.name, "SheetNotFoundError");
        assert_eq!(again.stack.as_deref(), Some("at appendRow"));
    }

    #[test]
    fn test_messenger_names_rehydrate_as_messenger_errors() {
        let serialized = MessengerError::ContextInvalidated.to_serialized();
        assert!(matches!(
            BrickError::from(serialized),
            BrickError::Messenger(MessengerError::ContextInvalidated)
        ));
    }

    #[test]
    fn test_from_remote_messenger_error() {
        let remote = MessengerError::Handler(
            BrickError::validation("@pixiebrix/get", "missing url").to_serialized(),
        );
        match BrickError::from(remote) {
            BrickError::Validation { block_id, message, .. } => {
                assert_eq!(block_id, "@pixiebrix/get");
                assert_eq!(message, "missing url");
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_round_trip() {
        let error = BrickError::NotFound("@pixiebrix/missing".to_string());
        let serialized = error.to_serialized();
        assert_eq!(serialized.name, "NotFoundError");
        assert!(matches!(
            BrickError::from(serialized),
            BrickError::NotFound(id) if id == "@pixiebrix/missing"
        ));
    }

    #[test]
    fn test_error_source_is_cause() {
        use std::error::Error;

        let error = BrickError::business("failed").with_cause(SerializedError::new("Error", "root"));
        assert_eq!(error.source().unwrap().to_string(), "Error: root");
    }
}
