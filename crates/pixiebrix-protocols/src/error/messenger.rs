//! Messaging errors.

use serde_json::Value;
use thiserror::Error;

use super::serialized::{SerializeError, SerializedError};

#[derive(Debug, Error)]
pub enum MessengerError {
    /// An argument or result could not be made transport-safe.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Method {method} is already registered in {context}")]
    DuplicateRegistration { method: String, context: String },

    #[error("No handler registered for {method} in {context}")]
    MethodNotFound { method: String, context: String },

    /// The method descriptor does not allow registration in this context.
    #[error("Method {method} cannot be registered in {context}")]
    WrongContext { method: String, context: String },

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Target {target} unreachable after {attempts} attempts")]
    TargetUnreachable { target: String, attempts: u32 },

    #[error("Extension context invalidated")]
    ContextInvalidated,

    /// The handle was obtained for a target its call shape cannot serve.
    #[error("Invalid target for {method}: {reason}")]
    InvalidTarget { method: String, reason: String },

    /// The handler failed; its error travels inside unchanged.
    #[error("{0}")]
    Handler(SerializedError),
}

const SERIALIZATION: &str = "SerializationError";
const DUPLICATE_REGISTRATION: &str = "DuplicateRegistrationError";
const METHOD_NOT_FOUND: &str = "MethodNotFoundError";
const WRONG_CONTEXT: &str = "WrongContextError";
const TARGET_NOT_FOUND: &str = "TargetNotFoundError";
const TARGET_UNREACHABLE: &str = "TargetUnreachableError";
const CONTEXT_INVALIDATED: &str = "ContextInvalidatedError";
const INVALID_TARGET: &str = "InvalidTargetError";

impl MessengerError {
    /// Whether `name` is one of the messenger's own error classes.
    pub fn is_messenger_name(name: &str) -> bool {
        matches!(
            name,
            SERIALIZATION
                | DUPLICATE_REGISTRATION
                | METHOD_NOT_FOUND
                | WRONG_CONTEXT
                | TARGET_NOT_FOUND
                | TARGET_UNREACHABLE
                | CONTEXT_INVALIDATED
                | INVALID_TARGET
        )
    }

    /// Rebuild a messenger error from its serialized form.
    ///
    /// Unknown names become [`MessengerError::Handler`] so nothing is lost.
    pub fn from_serialized(error: SerializedError) -> Self {
        let name = error.name.clone();
        let text = |key: &str| error.field_str(key).unwrap_or_default().to_string();
        match name.as_str() {
            SERIALIZATION => Self::Serialization(error.message),
            DUPLICATE_REGISTRATION => Self::DuplicateRegistration {
                method: text("method"),
                context: text("context"),
            },
            METHOD_NOT_FOUND => Self::MethodNotFound {
                method: text("method"),
                context: text("context"),
            },
            WRONG_CONTEXT => Self::WrongContext {
                method: text("method"),
                context: text("context"),
            },
            TARGET_NOT_FOUND => Self::TargetNotFound(text("target")),
            TARGET_UNREACHABLE => Self::TargetUnreachable {
                target: text("target"),
                attempts: error
                    .field("attempts")
                    .and_then(Value::as_u64)
                    .unwrap_or_default() as u32,
            },
            CONTEXT_INVALIDATED => Self::ContextInvalidated,
            INVALID_TARGET => Self::InvalidTarget {
                method: text("method"),
                reason: text("reason"),
            },
            _ => Self::Handler(error),
        }
    }

    /// Delivery problems that say nothing about the handler itself.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::TargetNotFound(_) | Self::TargetUnreachable { .. } | Self::ContextInvalidated
        )
    }
}

impl SerializeError for MessengerError {
    fn error_name(&self) -> &'static str {
        match self {
            Self::Serialization(_) => SERIALIZATION,
            Self::DuplicateRegistration { .. } => DUPLICATE_REGISTRATION,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::WrongContext { .. } => WRONG_CONTEXT,
            Self::TargetNotFound(_) => TARGET_NOT_FOUND,
            Self::TargetUnreachable { .. } => TARGET_UNREACHABLE,
            Self::ContextInvalidated => CONTEXT_INVALIDATED,
            Self::InvalidTarget { .. } => INVALID_TARGET,
            Self::Handler(_) => "Error",
        }
    }

    fn to_serialized(&self) -> SerializedError {
        let base = SerializedError::new(self.error_name(), self.to_string());
        match self {
            Self::Serialization(message) => SerializedError::new(SERIALIZATION, message.clone()),
            Self::DuplicateRegistration { method, context }
            | Self::MethodNotFound { method, context }
            | Self::WrongContext { method, context } => base
                .with_field("method", method.clone())
                .with_field("context", context.clone()),
            Self::TargetNotFound(target) => base.with_field("target", target.clone()),
            Self::TargetUnreachable { target, attempts } => base
                .with_field("target", target.clone())
                .with_field("attempts", *attempts),
            Self::ContextInvalidated => base,
            Self::InvalidTarget { method, reason } => base
                .with_field("method", method.clone())
                .with_field("reason", reason.clone()),
            Self::Handler(error) => error.clone(),
        }
    }
}

impl From<serde_json::Error> for MessengerError {
    fn from(e: serde_json::Error) -> Self {
        MessengerError::Serialization(e.to_string())
    }
}
