//! Wire envelopes exchanged between realms.

use pixiebrix_protocols::{Endpoint, SerializedError, Target};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation id of one call. Unique per call, shared by the legs of a
/// broadcast (those are told apart by responder endpoint).
pub type Nonce = String;

/// Generate a fresh nonce.
pub fn new_nonce() -> Nonce {
    uuid::Uuid::new_v4().to_string()
}

/// Anything a realm posts to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Envelope {
    Call(CallEnvelope),
    Response(ResponseEnvelope),
}

impl Envelope {
    pub fn id(&self) -> &str {
        match self {
            Envelope::Call(call) => &call.id,
            Envelope::Response(response) => &response.id,
        }
    }

    /// Endpoint of the realm that posted the envelope.
    pub fn sender(&self) -> &Endpoint {
        match self {
            Envelope::Call(call) => &call.from,
            Envelope::Response(response) => &response.from,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEnvelope {
    pub id: Nonce,
    pub method: String,
    /// Transport-safe arguments. Multi-argument methods use an array.
    pub args: Value,
    /// The abstract target the caller asked for.
    pub target: Target,
    pub from: Endpoint,
    /// Fire-and-forget: the receiver never responds.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub notification: bool,
}

impl CallEnvelope {
    pub fn new(method: impl Into<String>, args: Value, target: Target, from: Endpoint) -> Self {
        Self {
            id: new_nonce(),
            method: method.into(),
            args,
            target,
            from,
            notification: false,
        }
    }

    pub fn notification(mut self) -> Self {
        self.notification = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Nonce of the call being answered.
    pub id: Nonce,
    /// Endpoint of the responding realm.
    pub from: Endpoint,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

/// Exactly one of a result or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponsePayload {
    Result(Value),
    Error(SerializedError),
}

impl ResponsePayload {
    pub fn into_result(self) -> Result<Value, SerializedError> {
        match self {
            ResponsePayload::Result(value) => Ok(value),
            ResponsePayload::Error(error) => Err(error),
        }
    }
}

impl From<Result<Value, SerializedError>> for ResponsePayload {
    fn from(result: Result<Value, SerializedError>) -> Self {
        match result {
            Ok(value) => ResponsePayload::Result(value),
            Err(error) => ResponsePayload::Error(error),
        }
    }
}
