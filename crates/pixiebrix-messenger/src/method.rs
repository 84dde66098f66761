//! Statically typed method descriptors.

use pixiebrix_protocols::{ContextKind, Endpoint};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::envelope::Nonce;

/// Descriptor of a remotely callable method.
///
/// The name is what travels on the wire; argument and output types are
/// checked at compile time on both ends.
///
/// ```ignore
/// struct GetPageState;
///
/// impl Method for GetPageState {
///     const NAME: &'static str = "GET_PAGE_STATE";
///     const CONTEXTS: &'static [ContextKind] = &[ContextKind::ContentScript];
///     type Args = ();
///     type Output = serde_json::Value;
/// }
/// ```
pub trait Method: Send + Sync + 'static {
    const NAME: &'static str;

    /// Contexts allowed to register a handler for this method.
    const CONTEXTS: &'static [ContextKind] = ContextKind::ALL;

    type Args: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;
}

/// What a handler knows about the call it is serving.
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    pub id: Nonce,
    pub sender: Endpoint,
    pub receiver: Endpoint,
    /// The call never left the realm.
    pub local: bool,
}

impl CallContext {
    pub fn local(id: Nonce, endpoint: Endpoint) -> Self {
        Self {
            id,
            sender: endpoint.clone(),
            receiver: endpoint,
            local: true,
        }
    }
}
