//! Outstanding-call table and delivery with readiness retry.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use pixiebrix_protocols::{Endpoint, MessengerError};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::envelope::{CallEnvelope, Envelope, Nonce, ResponseEnvelope};
use crate::host::{DeliveryError, HostPort};
use crate::retry::RetryConfig;

/// Responses are matched on nonce and responder. The responder part keeps
/// broadcast legs, which share a nonce, apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingKey {
    id: Nonce,
    endpoint: Endpoint,
}

struct PendingCall {
    method: String,
    tx: oneshot::Sender<Result<Value, MessengerError>>,
}

type PendingTable = Mutex<HashMap<PendingKey, PendingCall>>;

/// Removes the entry if the caller stops waiting before a response.
struct PendingGuard<'a> {
    pending: &'a PendingTable,
    key: PendingKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.key);
    }
}

/// Sends envelopes for one realm and settles its outstanding calls.
pub struct Dispatcher {
    host: Arc<dyn HostPort>,
    retry: RetryConfig,
    pending: PendingTable,
    invalidated: CancellationToken,
}

impl Dispatcher {
    pub fn new(host: Arc<dyn HostPort>, retry: RetryConfig) -> Self {
        Self {
            host,
            retry,
            pending: Mutex::new(HashMap::new()),
            invalidated: CancellationToken::new(),
        }
    }

    /// Send a call and wait for its response.
    ///
    /// Only delivery is time-bounded. Once the receiver has the envelope the
    /// caller waits for the handler however long it takes.
    pub async fn call(&self, to: Endpoint, envelope: CallEnvelope) -> Result<Value, MessengerError> {
        let key = PendingKey {
            id: envelope.id.clone(),
            endpoint: to.clone(),
        };
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            key.clone(),
            PendingCall {
                method: envelope.method.clone(),
                tx,
            },
        );
        let _guard = PendingGuard {
            pending: &self.pending,
            key,
        };

        self.deliver(&to, Envelope::Call(envelope)).await?;

        match rx.await {
            Ok(result) => result,
            // The table was dropped along with the realm.
            Err(_) => Err(MessengerError::ContextInvalidated),
        }
    }

    /// Send the same call to every endpoint. One outcome per endpoint, in
    /// order; a failing leg does not affect the others.
    pub async fn call_all(
        &self,
        endpoints: Vec<Endpoint>,
        envelope: CallEnvelope,
    ) -> Vec<(Endpoint, Result<Value, MessengerError>)> {
        let calls = endpoints.into_iter().map(|endpoint| {
            let envelope = envelope.clone();
            async move {
                let result = self.call(endpoint.clone(), envelope).await;
                (endpoint, result)
            }
        });
        join_all(calls).await
    }

    /// Deliver a notification. Nothing is tracked.
    pub async fn notify(&self, to: &Endpoint, envelope: CallEnvelope) -> Result<(), MessengerError> {
        self.deliver(to, Envelope::Call(envelope.notification())).await
    }

    /// Post a response to a call this realm served.
    pub async fn respond(&self, to: &Endpoint, response: ResponseEnvelope) -> Result<(), MessengerError> {
        self.deliver(to, Envelope::Response(response)).await
    }

    async fn deliver(&self, to: &Endpoint, envelope: Envelope) -> Result<(), MessengerError> {
        let mut attempt = 0;
        loop {
            if self.is_invalidated() {
                return Err(MessengerError::ContextInvalidated);
            }

            trace!(%to, id = envelope.id(), attempt, "Posting envelope");
            let error = match self.host.post(to, envelope.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            match error {
                DeliveryError::NoReceiver(_) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    attempt += 1;
                    debug!(
                        "No receiver at {} (attempt {}/{}), retrying in {:?}",
                        to,
                        attempt,
                        self.retry.max_retries + 1,
                        delay
                    );
                    tokio::select! {
                        _ = self.invalidated.cancelled() => return Err(MessengerError::ContextInvalidated),
                        _ = sleep(delay) => {}
                    }
                }
                DeliveryError::NoReceiver(_) => {
                    return Err(MessengerError::TargetUnreachable {
                        target: to.to_string(),
                        attempts: attempt + 1,
                    });
                }
                DeliveryError::ContextInvalidated => {
                    self.invalidate();
                    return Err(MessengerError::ContextInvalidated);
                }
                DeliveryError::Serialization(message) => {
                    return Err(MessengerError::Serialization(message));
                }
            }
        }
    }

    /// Settle the outstanding call a response belongs to.
    ///
    /// Unknown, duplicate and late responses are dropped without error.
    pub fn handle_response(&self, response: ResponseEnvelope) {
        let key = PendingKey {
            id: response.id,
            endpoint: response.from,
        };
        let Some(call) = self.pending.lock().remove(&key) else {
            trace!(id = %key.id, from = %key.endpoint, "Discarding response with no outstanding call");
            return;
        };

        let result = response
            .payload
            .into_result()
            .map_err(MessengerError::from_serialized);
        if call.tx.send(result).is_err() {
            trace!(method = %call.method, "Caller stopped waiting before the response arrived");
        }
    }

    /// Reject every outstanding call and refuse new ones.
    pub fn invalidate(&self) {
        self.invalidated.cancel();
        let drained: Vec<PendingCall> = self.pending.lock().drain().map(|(_, call)| call).collect();
        if !drained.is_empty() {
            warn!(
                "Context invalidated, rejecting {} outstanding call(s)",
                drained.len()
            );
        }
        for call in drained {
            let _ = call.tx.send(Err(MessengerError::ContextInvalidated));
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated.is_cancelled()
    }

    /// Number of calls awaiting a response.
    pub fn outstanding(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
