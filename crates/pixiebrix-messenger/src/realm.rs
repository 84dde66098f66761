//! One realm per execution context.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use pixiebrix_protocols::{
    ContextKind, Endpoint, MessengerError, SerializeError, SerializedError, TabId, Target,
};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::dispatcher::Dispatcher;
use crate::envelope::{CallEnvelope, Envelope, Nonce, ResponseEnvelope, new_nonce};
use crate::facade::{BroadcastMethod, EndpointOutcome, Notifier, RemoteMethod};
use crate::host::{FrameTopology, HostPort, MessageListener};
use crate::method::{CallContext, Method};
use crate::registry::MethodRegistry;
use crate::retry::RetryConfig;
use crate::serialize::{from_transport, to_transport};
use crate::target::{Resolution, TargetResolver};

/// Calls remembered for duplicate suppression.
const RECENT_CALLS: usize = 256;

#[derive(Debug, Clone)]
pub struct RealmOptions {
    pub kind: ContextKind,
    pub endpoint: Endpoint,
    pub retry: RetryConfig,
}

impl RealmOptions {
    pub fn new(kind: ContextKind, endpoint: Endpoint) -> Self {
        Self {
            kind,
            endpoint,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Default)]
struct RecentCalls {
    order: VecDeque<(Nonce, Endpoint)>,
    seen: HashSet<(Nonce, Endpoint)>,
}

impl RecentCalls {
    /// False when the same call was delivered before.
    fn first_delivery(&mut self, id: &str, from: &Endpoint) -> bool {
        let key = (id.to_string(), from.clone());
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > RECENT_CALLS {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

/// The messaging state of one context: its method registry, its
/// outstanding calls and its view of the host.
pub struct Realm {
    kind: ContextKind,
    endpoint: Endpoint,
    registry: MethodRegistry,
    dispatcher: Arc<Dispatcher>,
    resolver: TargetResolver,
    host: Arc<dyn HostPort>,
    recent: Mutex<RecentCalls>,
}

impl Realm {
    pub fn new(
        options: RealmOptions,
        host: Arc<dyn HostPort>,
        topology: Arc<dyn FrameTopology>,
    ) -> Result<Arc<Self>, MessengerError> {
        let RealmOptions {
            kind,
            endpoint,
            retry,
        } = options;

        if !kind.accepts(&endpoint) {
            return Err(MessengerError::InvalidTarget {
                method: kind.to_string(),
                reason: format!("a {} realm cannot be addressed as {}", kind, endpoint),
            });
        }

        Ok(Arc::new(Self {
            kind,
            registry: MethodRegistry::new(kind, endpoint.clone()),
            dispatcher: Arc::new(Dispatcher::new(host.clone(), retry)),
            resolver: TargetResolver::new(topology),
            host,
            endpoint,
            recent: Mutex::new(RecentCalls::default()),
        }))
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Register the handler for `M` in this realm.
    pub fn register<M, F, Fut>(&self, handler: F) -> Result<(), MessengerError>
    where
        M: Method,
        F: Fn(CallContext, M::Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Output, SerializedError>> + Send + 'static,
    {
        self.registry.register::<M, F, Fut>(handler)
    }

    /// Begin receiving envelopes. Call once registration is done.
    pub fn start(self: &Arc<Self>) {
        self.host.listen(self.endpoint.clone(), self.clone());
        info!(
            context = %self.kind,
            endpoint = %self.endpoint,
            methods = self.registry.len(),
            "Realm listening"
        );
    }

    pub fn stop(&self) {
        self.host.unlisten(&self.endpoint);
    }

    /// Reject every outstanding call and stop serving.
    pub fn invalidate(&self) {
        self.host.unlisten(&self.endpoint);
        self.dispatcher.invalidate();
    }

    pub fn is_invalidated(&self) -> bool {
        self.dispatcher.is_invalidated()
    }

    /// Handle for calling `M` in the context named by `target`.
    pub fn method<M: Method>(self: &Arc<Self>, target: Target) -> RemoteMethod<M> {
        RemoteMethod::new(self.clone(), target)
    }

    /// Fire-and-forget handle for `M`.
    pub fn notifier<M: Method>(self: &Arc<Self>, target: Target) -> Notifier<M> {
        Notifier::new(self.clone(), target)
    }

    /// Handle for calling `M` in every frame of a tab.
    pub fn broadcast<M: Method>(self: &Arc<Self>, tab_id: TabId) -> BroadcastMethod<M> {
        BroadcastMethod::new(self.clone(), tab_id)
    }

    pub(crate) async fn invoke<M: Method>(
        &self,
        target: &Target,
        args: M::Args,
    ) -> Result<M::Output, MessengerError> {
        match target {
            Target::This => return self.call_local::<M>(args).await,
            Target::BroadcastToTab { .. } => {
                return Err(MessengerError::InvalidTarget {
                    method: M::NAME.to_string(),
                    reason: "broadcast targets produce one outcome per frame".to_string(),
                });
            }
            _ => {}
        }

        let payload = to_transport(&args)?;
        let endpoint = match self.resolver.resolve(&self.endpoint, target).await? {
            Resolution::Local => return self.call_local::<M>(args).await,
            Resolution::Endpoints(endpoints) => endpoints
                .into_iter()
                .next()
                .ok_or_else(|| MessengerError::TargetNotFound(target.to_string()))?,
        };

        debug!(method = M::NAME, to = %endpoint, "Calling method");
        let envelope = CallEnvelope::new(M::NAME, payload, target.clone(), self.endpoint.clone());
        let value = self.dispatcher.call(endpoint, envelope).await?;
        from_transport(value)
    }

    pub(crate) async fn invoke_all<M: Method>(
        &self,
        tab_id: TabId,
        args: M::Args,
    ) -> Result<Vec<EndpointOutcome<M::Output>>, MessengerError> {
        let target = Target::BroadcastToTab { tab_id };
        let payload = to_transport(&args)?;
        let endpoints = match self.resolver.resolve(&self.endpoint, &target).await? {
            Resolution::Endpoints(endpoints) => endpoints,
            Resolution::Local => vec![self.endpoint.clone()],
        };
        if endpoints.is_empty() {
            debug!(method = M::NAME, tab_id, "No frames to broadcast to");
            return Ok(Vec::new());
        }

        debug!(method = M::NAME, tab_id, frames = endpoints.len(), "Broadcasting method");
        let envelope = CallEnvelope::new(M::NAME, payload, target, self.endpoint.clone());
        let outcomes = self.dispatcher.call_all(endpoints, envelope).await;
        Ok(outcomes
            .into_iter()
            .map(|(endpoint, result)| EndpointOutcome {
                endpoint,
                result: result.and_then(from_transport),
            })
            .collect())
    }

    pub(crate) fn notify<M: Method>(
        self: &Arc<Self>,
        target: Target,
        args: M::Args,
    ) -> Result<(), MessengerError> {
        if target == Target::This {
            let ctx = CallContext::local(new_nonce(), self.endpoint.clone());
            match self.registry.dispatch_local::<M>(ctx, args) {
                Ok(pending) => {
                    tokio::spawn(async move {
                        if let Err(e) = pending.await {
                            warn!(method = M::NAME, "Notification handler failed: {}", e);
                        }
                    });
                }
                Err(e) => warn!(method = M::NAME, %target, "Dropped notification: {}", e),
            }
            return Ok(());
        }

        let payload = to_transport(&args)?;
        let realm = self.clone();
        tokio::spawn(async move {
            realm.deliver_notification(M::NAME, &target, payload).await;
        });
        Ok(())
    }

    async fn deliver_notification(&self, method: &str, target: &Target, payload: Value) {
        let endpoints = match self.resolver.resolve(&self.endpoint, target).await {
            Ok(Resolution::Endpoints(endpoints)) => endpoints,
            Ok(Resolution::Local) => vec![self.endpoint.clone()],
            Err(e) => {
                warn!(method, %target, "Dropped notification: {}", e);
                return;
            }
        };

        let deliveries = endpoints.into_iter().map(|endpoint| {
            let envelope =
                CallEnvelope::new(method, payload.clone(), target.clone(), self.endpoint.clone());
            async move {
                if let Err(e) = self.dispatcher.notify(&endpoint, envelope).await {
                    warn!(method, to = %endpoint, "Dropped notification: {}", e);
                }
            }
        });
        join_all(deliveries).await;
    }

    async fn call_local<M: Method>(&self, args: M::Args) -> Result<M::Output, MessengerError> {
        trace!(method = M::NAME, "Calling method in this context");
        let ctx = CallContext::local(new_nonce(), self.endpoint.clone());
        self.registry.dispatch_local::<M>(ctx, args)?.await
    }

    fn serve(&self, call: CallEnvelope) {
        let CallEnvelope {
            id,
            method,
            args,
            from,
            notification,
            ..
        } = call;

        if !self.recent.lock().first_delivery(&id, &from) {
            trace!(%method, %from, "Ignoring duplicate delivery");
            return;
        }

        debug!(%method, %from, notification, "Serving call");
        let ctx = CallContext {
            id: id.clone(),
            sender: from.clone(),
            receiver: self.endpoint.clone(),
            local: false,
        };
        let location = format!("at {} ({})", method, self.endpoint);
        let dispatched = self.registry.dispatch(&method, ctx, args);
        let dispatcher = self.dispatcher.clone();
        let me = self.endpoint.clone();

        tokio::spawn(async move {
            let result = match dispatched {
                Ok(pending) => pending.await.map_err(|e| with_location(e, location)),
                Err(e) => Err(e.to_serialized()),
            };

            if notification {
                if let Err(e) = result {
                    warn!(%method, %from, "Notification handler failed: {}", e);
                }
                return;
            }

            let response = ResponseEnvelope {
                id,
                from: me,
                payload: result.into(),
            };
            if let Err(e) = dispatcher.respond(&from, response).await {
                warn!(%method, to = %from, "Could not deliver response: {}", e);
            }
        });
    }
}

fn with_location(mut error: SerializedError, location: String) -> SerializedError {
    if error.stack.is_none() {
        error.stack = Some(location);
    }
    error
}

impl MessageListener for Realm {
    fn on_message(&self, envelope: Envelope) {
        if self.is_invalidated() {
            return;
        }
        match envelope {
            Envelope::Response(response) => self.dispatcher.handle_response(response),
            Envelope::Call(call) => self.serve(call),
        }
    }

    fn on_context_invalidated(&self) {
        self.invalidate();
    }
}

#[cfg(test)]
#[path = "realm_tests.rs"]
mod tests;
