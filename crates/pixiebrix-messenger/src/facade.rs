//! Typed call handles bound to a target.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use pixiebrix_protocols::{Endpoint, MessengerError, TabId, Target};

use crate::method::Method;
use crate::realm::Realm;

/// Callable for `M` in whatever context `target` names.
pub struct RemoteMethod<M: Method> {
    realm: Arc<Realm>,
    target: Target,
    _method: PhantomData<fn() -> M>,
}

impl<M: Method> RemoteMethod<M> {
    pub(crate) fn new(realm: Arc<Realm>, target: Target) -> Self {
        Self {
            realm,
            target,
            _method: PhantomData,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Resolve the target, deliver the call and wait for the handler.
    pub async fn call(&self, args: M::Args) -> Result<M::Output, MessengerError> {
        self.realm.invoke::<M>(&self.target, args).await
    }
}

impl<M: Method> Clone for RemoteMethod<M> {
    fn clone(&self) -> Self {
        Self::new(self.realm.clone(), self.target.clone())
    }
}

impl<M: Method> fmt::Debug for RemoteMethod<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMethod")
            .field("method", &M::NAME)
            .field("target", &self.target)
            .finish()
    }
}

/// Fire-and-forget handle for `M`.
pub struct Notifier<M: Method> {
    realm: Arc<Realm>,
    target: Target,
    _method: PhantomData<fn() -> M>,
}

impl<M: Method> Notifier<M> {
    pub(crate) fn new(realm: Arc<Realm>, target: Target) -> Self {
        Self {
            realm,
            target,
            _method: PhantomData,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Hand the notification to the transport and return.
    ///
    /// Only arguments that cannot be serialized fail here. Delivery and
    /// handler failures are logged and otherwise dropped.
    pub fn notify(&self, args: M::Args) -> Result<(), MessengerError> {
        self.realm.notify::<M>(self.target.clone(), args)
    }
}

impl<M: Method> Clone for Notifier<M> {
    fn clone(&self) -> Self {
        Self::new(self.realm.clone(), self.target.clone())
    }
}

/// Result of one leg of a broadcast.
#[derive(Debug)]
pub struct EndpointOutcome<T> {
    pub endpoint: Endpoint,
    pub result: Result<T, MessengerError>,
}

impl<T> EndpointOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Callable for `M` in every frame of a tab.
pub struct BroadcastMethod<M: Method> {
    realm: Arc<Realm>,
    tab_id: TabId,
    _method: PhantomData<fn() -> M>,
}

impl<M: Method> BroadcastMethod<M> {
    pub(crate) fn new(realm: Arc<Realm>, tab_id: TabId) -> Self {
        Self {
            realm,
            tab_id,
            _method: PhantomData,
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// One outcome per frame known when the call is made. A tab with no
    /// frames yields no outcomes.
    pub async fn call(&self, args: M::Args) -> Result<Vec<EndpointOutcome<M::Output>>, MessengerError> {
        self.realm.invoke_all::<M>(self.tab_id, args).await
    }
}

impl<M: Method> Clone for BroadcastMethod<M> {
    fn clone(&self) -> Self {
        Self::new(self.realm.clone(), self.tab_id)
    }
}
