//! Per-realm table of method handlers.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use pixiebrix_core::{BaseRegistry, Registerable};
use pixiebrix_protocols::{ContextKind, Endpoint, MessengerError, SerializeError, SerializedError};
use serde_json::Value;
use tracing::debug;

use crate::method::{CallContext, Method};
use crate::serialize::{from_transport, to_transport};

type TypedFn<M> = dyn Fn(
        CallContext,
        <M as Method>::Args,
    ) -> BoxFuture<'static, Result<<M as Method>::Output, SerializedError>>
    + Send
    + Sync;

/// Handler reachable with transport values.
trait ErasedHandler: Send + Sync {
    fn call(&self, ctx: CallContext, args: Value) -> BoxFuture<'static, Result<Value, SerializedError>>;
}

struct TypedHandler<M: Method> {
    handler: Box<TypedFn<M>>,
}

impl<M: Method> ErasedHandler for TypedHandler<M> {
    fn call(&self, ctx: CallContext, args: Value) -> BoxFuture<'static, Result<Value, SerializedError>> {
        let args = match from_transport::<M::Args>(args) {
            Ok(args) => args,
            Err(e) => return future::ready(Err(e.to_serialized())).boxed(),
        };
        let pending = (self.handler)(ctx, args);
        async move {
            let output = pending.await?;
            to_transport(&output).map_err(|e| e.to_serialized())
        }
        .boxed()
    }
}

struct MethodEntry {
    name: &'static str,
    erased: Arc<dyn ErasedHandler>,
    typed: Arc<dyn Any + Send + Sync>,
}

impl Registerable for MethodEntry {
    fn registry_id(&self) -> &str {
        self.name
    }
}

/// Method handlers served by one realm.
///
/// Each handler is stored twice: type-erased for envelopes arriving from
/// other realms, and as its concrete type so local calls skip JSON entirely.
pub struct MethodRegistry {
    context: ContextKind,
    endpoint: Endpoint,
    methods: BaseRegistry<MethodEntry>,
}

impl MethodRegistry {
    pub fn new(context: ContextKind, endpoint: Endpoint) -> Self {
        Self {
            context,
            endpoint,
            methods: BaseRegistry::new(),
        }
    }

    /// Register the handler for `M`.
    ///
    /// The first registration wins; later ones fail with
    /// [`MessengerError::DuplicateRegistration`] and leave it in place.
    pub fn register<M, F, Fut>(&self, handler: F) -> Result<(), MessengerError>
    where
        M: Method,
        F: Fn(CallContext, M::Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Output, SerializedError>> + Send + 'static,
    {
        if !M::CONTEXTS.contains(&self.context) {
            return Err(MessengerError::WrongContext {
                method: M::NAME.to_string(),
                context: self.context.to_string(),
            });
        }

        let typed = Arc::new(TypedHandler::<M> {
            handler: Box::new(move |ctx, args| handler(ctx, args).boxed()),
        });
        let entry = MethodEntry {
            name: M::NAME,
            erased: typed.clone(),
            typed,
        };

        self.methods
            .register(Arc::new(entry))
            .map_err(|_| MessengerError::DuplicateRegistration {
                method: M::NAME.to_string(),
                context: self.location(),
            })?;

        debug!(method = M::NAME, context = %self.context, "Registered method");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    /// Registered method names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.methods.list_ids()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Start dispatching a call that arrived as an envelope.
    ///
    /// Fails up front with [`MessengerError::MethodNotFound`]; otherwise the
    /// returned future yields the handler's transport-safe result.
    pub fn dispatch(
        &self,
        name: &str,
        ctx: CallContext,
        args: Value,
    ) -> Result<BoxFuture<'static, Result<Value, SerializedError>>, MessengerError> {
        let entry = self.methods.get(name).ok_or_else(|| self.not_found(name))?;
        Ok(entry.erased.call(ctx, args))
    }

    /// Start dispatching a call made from inside this realm.
    pub(crate) fn dispatch_local<M: Method>(
        &self,
        ctx: CallContext,
        args: M::Args,
    ) -> Result<BoxFuture<'static, Result<M::Output, MessengerError>>, MessengerError> {
        let entry = self.methods.get(M::NAME).ok_or_else(|| self.not_found(M::NAME))?;

        if let Ok(typed) = entry.typed.clone().downcast::<TypedHandler<M>>() {
            let pending = (typed.handler)(ctx, args);
            return Ok(async move { pending.await.map_err(MessengerError::Handler) }.boxed());
        }

        // Registered under the same name by another descriptor type.
        let pending = entry.erased.call(ctx, to_transport(&args)?);
        Ok(async move {
            let value = pending.await.map_err(MessengerError::Handler)?;
            from_transport(value)
        }
        .boxed())
    }

    fn not_found(&self, name: &str) -> MessengerError {
        MessengerError::MethodNotFound {
            method: name.to_string(),
            context: self.location(),
        }
    }

    fn location(&self) -> String {
        format!("{} ({})", self.context, self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Double;

    impl Method for Double {
        const NAME: &'static str = "DOUBLE";
        type Args = f64;
        type Output = f64;
    }

    struct BackgroundOnly;

    impl Method for BackgroundOnly {
        const NAME: &'static str = "BACKGROUND_ONLY";
        const CONTEXTS: &'static [ContextKind] = &[ContextKind::Background];
        type Args = ();
        type Output = ();
    }

    fn registry() -> MethodRegistry {
        MethodRegistry::new(ContextKind::ContentScript, Endpoint::frame(1, 0))
    }

    fn ctx() -> CallContext {
        CallContext::local("n-1".to_string(), Endpoint::frame(1, 0))
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let registry = registry();
        registry
            .register::<Double, _, _>(|_ctx, x| async move { Ok(x * 2.0) })
            .unwrap();

        let result = registry.dispatch("DOUBLE", ctx(), json!(21.0)).unwrap().await;
        assert_eq!(result.unwrap(), json!(42.0));
    }

    #[tokio::test]
    async fn test_first_registration_stays_active() {
        let registry = registry();
        registry
            .register::<Double, _, _>(|_ctx, x| async move { Ok(x * 2.0) })
            .unwrap();

        let err = registry
            .register::<Double, _, _>(|_ctx, x| async move { Ok(x * 3.0) })
            .unwrap_err();
        assert!(matches!(err, MessengerError::DuplicateRegistration { .. }));

        let result = registry.dispatch("DOUBLE", ctx(), json!(1.0)).unwrap().await;
        assert_eq!(result.unwrap(), json!(2.0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_wrong_context() {
        let err = registry()
            .register::<BackgroundOnly, _, _>(|_ctx, ()| async { Ok(()) })
            .unwrap_err();
        match err {
            MessengerError::WrongContext { method, context } => {
                assert_eq!(method, "BACKGROUND_ONLY");
                assert_eq!(context, "contentScript");
            }
            other => panic!("Expected WrongContext, got {:?}", other),
        }
    }

    #[test]
    fn test_method_not_found() {
        let err = match registry().dispatch("MISSING", ctx(), Value::Null) {
            Err(e) => e,
            Ok(_) => panic!("dispatch should fail"),
        };
        match err {
            MessengerError::MethodNotFound { method, context } => {
                assert_eq!(method, "MISSING");
                assert!(context.contains("tab 1 frame 0"));
            }
            other => panic!("Expected MethodNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_arguments_become_serialization_error() {
        let registry = registry();
        registry
            .register::<Double, _, _>(|_ctx, x| async move { Ok(x * 2.0) })
            .unwrap();

        let err = registry
            .dispatch("DOUBLE", ctx(), json!("not a number"))
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.name, "SerializationError");
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let registry = registry();
        registry
            .register::<Double, _, _>(|_ctx, _x| async move {
                Err(SerializedError::new("BusinessError", "cannot double").with_field("blockId", "a"))
            })
            .unwrap();

        let err = registry.dispatch("DOUBLE", ctx(), json!(1.0)).unwrap().await.unwrap_err();
        assert_eq!(err.name, "BusinessError");
        assert_eq!(err.field_str("blockId"), Some("a"));
    }

    #[tokio::test]
    async fn test_local_dispatch_skips_serialization() {
        let registry = registry();
        registry
            .register::<Double, _, _>(|_ctx, x| async move { Ok(x * 2.0) })
            .unwrap();

        // NaN would be rejected by the transport guard.
        let output = registry
            .dispatch_local::<Double>(ctx(), f64::NAN)
            .unwrap()
            .await
            .unwrap();
        assert!(output.is_nan());
    }
}
