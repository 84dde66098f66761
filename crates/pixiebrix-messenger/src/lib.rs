//! # PixieBrix Messenger
//!
//! Typed remote procedure calls between isolated browser contexts.
//!
//! Every context owns one [`Realm`]. A realm registers the methods it
//! serves, hands envelopes to the host through a [`HostPort`], and
//! correlates responses with outstanding calls by nonce.
//!
//! ```ignore
//! let realm = Realm::new(RealmOptions::new(ContextKind::ContentScript, Endpoint::frame(1, 0)), host, topology)?;
//! realm.register::<GetPageState, _, _>(|_ctx, ()| async { Ok(state()) })?;
//! realm.start();
//!
//! let state = realm.method::<GetPageState>(Target::tab(1, 0)).call(()).await?;
//! ```

pub mod dispatcher;
pub mod envelope;
pub mod facade;
pub mod host;
pub mod local;
pub mod method;
pub mod realm;
pub mod registry;
pub mod retry;
pub mod serialize;
pub mod target;

pub use dispatcher::Dispatcher;
pub use envelope::{CallEnvelope, Envelope, Nonce, ResponseEnvelope, ResponsePayload};
pub use facade::{BroadcastMethod, EndpointOutcome, Notifier, RemoteMethod};
pub use host::{DeliveryError, FrameInfo, FrameTopology, HostPort, MessageListener};
pub use local::LocalHost;
pub use method::{CallContext, Method};
pub use realm::{Realm, RealmOptions};
pub use registry::MethodRegistry;
pub use retry::RetryConfig;
pub use serialize::{from_transport, to_transport};
pub use target::{Resolution, TargetResolver};
