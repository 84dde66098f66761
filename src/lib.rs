//! # PixieBrix
//!
//! Cross-context messaging and brick pipeline runtime for the PixieBrix
//! browser extension.
//!
//! Every execution context (background, one content script per frame,
//! extension pages) boots a [`Realm`](pixiebrix_messenger::Realm) that owns
//! its method table and outstanding calls. Pipelines run in one context and
//! hop into others through the messenger when a step asks for it.
//!
//! ```ignore
//! let _guard = pixiebrix::logging::init(&config.logging)?;
//! let ctx = pixiebrix::boot_context(
//!     ContextSpec::content_script(tab_id, 0),
//!     BootDeps::new(host, topology, bricks),
//!     &config,
//! )?;
//! let summary = ctx.executor.run(&pipeline, input, json!({})).await?;
//! ```

pub mod boot;
pub mod logging;

pub use boot::{BootDeps, BootedContext, ContextSpec, boot_context, retry_config};

pub use pixiebrix_config as config;
pub use pixiebrix_core::BrickRegistry;
pub use pixiebrix_messenger as messenger;
pub use pixiebrix_protocols as protocols;
pub use pixiebrix_runtime as runtime;
