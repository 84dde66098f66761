//! Wiring one context: realm, brick runner and pipeline executor.

use std::sync::Arc;

use anyhow::Context;
use pixiebrix_config::{Config, ConfigValidator, RetrySettings};
use pixiebrix_messenger::{FrameTopology, HostPort, LocalHost, Realm, RealmOptions, RetryConfig};
use pixiebrix_protocols::{BrickLookup, ContextKind, Endpoint, Logger, PageContext, PlatformProtocol};
use pixiebrix_runtime::{
    BrickRunner, ExecutorConfig, PipelineExecutor, TracingLogger, register_brick_runner,
};
use tracing::{info, warn};

/// Which context is booting.
#[derive(Debug, Clone)]
pub struct ContextSpec {
    pub kind: ContextKind,
    pub endpoint: Endpoint,
    /// Page URL, for contexts that live in a page.
    pub url: Option<String>,
}

impl ContextSpec {
    pub fn new(kind: ContextKind, endpoint: Endpoint) -> Self {
        Self {
            kind,
            endpoint,
            url: None,
        }
    }

    pub fn background() -> Self {
        Self::new(ContextKind::Background, Endpoint::Background)
    }

    pub fn content_script(tab_id: u64, frame_id: u64) -> Self {
        Self::new(ContextKind::ContentScript, Endpoint::frame(tab_id, frame_id))
    }

    pub fn page(kind: ContextKind, name: impl Into<String>) -> Self {
        Self::new(kind, Endpoint::page(name))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Collaborators supplied by the embedding host.
#[derive(Clone)]
pub struct BootDeps {
    pub host: Arc<dyn HostPort>,
    pub topology: Arc<dyn FrameTopology>,
    pub bricks: Arc<dyn BrickLookup>,
    pub logger: Arc<dyn Logger>,
    pub platform: Option<Arc<dyn PlatformProtocol>>,
}

impl BootDeps {
    pub fn new(
        host: Arc<dyn HostPort>,
        topology: Arc<dyn FrameTopology>,
        bricks: Arc<dyn BrickLookup>,
    ) -> Self {
        Self {
            host,
            topology,
            bricks,
            logger: Arc::new(TracingLogger),
            platform: None,
        }
    }

    /// Dependencies backed by the in-process host.
    pub fn local(host: &Arc<LocalHost>, bricks: Arc<dyn BrickLookup>) -> Self {
        Self::new(host.clone(), host.clone(), bricks)
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_platform(mut self, platform: Arc<dyn PlatformProtocol>) -> Self {
        self.platform = Some(platform);
        self
    }
}

/// A context that is listening and ready to run pipelines.
pub struct BootedContext {
    pub realm: Arc<Realm>,
    pub runner: Arc<BrickRunner>,
    pub executor: Arc<PipelineExecutor>,
}

/// Messenger retry policy for `settings`.
pub fn retry_config(settings: &RetrySettings) -> RetryConfig {
    RetryConfig {
        max_retries: settings.max_retries,
        base_delay: settings.base_delay(),
        max_delay: settings.max_delay(),
        backoff_multiplier: settings.backoff_multiplier,
        jitter: settings.jitter,
    }
}

/// Build the realm for `spec`, serve [`RunBrick`](pixiebrix_runtime::RunBrick)
/// from it and start listening.
///
/// Fails if the configuration is invalid, the endpoint does not suit the
/// context kind, or the brick runner is already registered.
pub fn boot_context(spec: ContextSpec, deps: BootDeps, config: &Config) -> anyhow::Result<BootedContext> {
    let warnings = ConfigValidator::validate(config)
        .into_result()
        .context("invalid configuration")?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    let options = RealmOptions::new(spec.kind, spec.endpoint.clone())
        .with_retry(retry_config(&config.messenger.retry));
    let realm = Realm::new(options, deps.host, deps.topology)
        .with_context(|| format!("failed to create {} realm at {}", spec.kind, spec.endpoint))?;

    let mut page = PageContext::new(spec.endpoint.clone());
    if let Some(url) = spec.url {
        page = page.with_url(url);
    }
    let mut runner = BrickRunner::new(deps.bricks, deps.logger.clone(), page)
        .with_input_validation(config.runtime.validate_inputs);
    if let Some(platform) = deps.platform {
        runner = runner.with_platform(platform);
    }
    let runner = Arc::new(runner);
    register_brick_runner(&realm, runner.clone()).context("failed to register brick runner")?;

    let executor = PipelineExecutor::new(realm.clone(), runner.clone(), deps.logger).with_config(
        ExecutorConfig {
            strict_availability: config.runtime.strict_availability,
        },
    );

    realm.start();
    info!(kind = %spec.kind, endpoint = %spec.endpoint, "Context booted");

    Ok(BootedContext {
        realm,
        runner,
        executor: Arc::new(executor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixiebrix_core::BrickRegistry;
    use std::time::Duration;

    #[test]
    fn test_retry_config_from_settings() {
        let settings = RetrySettings {
            max_retries: 2,
            base_delay_ms: 25,
            max_delay_ms: 100,
            backoff_multiplier: 3.0,
            jitter: false,
        };
        let retry = retry_config(&settings);
        assert_eq!(retry.max_retries, 2);
        assert_eq!(retry.base_delay, Duration::from_millis(25));
        assert_eq!(retry.max_delay, Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(75));
    }

    #[test]
    fn test_invalid_config_refused() {
        let host = LocalHost::new();
        let mut config = Config::default();
        config.messenger.retry.backoff_multiplier = 0.0;

        let result = boot_context(
            ContextSpec::background(),
            BootDeps::local(&host, Arc::new(BrickRegistry::new())),
            &config,
        );
        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("backoff_multiplier"));
    }

    #[test]
    fn test_mismatched_endpoint_refused() {
        let host = LocalHost::new();
        let spec = ContextSpec::new(ContextKind::Sidebar, Endpoint::Background);

        let result = boot_context(
            spec,
            BootDeps::local(&host, Arc::new(BrickRegistry::new())),
            &Config::default(),
        );
        assert!(result.is_err());
    }
}
