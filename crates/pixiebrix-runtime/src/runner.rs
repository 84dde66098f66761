//! Running a single brick, locally or on behalf of another context.

use std::sync::Arc;

use pixiebrix_messenger::{Method, Realm};
use pixiebrix_protocols::{
    BrickError, BrickLookup, BrickOptions, ElementRoot, LogContext, Logger, MessengerError,
    PageContext, PlatformProtocol, SerializeError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::validation::validate_input;

/// Run one brick in the receiving context.
pub struct RunBrick;

impl Method for RunBrick {
    const NAME: &'static str = "RUN_BRICK";
    type Args = RunBrickRequest;
    type Output = Value;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBrickRequest {
    pub block_id: String,
    /// Already rendered input.
    pub input: Value,
    /// Context snapshot with `@`-prefixed keys.
    #[serde(default)]
    pub ctx: Value,
    pub run_id: String,
    #[serde(default)]
    pub step_index: usize,
}

/// Looks up, gates, validates and runs bricks for one context.
pub struct BrickRunner {
    bricks: Arc<dyn BrickLookup>,
    logger: Arc<dyn Logger>,
    platform: Option<Arc<dyn PlatformProtocol>>,
    page: PageContext,
    validate_inputs: bool,
}

impl BrickRunner {
    pub fn new(bricks: Arc<dyn BrickLookup>, logger: Arc<dyn Logger>, page: PageContext) -> Self {
        Self {
            bricks,
            logger,
            platform: None,
            page,
            validate_inputs: true,
        }
    }

    pub fn with_platform(mut self, platform: Arc<dyn PlatformProtocol>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_input_validation(mut self, enabled: bool) -> Self {
        self.validate_inputs = enabled;
        self
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// Run a brick here.
    ///
    /// Unavailable bricks fail with [`BrickError::Unavailable`]; whether that
    /// skips the step is the caller's decision. Root-aware bricks get `root`,
    /// or the document when none is given.
    pub async fn run(
        &self,
        request: RunBrickRequest,
        root: Option<ElementRoot>,
    ) -> Result<Value, BrickError> {
        let RunBrickRequest {
            block_id,
            input,
            ctx,
            run_id,
            step_index,
        } = request;

        let brick = self.bricks.lookup(&block_id).await?;
        if !brick.is_available(&self.page).await? {
            return Err(BrickError::Unavailable(block_id));
        }

        if self.validate_inputs {
            if let Some(schema) = &brick.definition().input_schema {
                validate_input(&block_id, schema, &input)?;
            }
        }

        let root = brick
            .is_root_aware()
            .then(|| root.unwrap_or_else(ElementRoot::document));
        let options = BrickOptions {
            ctx,
            root,
            run_id: run_id.clone(),
            page: self.page.clone(),
            logger: self.logger.clone(),
            platform: self.platform.clone(),
        };

        debug!(%block_id, step_index, endpoint = %self.page.endpoint, "Running brick");
        brick.run(input, options).await.map_err(|error| {
            let error = error.with_block_id(&block_id);
            self.logger.debug(
                "Brick failed",
                &LogContext::new()
                    .with_run(run_id)
                    .with_block(block_id.as_str())
                    .with_step(step_index)
                    .with_endpoint(&self.page.endpoint)
                    .with_error(error.to_serialized()),
            );
            error
        })
    }
}

/// Serve [`RunBrick`] from `realm` so other contexts can run bricks here.
pub fn register_brick_runner(realm: &Realm, runner: Arc<BrickRunner>) -> Result<(), MessengerError> {
    realm.register::<RunBrick, _, _>(move |_ctx, request| {
        let runner = runner.clone();
        async move {
            runner
                .run(request, None)
                .await
                .map_err(|error| error.to_serialized())
        }
    })
}
