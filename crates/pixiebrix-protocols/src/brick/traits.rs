//! Brick trait definitions.

use async_trait::async_trait;
use std::sync::Arc;

use super::{BrickDefinition, BrickOptions, PageContext};
use crate::error::BrickError;

/// Core trait for bricks.
///
/// Readers, transformers, effects and renderers all look the same to the
/// executor: it renders the input, then calls `run`.
#[async_trait]
pub trait Brick: Send + Sync {
    /// Returns the brick definition.
    fn definition(&self) -> &BrickDefinition;

    /// Run the brick with its rendered input.
    async fn run(
        &self,
        input: serde_json::Value,
        options: BrickOptions,
    ) -> Result<serde_json::Value, BrickError>;

    /// Whether the brick can run on the given page.
    async fn is_available(&self, _page: &PageContext) -> Result<bool, BrickError> {
        Ok(true)
    }

    /// Whether the brick wants the root element.
    fn is_root_aware(&self) -> bool {
        false
    }
}

/// Read side of the brick registry.
#[async_trait]
pub trait BrickLookup: Send + Sync {
    /// Look up a brick by registry id.
    ///
    /// Fails with [`BrickError::NotFound`] if no brick has that id.
    async fn lookup(&self, id: &str) -> Result<Arc<dyn Brick>, BrickError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::BrickKind;
    use crate::logger::{LogContext, LogLevel, Logger};
    use crate::types::Endpoint;

    struct NullLogger;

    impl Logger for NullLogger {
        fn log(&self, _level: LogLevel, _message: &str, _context: &LogContext) {}
    }

    struct EchoBrick {
        definition: BrickDefinition,
    }

    #[async_trait]
    impl Brick for EchoBrick {
        fn definition(&self) -> &BrickDefinition {
            &self.definition
        }

        async fn run(
            &self,
            input: serde_json::Value,
            _options: BrickOptions,
        ) -> Result<serde_json::Value, BrickError> {
            Ok(input)
        }
    }

    #[tokio::test]
    async fn test_brick_defaults() {
        let brick = EchoBrick {
            definition: BrickDefinition::new("@test/echo", "Echo", BrickKind::Transformer),
        };
        let page = PageContext::new(Endpoint::Background);

        assert!(brick.is_available(&page).await.unwrap());
        assert!(!brick.is_root_aware());

        let options = BrickOptions {
            ctx: serde_json::json!({}),
            root: None,
            run_id: "run-1".to_string(),
            page,
            logger: Arc::new(NullLogger),
            platform: None,
        };
        let output = brick.run(serde_json::json!({"a": 1}), options).await.unwrap();
        assert_eq!(output, serde_json::json!({"a": 1}));
    }
}
