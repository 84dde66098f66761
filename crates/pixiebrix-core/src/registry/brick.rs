//! Brick registry for looking up bricks by registry id.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use pixiebrix_protocols::brick::{Brick, BrickDefinition, BrickLookup};
use pixiebrix_protocols::error::{BrickError, RegistryError};

use super::base::{BaseRegistry, Registerable};

impl Registerable for dyn Brick {
    fn registry_id(&self) -> &str {
        &self.definition().id
    }
}

/// In-memory brick registry.
///
/// Read-mostly: the executor only reads during step dispatch, while
/// definitions are installed at startup or replaced when a package syncs.
pub struct BrickRegistry {
    inner: BaseRegistry<dyn Brick>,
}

impl BrickRegistry {
    pub fn new() -> Self {
        Self {
            inner: BaseRegistry::new(),
        }
    }

    /// Register a brick. Fails if the id is taken.
    pub fn register(&self, brick: Arc<dyn Brick>) -> Result<(), RegistryError> {
        self.inner.register(brick)
    }

    /// Install a brick, replacing any previous version with the same id.
    pub fn sync(&self, brick: Arc<dyn Brick>) {
        if self.inner.upsert(brick).is_some() {
            debug!("Replaced brick definition in registry");
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Brick>> {
        self.inner.get(id)
    }

    /// All brick definitions, sorted by id.
    pub fn definitions(&self) -> Vec<BrickDefinition> {
        let mut definitions: Vec<BrickDefinition> =
            self.inner.iter().map(|b| b.definition().clone()).collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for BrickRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrickLookup for BrickRegistry {
    async fn lookup(&self, id: &str) -> Result<Arc<dyn Brick>, BrickError> {
        self.get(id)
            .ok_or_else(|| BrickError::NotFound(id.to_string()))
    }
}
