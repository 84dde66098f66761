//! Values visible to the steps of a run.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

pub const INPUT_KEY: &str = "input";
pub const OPTIONS_KEY: &str = "options";

/// Immutable snapshot of a run's context.
///
/// Each successful step yields a new context with its output added; earlier
/// snapshots are never modified, so a brick can hold on to the one it got.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    values: Arc<BTreeMap<String, Value>>,
}

impl RunContext {
    /// Context seeded with `@input` and `@options`.
    pub fn new(input: Value, options: Value) -> Self {
        let mut values = BTreeMap::new();
        values.insert(INPUT_KEY.to_string(), input);
        values.insert(OPTIONS_KEY.to_string(), options);
        Self {
            values: Arc::new(values),
        }
    }

    /// Derive the context the next step sees.
    pub fn with_output(&self, key: &str, value: Value) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.to_string(), value);
        Self {
            values: Arc::new(values),
        }
    }

    /// Value stored under `key` (without the `@`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Resolve an `@key.path.0` expression.
    ///
    /// Object fields and array indexes are both addressed with `.`.
    pub fn lookup(&self, expression: &str) -> Option<&Value> {
        let expression = expression.trim().strip_prefix('@')?;
        let mut segments = expression.split('.');
        let root = self.values.get(segments.next()?)?;
        segments.try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Plain object with `@`-prefixed keys, as handed to bricks.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(key, value)| (format!("@{}", key), value.clone()))
            .collect();
        Value::Object(map)
    }

    /// Rebuild a context from [`RunContext::to_value`] output.
    pub fn from_value(value: &Value) -> Self {
        let values = value
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(key, value)| {
                        (key.strip_prefix('@').unwrap_or(key).to_string(), value.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            values: Arc::new(values),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()), Value::Object(Map::new()))
    }
}
