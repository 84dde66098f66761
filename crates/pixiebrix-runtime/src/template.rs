//! Template expressions in step configurations.
//!
//! Two expression objects are understood:
//!
//! - `{"__type__": "var", "__value__": "@a.foo"}` renders to the value at the path
//! - `{"__type__": "mustache", "__value__": "Hi {{ @a.name }}"}` renders to a string
//!
//! Anything else renders to itself, with objects and arrays walked recursively.

use std::sync::LazyLock;

use pixiebrix_protocols::BrickError;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::context::RunContext;

const TYPE_KEY: &str = "__type__";
const VALUE_KEY: &str = "__value__";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(@[A-Za-z0-9_$\-]+(?:\.[A-Za-z0-9_$\-]+)*)\s*\}\}")
        .unwrap_or_else(|e| unreachable!("invalid placeholder pattern: {e}"))
});

enum Expression<'a> {
    Var(&'a str),
    Mustache(&'a str),
}

fn expression<'a>(
    map: &'a Map<String, Value>,
    block_id: &str,
) -> Result<Option<Expression<'a>>, BrickError> {
    let Some(kind) = map.get(TYPE_KEY) else {
        return Ok(None);
    };
    let kind = kind
        .as_str()
        .ok_or_else(|| BrickError::validation(block_id, "Expression type must be a string"))?;
    let value = map.get(VALUE_KEY).and_then(Value::as_str).ok_or_else(|| {
        BrickError::validation(block_id, format!("{} expression has no string value", kind))
    })?;

    match kind {
        "var" => {
            if !value.trim().starts_with('@') {
                return Err(BrickError::validation(
                    block_id,
                    format!("Variable {} must start with @", value),
                ));
            }
            Ok(Some(Expression::Var(value)))
        }
        "mustache" => Ok(Some(Expression::Mustache(value))),
        other => Err(BrickError::validation(
            block_id,
            format!("Unsupported expression type: {}", other),
        )),
    }
}

/// Render a template against the run context.
pub fn render(template: &Value, ctx: &RunContext, block_id: &str) -> Result<Value, BrickError> {
    match template {
        Value::Object(map) => match expression(map, block_id)? {
            Some(Expression::Var(path)) => Ok(ctx.lookup(path).cloned().unwrap_or(Value::Null)),
            Some(Expression::Mustache(text)) => Ok(Value::String(interpolate(text, ctx))),
            None => map
                .iter()
                .map(|(key, value)| Ok((key.clone(), render(value, ctx, block_id)?)))
                .collect::<Result<Map<_, _>, BrickError>>()
                .map(Value::Object),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| render(item, ctx, block_id))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn interpolate(text: &str, ctx: &RunContext) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match ctx.lookup(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
        .into_owned()
}

/// Context keys (without `@`) a template reads.
pub fn references(template: &Value) -> Vec<String> {
    let mut keys = Vec::new();
    collect_references(template, &mut keys);
    keys.sort();
    keys.dedup();
    keys
}

fn collect_references(template: &Value, keys: &mut Vec<String>) {
    match template {
        Value::Object(map) => match expression(map, "") {
            Ok(Some(Expression::Var(path))) => keys.extend(root_key(path)),
            Ok(Some(Expression::Mustache(text))) => {
                keys.extend(PLACEHOLDER.captures_iter(text).filter_map(|caps| root_key(&caps[1])))
            }
            // Malformed expressions are reported when the step renders.
            Err(_) => {}
            Ok(None) => map.values().for_each(|value| collect_references(value, keys)),
        },
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, keys)),
        _ => {}
    }
}

fn root_key(path: &str) -> Option<String> {
    path.trim()
        .strip_prefix('@')?
        .split('.')
        .next()
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Truthiness of a rendered condition.
///
/// Besides `false`, `null`, `0` and `""`, the strings `false`, `f`, `0`,
/// `no`, `n` and `off` (any case) are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "" | "false" | "f" | "0" | "no" | "n" | "off"
        ),
        Value::Array(_) | Value::Object(_) => true,
    }
}
