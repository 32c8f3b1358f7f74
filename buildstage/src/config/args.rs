//! Layered stage arguments.
//!
//! Precedence, highest first: call-site override, project configuration,
//! built-in default. Layers replace whole top-level keys; nested tables are
//! not merged.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{BuildstageError, Result};

/// Merges argument layers into one JSON object.
#[must_use]
pub fn merge_args(defaults: Value, project: Option<&Value>, call_site: Option<&Value>) -> Value {
    let mut merged = defaults;
    for layer in [project, call_site].into_iter().flatten() {
        merged = overlay(merged, layer);
    }
    merged
}

fn overlay(base: Value, layer: &Value) -> Value {
    match (base, layer) {
        (Value::Object(mut base), Value::Object(layer)) => {
            for (key, value) in layer {
                base.insert(key.clone(), value.clone());
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (_, layer) => layer.clone(),
    }
}

/// Builds a stage's typed argument struct from its default and override layers.
///
/// # Errors
///
/// Returns [`BuildstageError::InvalidArgs`] when the merged object does not
/// deserialize into `A`.
pub fn resolve_args<A>(stage: &str, project: Option<&Value>, call_site: Option<&Value>) -> Result<A>
where
    A: Serialize + DeserializeOwned + Default,
{
    let defaults = serde_json::to_value(A::default())?;
    let merged = merge_args(defaults, project, call_site);
    serde_json::from_value(merged).map_err(|err| BuildstageError::InvalidArgs {
        stage: stage.to_string(),
        message: err.to_string(),
    })
}
