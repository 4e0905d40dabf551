//! Overlay application over a serialized settings document.
//!
//! An overlay is an ordered list of [`OverlayOp`]s. Keys are JSON pointers
//! into the serialized [`Settings`](super::Settings) (`/cache/options`).
//! Arrays are replaced entirely, not concatenated.
//!
//! # Example
//! ```
//! use serde_json::json;
//! use primepass_settings::config::{OverlayOp, apply_overlay};
//!
//! let base = json!({ "cache": { "options": { "CLIENT_CLASS": "x", "SERIALIZER": "y" } } });
//! let ops = [OverlayOp::merge("/cache/options", json!({ "IGNORE_EXCEPTIONS": true }))];
//! let result = apply_overlay(base, &ops).unwrap();
//! assert_eq!(result["cache"]["options"]["SERIALIZER"], "y");
//! assert_eq!(result["cache"]["options"]["IGNORE_EXCEPTIONS"], true);
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;

/// One step of an overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayOp {
    /// Replace the value at `key` (or add it to its parent object).
    Assign { key: String, value: Value },
    /// Set each sub-key of `value` on the object at `key`. Named sub-keys are
    /// replaced whole, `null` included; unnamed ones are kept.
    Merge { key: String, value: Value },
}

impl OverlayOp {
    pub fn assign(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Assign {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn merge(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Merge {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            OverlayOp::Assign { key, .. } | OverlayOp::Merge { key, .. } => key,
        }
    }
}

/// Apply overlay operations in order to a copy of `base`.
///
/// `base` is consumed; on error the partially updated document is dropped,
/// so callers never observe a half-applied overlay.
pub fn apply_overlay(mut base: Value, ops: &[OverlayOp]) -> ConfigResult<Value> {
    for op in ops {
        match op {
            OverlayOp::Assign { key, value } => assign(&mut base, key, value.clone())?,
            OverlayOp::Merge { key, value } => merge(&mut base, key, value)?,
        }
    }
    Ok(base)
}

fn merge(root: &mut Value, key: &str, value: &Value) -> ConfigResult<()> {
    let (Some(Value::Object(target)), Value::Object(updates)) = (root.pointer_mut(key), value)
    else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };
    for (sub_key, sub_value) in updates {
        target.insert(sub_key.clone(), sub_value.clone());
    }
    Ok(())
}

fn assign(root: &mut Value, key: &str, value: Value) -> ConfigResult<()> {
    let (parent, leaf) = key
        .rsplit_once('/')
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let leaf = leaf.replace("~1", "/").replace("~0", "~");

    match root.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.insert(leaf, value);
            Ok(())
        }
        Some(Value::Array(items)) => {
            let slot = leaf
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            *slot = value;
            Ok(())
        }
        _ => Err(ConfigError::UnknownKey(key.to_string())),
    }
}
