//! Settings comparison between two resolved profiles.
//!
//! Both sides are compared in serialized form. Objects are walked key by key;
//! arrays and scalars are compared whole, the way overlays replace them.

use crate::config::ResolvedSettings;
use crate::error::ConfigResult;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A single setting whose value differs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldChange {
    /// JSON pointer of the setting (`/cache/options/IGNORE_EXCEPTIONS`).
    pub key: String,
    /// Value on the left side; `null` when the key only exists on the right.
    pub left: Value,
    /// Value on the right side; `null` when the key only exists on the left.
    pub right: Value,
}

impl FieldChange {
    /// Top-level section the change belongs to (`cache`).
    pub fn section(&self) -> &str {
        self.key
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsDiff {
    pub left_label: String,
    pub right_label: String,
    pub changes: Vec<FieldChange>,
}

impl SettingsDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed keys per top-level section, in key order.
    pub fn section_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for change in &self.changes {
            match counts.last_mut() {
                Some((section, n)) if *section == change.section() => *n += 1,
                _ => counts.push((change.section(), 1)),
            }
        }
        counts
    }

    /// One-line summary for terminal output.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return format!("{} and {} are identical", self.left_label, self.right_label);
        }
        let sections = self
            .section_counts()
            .iter()
            .map(|(section, n)| format!("{section} ({n})"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} keys differ between {} and {}: {}",
            self.changes.len(),
            self.left_label,
            self.right_label,
            sections
        )
    }
}

impl fmt::Display for SettingsDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {}", self.left_label)?;
        writeln!(f, "+++ {}", self.right_label)?;
        for change in &self.changes {
            writeln!(f, "{}", change.key)?;
            writeln!(f, "  - {}", change.left)?;
            writeln!(f, "  + {}", change.right)?;
        }
        Ok(())
    }
}

/// Compare two serialized documents.
pub fn diff_values(
    left_label: &str,
    left: &Value,
    right_label: &str,
    right: &Value,
) -> SettingsDiff {
    let mut changes = Vec::new();
    collect_changes(String::new(), left, right, &mut changes);
    SettingsDiff {
        left_label: left_label.to_string(),
        right_label: right_label.to_string(),
        changes,
    }
}

/// Compare two resolved profiles, optionally with secrets masked.
pub fn diff_profiles(
    left: &ResolvedSettings,
    right: &ResolvedSettings,
    reveal: bool,
) -> ConfigResult<SettingsDiff> {
    let serialize = |resolved: &ResolvedSettings| {
        if reveal {
            resolved.settings().to_value()
        } else {
            resolved.settings().to_redacted_value()
        }
    };
    Ok(diff_values(
        left.profile().name(),
        &serialize(left)?,
        right.profile().name(),
        &serialize(right)?,
    ))
}

fn collect_changes(path: String, left: &Value, right: &Value, out: &mut Vec<FieldChange>) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut keys: Vec<&String> = l.keys().chain(r.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = format!("{path}/{}", escape_pointer(key));
                collect_changes(
                    child,
                    l.get(key).unwrap_or(&Value::Null),
                    r.get(key).unwrap_or(&Value::Null),
                    out,
                );
            }
        }
        (l, r) if l != r => out.push(FieldChange {
            key: path,
            left: l.clone(),
            right: r.clone(),
        }),
        _ => {}
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
