//! Structural comparison of desired settings against an existing version.
//!
//! Produces a map of RFC 6901 JSON pointer paths to `{from, to}` deltas,
//! where `from` is the existing value and `to` the desired one. The result
//! only decides whether an update is required; updates always ship a full
//! new version, never a patch built from the diff.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields the platform manages; never part of a material difference.
pub const IGNORED_FIELDS: &[&str] = &[
    "id",
    "object_id",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
];

/// A single delta at a JSON pointer path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    /// Existing value (`Null` if absent).
    pub from: Value,
    /// Desired value (`Null` if absent).
    pub to: Value,
}

/// The full structural difference between desired and existing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsDiff {
    /// Pointer path (e.g. `"/delivery/address/levels/3/enum_version_id"`)
    /// to the delta at that path. Ordered for stable rendering.
    pub entries: BTreeMap<String, FieldDelta>,
}

impl SettingsDiff {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Deep-compare `desired` against `existing`.
///
/// Objects compare over the union of their keys, arrays by index, scalars by
/// equality. [`IGNORED_FIELDS`] are skipped at any depth. A value present on
/// one side and absent on the other is a delta against `Null`.
pub fn diff_settings(desired: &Value, existing: &Value) -> SettingsDiff {
    let mut entries = BTreeMap::new();
    walk(desired, existing, String::new(), &mut entries);
    SettingsDiff { entries }
}

fn walk(desired: &Value, existing: &Value, path: String, out: &mut BTreeMap<String, FieldDelta>) {
    match (desired, existing) {
        (Value::Object(desired_map), Value::Object(existing_map)) => {
            let mut keys: Vec<&String> = desired_map.keys().chain(existing_map.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                if IGNORED_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                let child_path = format!("{}/{}", path, escape_pointer(key));
                let d = desired_map.get(key).unwrap_or(&Value::Null);
                let e = existing_map.get(key).unwrap_or(&Value::Null);
                walk(d, e, child_path, out);
            }
        }
        (Value::Array(desired_items), Value::Array(existing_items)) => {
            let len = desired_items.len().max(existing_items.len());
            for i in 0..len {
                let child_path = format!("{}/{}", path, i);
                let d = desired_items.get(i).unwrap_or(&Value::Null);
                let e = existing_items.get(i).unwrap_or(&Value::Null);
                walk(d, e, child_path, out);
            }
        }
        (d, e) => {
            if d != e {
                out.insert(
                    path,
                    FieldDelta {
                        from: e.clone(),
                        to: d.clone(),
                    },
                );
            }
        }
    }
}

/// RFC 6901 token escaping: `~` then `/`.
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
