//! Resolution of version-id references found inside diffs.
//!
//! Diff entries on declared reference fields carry opaque version ids. For
//! reporting, each is resolved into a display name and version string: first
//! against the transaction log of this run, then via a live platform read
//! (the referenced object may not have been touched by this run, or may have
//! been removed upstream), and finally degraded to an explicit marker.
//! Event references recurse one additional level, since an event version
//! itself carries schema and enumeration references; the reference graph is
//! fixed at two levels, so the walk is written as two passes rather than
//! open-ended recursion.

use std::collections::BTreeMap;

use catsync_platform::{CatalogPlatform, ObjectKind, VersionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::{FieldDelta, SettingsDiff};
use crate::txlog::TransactionLog;

/// A settings field that references another object's version by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceField {
    pub field: &'static str,
    pub target: ObjectKind,
}

/// Statically declared reference schema per resource kind.
pub fn reference_fields(kind: ObjectKind) -> &'static [ReferenceField] {
    match kind {
        ObjectKind::Event => &[
            ReferenceField {
                field: "schema_version_id",
                target: ObjectKind::Schema,
            },
            ReferenceField {
                field: "enum_version_ids",
                target: ObjectKind::Enumeration,
            },
        ],
        ObjectKind::EventApi | ObjectKind::Application => &[
            ReferenceField {
                field: "produced_event_version_ids",
                target: ObjectKind::Event,
            },
            ReferenceField {
                field: "consumed_event_version_ids",
                target: ObjectKind::Event,
            },
        ],
        _ => &[],
    }
}

/// Find the declared reference field a diff pointer path lands on, if any.
///
/// The leaf segment names the field; for array-valued reference fields the
/// leaf is an index and the parent segment names the field.
pub fn reference_target(kind: ObjectKind, path: &str) -> Option<ObjectKind> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let field = match segments.last() {
        Some(last) if last.parse::<usize>().is_ok() => {
            if segments.len() >= 2 {
                segments.get(segments.len() - 2).copied()
            } else {
                None
            }
        }
        Some(last) => Some(*last),
        None => None,
    }?;
    reference_fields(kind)
        .iter()
        .find(|r| r.field == field)
        .map(|r| r.target)
}

/// Human-readable resolution of one referenced version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedReference {
    /// The reference points at a known version.
    Resolved {
        display_name: Option<String>,
        version: String,
        /// For event references: the event's own resolved diff, one level deep.
        #[serde(skip_serializing_if = "Option::is_none")]
        nested: Option<Box<ResolvedDiff>>,
    },
    /// Only the replaced (old) id could be resolved; the reference was
    /// removed upstream.
    Removed {
        display_name: Option<String>,
        version: String,
    },
    /// Neither the new nor the old id resolved anywhere.
    Unknown,
}

/// One diff entry, optionally annotated with a resolved reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDelta {
    pub delta: FieldDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ResolvedReference>,
}

/// A diff with every reference entry resolved to names and versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDiff {
    pub entries: BTreeMap<String, AnnotatedDelta>,
}

/// Annotate `diff` (computed for an object of `kind`) by resolving every
/// reference entry. Never fails: resolution gaps degrade to markers.
pub async fn annotate_diff<P: CatalogPlatform>(
    kind: ObjectKind,
    diff: &SettingsDiff,
    log: &TransactionLog,
    platform: &P,
) -> ResolvedDiff {
    let mut entries = BTreeMap::new();
    for (path, delta) in &diff.entries {
        let reference = match reference_target(kind, path) {
            Some(target) => Some(resolve_with_nesting(target, delta, log, platform).await),
            None => None,
        };
        entries.insert(
            path.clone(),
            AnnotatedDelta {
                delta: delta.clone(),
                reference,
            },
        );
    }
    ResolvedDiff { entries }
}

/// Resolve one reference; event targets found in the transaction log get
/// their own recorded diff annotated one level further.
async fn resolve_with_nesting<P: CatalogPlatform>(
    target: ObjectKind,
    delta: &FieldDelta,
    log: &TransactionLog,
    platform: &P,
) -> ResolvedReference {
    let resolved = resolve_leaf(target, delta, log, platform).await;
    if target != ObjectKind::Event {
        return resolved;
    }
    match resolved {
        ResolvedReference::Resolved {
            display_name,
            version,
            ..
        } => {
            let nested = match new_id(delta)
                .and_then(|id| log.find_version(target, &id))
                .and_then(|entry| entry.diff.as_ref())
            {
                Some(event_diff) => Some(Box::new(
                    annotate_nested(ObjectKind::Event, event_diff, log, platform).await,
                )),
                None => None,
            };
            ResolvedReference::Resolved {
                display_name,
                version,
                nested,
            }
        }
        other => other,
    }
}

/// Second pass: annotate an event's own diff without further nesting.
async fn annotate_nested<P: CatalogPlatform>(
    kind: ObjectKind,
    diff: &SettingsDiff,
    log: &TransactionLog,
    platform: &P,
) -> ResolvedDiff {
    let mut entries = BTreeMap::new();
    for (path, delta) in &diff.entries {
        let reference = match reference_target(kind, path) {
            Some(target) => Some(resolve_leaf(target, delta, log, platform).await),
            None => None,
        };
        entries.insert(
            path.clone(),
            AnnotatedDelta {
                delta: delta.clone(),
                reference,
            },
        );
    }
    ResolvedDiff { entries }
}

fn new_id(delta: &FieldDelta) -> Option<VersionId> {
    as_version_id(&delta.to)
}

fn as_version_id(value: &Value) -> Option<VersionId> {
    value.as_str().map(|s| VersionId(s.to_string()))
}

/// The three-step lookup: transaction log, live read, marker.
async fn resolve_leaf<P: CatalogPlatform>(
    target: ObjectKind,
    delta: &FieldDelta,
    log: &TransactionLog,
    platform: &P,
) -> ResolvedReference {
    // (1) the new id, against this run's transaction log
    if let Some(id) = as_version_id(&delta.to) {
        if let Some(entry) = log.find_version(target, &id) {
            if let Some(version) = entry.after.as_ref().or(entry.before.as_ref()) {
                return ResolvedReference::Resolved {
                    display_name: version.display_name.clone(),
                    version: version.version.clone(),
                    nested: None,
                };
            }
        }

        // (2a) the new id, live: the run did not touch the referenced object
        match platform.get_version(&id).await {
            Ok(Some(version)) => {
                return ResolvedReference::Resolved {
                    display_name: version.display_name,
                    version: version.version,
                    nested: None,
                };
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(event = "refresolve.lookup_failed", version_id = %id, error = %err);
            }
        }
    }

    // (2b) the old id, live: the reference was removed upstream
    if let Some(id) = as_version_id(&delta.from) {
        match platform.get_version(&id).await {
            Ok(Some(version)) => {
                return ResolvedReference::Removed {
                    display_name: version.display_name,
                    version: version.version,
                };
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(event = "refresolve.lookup_failed", version_id = %id, error = %err);
            }
        }
    }

    // (3) nothing resolved
    ResolvedReference::Unknown
}
