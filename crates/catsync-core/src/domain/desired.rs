//! Desired state records, the input to every reconciliation task.

use catsync_platform::{LifecycleState, ObjectKind};
use serde::{Deserialize, Serialize};

/// Whether the object should exist after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetState {
    Present,
    Absent,
}

/// Rule for choosing the next version string when an update is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStrategy {
    BumpPatch,
    BumpMinor,
    BumpMajor,
    Exact,
}

/// Requested version string plus the strategy governing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    pub version: String,
    pub strategy: VersionStrategy,
}

impl VersionSpec {
    pub fn exact(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            strategy: VersionStrategy::Exact,
        }
    }

    pub fn bump_patch(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            strategy: VersionStrategy::BumpPatch,
        }
    }
}

/// The target configuration for one managed object.
///
/// Produced by a front-end collaborator (document importer or platform
/// replayer); the engine treats it as fully specified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    pub kind: ObjectKind,
    /// Owning application domain name (before prefixing). Ignored for
    /// application domains themselves, which use `name`.
    pub domain: String,
    pub name: String,
    pub shared: bool,
    /// Kind-specific settings payload, compared structurally against the
    /// latest existing version.
    pub settings: serde_json::Value,
    pub version: VersionSpec,
    pub lifecycle: LifecycleState,
    pub target: TargetState,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

impl DesiredState {
    /// Key identifying the managed object this record targets.
    pub fn object_key(&self) -> (ObjectKind, String, String) {
        (self.kind, self.domain.clone(), self.name.clone())
    }
}
