//! Recorded outcome of one reconciliation task.

use catsync_platform::{CatalogVersion, ObjectId, ObjectKind, VersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diff::SettingsDiff;

/// The action a task chose (or, under checkmode, would have chosen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskAction {
    NoAction,
    CreateFirstVersion,
    WouldCreateFirstVersion,
    CreateNewVersion,
    WouldCreateNewVersion,
    WouldFailCreateNewVersionOnExactVersionRequirement,
    Delete,
    WouldDelete,
}

impl TaskAction {
    /// Whether executing this action mutates the platform.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            TaskAction::CreateFirstVersion | TaskAction::CreateNewVersion | TaskAction::Delete
        )
    }

    /// Whether this action (real or predicted) represents a change.
    pub fn is_change(&self) -> bool {
        !matches!(self, TaskAction::NoAction)
    }

    /// The real action a checkmode prediction corresponds to, for comparing
    /// a dry run against the following real run.
    pub fn realized(&self) -> TaskAction {
        match self {
            TaskAction::WouldCreateFirstVersion => TaskAction::CreateFirstVersion,
            TaskAction::WouldCreateNewVersion => TaskAction::CreateNewVersion,
            TaskAction::WouldDelete => TaskAction::Delete,
            other => *other,
        }
    }
}

impl std::fmt::Display for TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskAction::NoAction => "NO_ACTION",
            TaskAction::CreateFirstVersion => "CREATE_FIRST_VERSION",
            TaskAction::WouldCreateFirstVersion => "WOULD_CREATE_FIRST_VERSION",
            TaskAction::CreateNewVersion => "CREATE_NEW_VERSION",
            TaskAction::WouldCreateNewVersion => "WOULD_CREATE_NEW_VERSION",
            TaskAction::WouldFailCreateNewVersionOnExactVersionRequirement => {
                "WOULD_FAIL_CREATE_NEW_VERSION_ON_EXACT_VERSION_REQUIREMENT"
            }
            TaskAction::Delete => "DELETE",
            TaskAction::WouldDelete => "WOULD_DELETE",
        };
        write!(f, "{}", s)
    }
}

/// Platform identifiers of the object a task touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectKeys {
    pub domain: String,
    pub name: String,
    /// Unset when the object does not exist (yet).
    pub object_id: Option<ObjectId>,
    /// Version produced or matched by the task, when any.
    pub version_id: Option<VersionId>,
}

/// The outcome of one task execution, appended to the transaction log.
///
/// One struct covers all resource kinds; `kind` is the discriminant and
/// `before`/`after` carry the version snapshots around the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub kind: ObjectKind,
    pub keys: ObjectKeys,
    pub action: TaskAction,
    /// Latest existing version before the task ran, if any.
    pub before: Option<CatalogVersion>,
    /// Version in place after the task (new, or the unchanged existing one).
    pub after: Option<CatalogVersion>,
    /// Structural difference that triggered the action, when one was computed.
    pub diff: Option<SettingsDiff>,
    /// Set when the enforcement policy allowed the action with a warning.
    pub policy_warning: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Run context frames active during execution.
    pub context: Vec<String>,
}
