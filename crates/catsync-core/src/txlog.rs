//! Run-scoped, append-only log of task outcomes.
//!
//! Later tasks query the log to resolve references to versions created
//! earlier in the same run; the summary consumes it in execution order. The
//! log lives and dies with the run, it is never persisted.

use catsync_platform::{ObjectId, ObjectKind, VersionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::TaskResult;

/// Ordered record of every task outcome in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLog {
    pub run_id: Uuid,
    entries: Vec<TaskResult>,
}

impl TransactionLog {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            entries: Vec::new(),
        }
    }

    /// Append one task outcome. Entries keep execution order.
    pub fn append(&mut self, result: TaskResult) {
        self.entries.push(result);
    }

    /// All entries recorded so far, in execution order.
    pub fn entries(&self) -> &[TaskResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry whose task produced or matched the given version.
    pub fn find_version(&self, kind: ObjectKind, version_id: &VersionId) -> Option<&TaskResult> {
        self.entries.iter().find(|r| {
            r.kind == kind && r.keys.version_id.as_ref() == Some(version_id)
        })
    }

    /// Find the entry for the given object id.
    pub fn find_object(&self, kind: ObjectKind, object_id: &ObjectId) -> Option<&TaskResult> {
        self.entries
            .iter()
            .find(|r| r.kind == kind && r.keys.object_id.as_ref() == Some(object_id))
    }

    /// Whether an object was already reconciled in this run.
    pub fn contains(&self, kind: ObjectKind, domain: &str, name: &str) -> bool {
        self.entries
            .iter()
            .any(|r| r.kind == kind && r.keys.domain == domain && r.keys.name == name)
    }
}
