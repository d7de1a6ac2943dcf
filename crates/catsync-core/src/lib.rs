//! catsync core library
//!
//! Declarative, versioned reconciliation engine: diff-based update
//! detection, semantic-version strategy resolution, a per-run transaction
//! log for in-run reference resolution, cross-domain policy enforcement,
//! and run-level summarization and issue tracking.

pub mod diff;
pub mod domain;
pub mod obs;
pub mod orchestrator;
pub mod policy;
pub mod refresolve;
pub mod summary;
pub mod task;
pub mod telemetry;
pub mod txlog;
pub mod version;

pub use diff::{diff_settings, FieldDelta, SettingsDiff, IGNORED_FIELDS};

pub use domain::{
    DesiredState, ErrorKind, ObjectKeys, ReconcileError, Result, RunContext, RunMode, TargetState,
    TaskAction, TaskResult, VersionSpec, VersionStrategy,
};

pub use orchestrator::{RunConfig, RunOrchestrator};
pub use policy::{evaluate as evaluate_policy, EnforcementPolicy, PolicyDecision};
pub use refresolve::{
    annotate_diff, reference_fields, reference_target, AnnotatedDelta, ReferenceField,
    ResolvedDiff, ResolvedReference,
};
pub use summary::{
    write_report_json, IssueTracker, KindCounters, RunIssue, RunReport, RunSummary, RunWarning,
};
pub use task::ManagedObjectTask;
pub use telemetry::init_tracing;
pub use txlog::TransactionLog;

pub use catsync_platform::{
    CatalogObject, CatalogPlatform, CatalogVersion, LifecycleState, ObjectId, ObjectKind,
    VersionId,
};

/// catsync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
