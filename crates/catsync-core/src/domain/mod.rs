//! Domain models for the reconciliation engine.
//!
//! Canonical definitions for the core entities:
//! - `DesiredState`: the target configuration a task reconciles toward
//! - `TaskResult`: the recorded outcome of one reconciliation
//! - `RunContext`: run-scoped provenance threaded through all operations
//! - `ReconcileError`: the tagged error taxonomy

pub mod context;
pub mod desired;
pub mod error;
pub mod task_result;

pub use context::{RunContext, RunMode};
pub use desired::{DesiredState, TargetState, VersionSpec, VersionStrategy};
pub use error::{ErrorKind, ReconcileError, Result};
pub use task_result::{ObjectKeys, TaskAction, TaskResult};
