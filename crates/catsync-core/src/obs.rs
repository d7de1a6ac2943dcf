//! Structured observability hooks for the run lifecycle.
//!
//! Provides a run-scoped tracing span via the `RunSpan` RAII guard plus
//! emission helpers for the key lifecycle events: run start, task executed,
//! policy warning, issue recorded, run finished. Events are emitted at
//! `info!` level; configure verbosity via `RUST_LOG`.

use catsync_platform::ObjectKind;
use tracing::info;

use crate::domain::{RunMode, TaskAction};

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("catsync.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, mode: RunMode, checkmode: bool) {
    info!(event = "run.started", run_id = %run_id, mode = %mode, checkmode = checkmode);
}

/// Emit event: one task executed with its chosen action.
pub fn emit_task_executed(run_id: &str, kind: ObjectKind, name: &str, action: TaskAction) {
    info!(
        event = "task.executed",
        run_id = %run_id,
        kind = %kind,
        name = %name,
        action = %action,
    );
}

/// Emit event: the enforcement policy allowed an action with a warning.
pub fn emit_policy_warning(run_id: &str, domain: &str, reason: &str) {
    tracing::warn!(event = "policy.warning", run_id = %run_id, domain = %domain, reason = %reason);
}

/// Emit event: a per-object issue was recorded without aborting the batch.
pub fn emit_issue_recorded(run_id: &str, kind: ObjectKind, source_id: &str) {
    tracing::warn!(event = "issue.recorded", run_id = %run_id, kind = %kind, source = %source_id);
}

/// Emit event: run finished with the number of recorded task results.
pub fn emit_run_finished(run_id: &str, total_results: usize, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        total_results = total_results,
        success = success,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_span_enter_does_not_panic() {
        let _span = RunSpan::enter("test-run-id");
    }
}
