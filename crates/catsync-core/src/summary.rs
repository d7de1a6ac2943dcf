//! Run-level accumulation of outcomes, warnings and issues.
//!
//! Every task result, policy warning and issue lands here; on completion the
//! summary is finalized into a [`RunReport`]: per-kind counters plus the full
//! ordered outcome list, both as a serializable object and as rendered text.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use catsync_platform::ObjectKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ReconcileError, RunMode, TaskAction, TaskResult};

/// A per-object failure collected during a bulk delete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunIssue {
    pub issue_id: Uuid,
    pub kind: ObjectKind,
    /// Identity of the object the failure traces back to ("domain/name").
    pub source_id: String,
    pub cause: ReconcileError,
    pub context: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Collects issues without aborting the batch; queryable by kind and source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueTracker {
    issues: Vec<RunIssue>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ObjectKind, source_id: impl Into<String>, cause: ReconcileError) {
        let context = cause.context.clone();
        self.issues.push(RunIssue {
            issue_id: Uuid::new_v4(),
            kind,
            source_id: source_id.into(),
            cause,
            context,
            timestamp: Utc::now(),
        });
    }

    pub fn all(&self) -> &[RunIssue] {
        &self.issues
    }

    pub fn by_kind(&self, kind: ObjectKind) -> Vec<&RunIssue> {
        self.issues.iter().filter(|i| i.kind == kind).collect()
    }

    pub fn by_source(&self, source_id: &str) -> Vec<&RunIssue> {
        self.issues
            .iter()
            .filter(|i| i.source_id == source_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A recorded non-fatal warning (policy or otherwise).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWarning {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-kind action counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounters {
    pub processed: u64,
    pub created_first_versions: u64,
    pub created_new_versions: u64,
    pub deleted: u64,
    pub unchanged: u64,
    pub would_fail_exact: u64,
}

/// Final, serializable outcome of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub checkmode: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counters: BTreeMap<ObjectKind, KindCounters>,
    pub warning_count: usize,
    pub issue_count: usize,
    /// Every task outcome, in execution order.
    pub results: Vec<TaskResult>,
    pub warnings: Vec<RunWarning>,
    pub issues: Vec<RunIssue>,
    /// The fatal error that aborted the run, if any.
    pub run_error: Option<ReconcileError>,
}

impl RunReport {
    /// Whether the run finished without a fatal error. Warnings and issues
    /// alone do not make a run unsuccessful.
    pub fn succeeded(&self) -> bool {
        self.run_error.is_none()
    }

    /// Render the human-readable report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("# Run Report\n\n");
        out.push_str(&format!(
            "run {} ({}){}\n\n",
            self.run_id,
            self.mode,
            if self.checkmode { ", checkmode" } else { "" },
        ));

        out.push_str("## Actions\n");
        for (kind, c) in &self.counters {
            out.push_str(&format!(
                "- {}: processed {}, first versions {}, new versions {}, deleted {}, unchanged {}\n",
                kind, c.processed, c.created_first_versions, c.created_new_versions, c.deleted,
                c.unchanged,
            ));
            if c.would_fail_exact > 0 {
                out.push_str(&format!(
                    "  ({} would fail on exact version requirement)\n",
                    c.would_fail_exact
                ));
            }
        }

        out.push_str(&format!("\n## Warnings ({})\n", self.warning_count));
        for w in &self.warnings {
            out.push_str(&format!("- {}\n", w.message));
        }

        out.push_str(&format!("\n## Issues ({})\n", self.issue_count));
        for issue in &self.issues {
            out.push_str(&format!(
                "- [{}] {} ({}): {}\n",
                issue.issue_id, issue.source_id, issue.kind, issue.cause,
            ));
        }

        match &self.run_error {
            Some(err) => out.push_str(&format!("\n## Run Error\n- {}\n", err)),
            None => out.push_str("\n## Run Error\n- none\n"),
        }
        out
    }
}

/// Write a report as pretty JSON for programmatic consumption.
pub fn write_report_json(path: &Path, report: &RunReport) -> AnyResult<()> {
    let content = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Accumulates outcomes while a run executes; finalized into a [`RunReport`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    run_id: Uuid,
    mode: RunMode,
    checkmode: bool,
    started_at: DateTime<Utc>,
    results: Vec<TaskResult>,
    warnings: Vec<RunWarning>,
    issues: IssueTracker,
    run_error: Option<ReconcileError>,
}

impl RunSummary {
    pub fn new(run_id: Uuid, mode: RunMode, checkmode: bool) -> Self {
        Self {
            run_id,
            mode,
            checkmode,
            started_at: Utc::now(),
            results: Vec::new(),
            warnings: Vec::new(),
            issues: IssueTracker::new(),
            run_error: None,
        }
    }

    /// Record one task outcome. A policy warning attached to the result is
    /// promoted into the run's warning list.
    pub fn record(&mut self, result: &TaskResult) {
        if let Some(warning) = &result.policy_warning {
            self.warn(warning.clone());
        }
        self.results.push(result.clone());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(RunWarning {
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn add_issue(
        &mut self,
        kind: ObjectKind,
        source_id: impl Into<String>,
        cause: ReconcileError,
    ) {
        self.issues.add(kind, source_id, cause);
    }

    pub fn issues(&self) -> &IssueTracker {
        &self.issues
    }

    /// Record the fatal error that aborts this run.
    pub fn set_error(&mut self, error: ReconcileError) {
        self.run_error = Some(error);
    }

    pub fn has_error(&self) -> bool {
        self.run_error.is_some()
    }

    /// Compute counters and freeze into a report.
    pub fn finalize(self) -> RunReport {
        let mut counters: BTreeMap<ObjectKind, KindCounters> = BTreeMap::new();
        for result in &self.results {
            let c = counters.entry(result.kind).or_default();
            c.processed += 1;
            match result.action {
                TaskAction::CreateFirstVersion | TaskAction::WouldCreateFirstVersion => {
                    c.created_first_versions += 1
                }
                TaskAction::CreateNewVersion | TaskAction::WouldCreateNewVersion => {
                    c.created_new_versions += 1
                }
                TaskAction::Delete | TaskAction::WouldDelete => c.deleted += 1,
                TaskAction::NoAction => c.unchanged += 1,
                TaskAction::WouldFailCreateNewVersionOnExactVersionRequirement => {
                    c.would_fail_exact += 1
                }
            }
        }

        RunReport {
            run_id: self.run_id,
            mode: self.mode,
            checkmode: self.checkmode,
            started_at: self.started_at,
            finished_at: Utc::now(),
            counters,
            warning_count: self.warnings.len(),
            issue_count: self.issues.len(),
            results: self.results,
            warnings: self.warnings,
            issues: self.issues.issues,
            run_error: self.run_error,
        }
    }
}
