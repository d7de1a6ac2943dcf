//! Run-level orchestration of reconciliation tasks.
//!
//! Owns the per-run context, transaction log and summary, and drives task
//! execution strictly sequentially in kind dependency order: application
//! domains, then enumerations and schemas, then events, then event APIs and
//! applications. The ordering is a correctness requirement: reference
//! resolution assumes the transaction log already holds every earlier
//! processed object a later one might reference.

use std::collections::{BTreeSet, HashMap};

use catsync_platform::{CatalogPlatform, ObjectKind};
use uuid::Uuid;

use crate::domain::{DesiredState, ReconcileError, RunContext, RunMode, TargetState};
use crate::obs;
use crate::policy::EnforcementPolicy;
use crate::summary::{RunReport, RunSummary};
use crate::task::ManagedObjectTask;
use crate::txlog::TransactionLog;

/// Configuration knobs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Fixed run id; generated when unset.
    pub run_id: Option<Uuid>,
    pub mode: RunMode,
    pub checkmode: bool,
    pub policy: EnforcementPolicy,
    /// Application domain names this run owns (after prefixing).
    pub owned_domains: BTreeSet<String>,
    pub domain_prefix: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_id: None,
            mode: RunMode::Release,
            checkmode: false,
            policy: EnforcementPolicy::Off,
            owned_domains: BTreeSet::new(),
            domain_prefix: None,
        }
    }
}

fn kind_rank(kind: ObjectKind) -> u8 {
    match kind {
        ObjectKind::ApplicationDomain => 0,
        ObjectKind::Enumeration | ObjectKind::Schema => 1,
        ObjectKind::Event => 2,
        ObjectKind::EventApi | ObjectKind::Application => 3,
    }
}

/// Drives ordered task execution for one batch of desired states.
pub struct RunOrchestrator<P: CatalogPlatform> {
    platform: P,
    config: RunConfig,
}

impl<P: CatalogPlatform> RunOrchestrator<P> {
    pub fn new(platform: P, config: RunConfig) -> Self {
        Self { platform, config }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Execute one run over `items` and return the finalized report.
    ///
    /// Fatal errors (validation, platform, policy, consistency) on
    /// present-target items abort the run after being recorded; failures on
    /// absent-target items are collected as issues and the batch continues.
    /// Task results recorded before an abort stay in the report.
    pub async fn run(&self, items: Vec<DesiredState>) -> RunReport {
        let run_id = self.config.run_id.unwrap_or_else(Uuid::new_v4);
        let _span = obs::RunSpan::enter(&run_id.to_string());
        obs::emit_run_started(
            &run_id.to_string(),
            self.config.mode,
            self.config.checkmode,
        );

        let mut ctx = RunContext::new(run_id, self.config.mode, self.config.domain_prefix.clone());
        let mut log = TransactionLog::new(run_id);
        let mut summary = RunSummary::new(run_id, self.config.mode, self.config.checkmode);

        let items = match dedupe(items) {
            Ok(items) => items,
            Err(err) => {
                let err = err.with_context(ctx.frames());
                summary.set_error(err);
                obs::emit_run_finished(&run_id.to_string(), 0, false);
                return summary.finalize();
            }
        };

        let mut ordered: Vec<DesiredState> = items;
        ordered.sort_by_key(|d| kind_rank(d.kind));

        for desired in &ordered {
            let task = ManagedObjectTask::new(
                &self.platform,
                self.config.checkmode,
                self.config.policy,
                &self.config.owned_domains,
            );
            match task.execute(desired, &mut ctx, &mut log).await {
                Ok(result) => summary.record(&result),
                Err(err) => {
                    let source_id = format!("{}/{}", desired.domain, desired.name);
                    if desired.target == TargetState::Absent {
                        // Independent deletions make best-effort progress.
                        obs::emit_issue_recorded(&run_id.to_string(), desired.kind, &source_id);
                        summary.add_issue(desired.kind, source_id, err);
                    } else {
                        summary.set_error(err);
                        obs::emit_run_finished(&run_id.to_string(), log.len(), false);
                        return summary.finalize();
                    }
                }
            }
        }

        obs::emit_run_finished(&run_id.to_string(), log.len(), true);
        summary.finalize()
    }
}

/// Collapse identical duplicate desired states and reject materially
/// different ones targeting the same managed object.
fn dedupe(items: Vec<DesiredState>) -> Result<Vec<DesiredState>, ReconcileError> {
    let mut seen: HashMap<(ObjectKind, String, String), usize> = HashMap::new();
    let mut out: Vec<DesiredState> = Vec::with_capacity(items.len());
    for item in items {
        let key = item.object_key();
        if let Some(index) = seen.get(&key).copied() {
            if out[index] != item {
                return Err(ReconcileError::consistency(format!(
                    "batch contains conflicting desired states for {} '{}' in domain '{}'",
                    item.kind, item.name, item.domain,
                ))
                .with_details(serde_json::json!({
                    "kind": item.kind,
                    "domain": item.domain,
                    "name": item.name,
                })));
            }
            // Identical duplicate: reconcile the object once.
        } else {
            seen.insert(key, out.len());
            out.push(item);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VersionSpec;
    use catsync_platform::LifecycleState;
    use serde_json::json;

    fn desired(kind: ObjectKind, name: &str) -> DesiredState {
        DesiredState {
            kind,
            domain: "acme".to_string(),
            name: name.to_string(),
            shared: false,
            settings: json!({"marker": name}),
            version: VersionSpec::exact("1.0.0"),
            lifecycle: LifecycleState::Released,
            target: TargetState::Present,
            display_name: None,
            description: None,
        }
    }

    #[test]
    fn kinds_rank_in_dependency_order() {
        assert!(kind_rank(ObjectKind::ApplicationDomain) < kind_rank(ObjectKind::Schema));
        assert_eq!(
            kind_rank(ObjectKind::Schema),
            kind_rank(ObjectKind::Enumeration)
        );
        assert!(kind_rank(ObjectKind::Schema) < kind_rank(ObjectKind::Event));
        assert!(kind_rank(ObjectKind::Event) < kind_rank(ObjectKind::EventApi));
    }

    #[test]
    fn dedupe_collapses_identical_duplicates() {
        let items = vec![
            desired(ObjectKind::Schema, "s1"),
            desired(ObjectKind::Schema, "s1"),
        ];
        let out = dedupe(items).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn dedupe_rejects_conflicting_duplicates() {
        let mut conflicting = desired(ObjectKind::Schema, "s1");
        conflicting.settings = json!({"marker": "different"});
        let items = vec![desired(ObjectKind::Schema, "s1"), conflicting];
        let err = dedupe(items).unwrap_err();
        assert_eq!(err.kind, crate::domain::ErrorKind::Consistency);
        assert!(err.message.contains("s1"));
    }
}
