//! Per-object reconciliation task.
//!
//! Drives one managed object from its current platform state to the desired
//! state: resolve existing, decide the object action, decide the version
//! action, execute (or simulate under checkmode), record. At most one
//! create-object and one create-version call are issued per execution, and
//! the outcome is appended to the transaction log before it is returned.

use std::collections::BTreeSet;

use catsync_platform::{
    CatalogObject, CatalogPlatform, CatalogVersion, CreateObject, CreateVersion, ObjectId,
    ObjectKind,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::diff::{diff_settings, SettingsDiff};
use crate::domain::{
    DesiredState, ObjectKeys, ReconcileError, Result, RunContext, TargetState, TaskAction,
    TaskResult, VersionStrategy,
};
use crate::policy::{evaluate, EnforcementPolicy, PolicyDecision};
use crate::txlog::TransactionLog;
use crate::{obs, version};

/// Reconciles one [`DesiredState`] against the platform.
pub struct ManagedObjectTask<'a, P: CatalogPlatform> {
    platform: &'a P,
    checkmode: bool,
    policy: EnforcementPolicy,
    owned_domains: &'a BTreeSet<String>,
}

impl<'a, P: CatalogPlatform> ManagedObjectTask<'a, P> {
    pub fn new(
        platform: &'a P,
        checkmode: bool,
        policy: EnforcementPolicy,
        owned_domains: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            platform,
            checkmode,
            policy,
            owned_domains,
        }
    }

    /// Execute the task and append its result to `log`.
    pub async fn execute(
        &self,
        desired: &DesiredState,
        ctx: &mut RunContext,
        log: &mut TransactionLog,
    ) -> Result<TaskResult> {
        ctx.push(format!("{}:{}", desired.kind, desired.name));
        let outcome = self.run(desired, ctx, log).await;
        ctx.pop();
        outcome
    }

    async fn run(
        &self,
        desired: &DesiredState,
        ctx: &RunContext,
        log: &mut TransactionLog,
    ) -> Result<TaskResult> {
        let attach = |e: ReconcileError| e.with_context(ctx.frames());

        // The effective owning domain name; application domains own themselves.
        let domain_name = if desired.kind == ObjectKind::ApplicationDomain {
            ctx.effective_domain(&desired.name)
        } else {
            ctx.effective_domain(&desired.domain)
        };
        let object_name = if desired.kind == ObjectKind::ApplicationDomain {
            domain_name.clone()
        } else {
            desired.name.clone()
        };

        if desired.target == TargetState::Present {
            version::parse(&desired.version.version).map_err(attach)?;
        }

        // RESOLVE_EXISTING
        let domain_id = self
            .resolve_domain_id(desired, &domain_name)
            .await
            .map_err(attach)?;
        let existing = match (&domain_id, desired.kind) {
            (_, ObjectKind::ApplicationDomain) => {
                self.platform
                    .find_object(desired.kind, None, &object_name)
                    .await
                    .map_err(|e| attach(e.into()))?
            }
            (Some(id), _) => self
                .platform
                .find_object(desired.kind, Some(id), &object_name)
                .await
                .map_err(|e| attach(e.into()))?,
            // Owning domain absent: the object cannot exist either.
            (None, _) => None,
        };

        let result = match desired.target {
            TargetState::Absent => {
                self.run_absent(desired, &domain_name, &object_name, existing, ctx)
                    .await?
            }
            TargetState::Present => {
                self.run_present(
                    desired,
                    &domain_name,
                    &object_name,
                    domain_id,
                    existing,
                    ctx,
                )
                .await?
            }
        };

        obs::emit_task_executed(
            &ctx.run_id.to_string(),
            desired.kind,
            &result.keys.name,
            result.action,
        );
        // RECORD before returning.
        log.append(result.clone());
        Ok(result)
    }

    /// Owning domain id for non-domain kinds; `None` when absent (only
    /// tolerated under checkmode or for absent targets).
    async fn resolve_domain_id(
        &self,
        desired: &DesiredState,
        domain_name: &str,
    ) -> Result<Option<ObjectId>> {
        if desired.kind == ObjectKind::ApplicationDomain {
            return Ok(None);
        }
        let domain = self
            .platform
            .find_object(ObjectKind::ApplicationDomain, None, domain_name)
            .await?;
        match domain {
            Some(d) => Ok(Some(d.id)),
            None => {
                if desired.target == TargetState::Absent || self.checkmode {
                    // A dry run may predict the domain's creation earlier in
                    // the same plan; the object is then simply missing.
                    Ok(None)
                } else {
                    Err(ReconcileError::validation(format!(
                        "owning application domain '{}' not found; domains are reconciled first",
                        domain_name
                    )))
                }
            }
        }
    }

    fn check_policy(
        &self,
        domain_name: &str,
        action: TaskAction,
        ctx: &RunContext,
    ) -> Result<Option<String>> {
        match evaluate(self.policy, self.owned_domains, domain_name, action) {
            PolicyDecision::Allow => Ok(None),
            PolicyDecision::Warn { reason } => {
                obs::emit_policy_warning(&ctx.run_id.to_string(), domain_name, &reason);
                Ok(Some(reason))
            }
            PolicyDecision::Violation { reason } => Err(ReconcileError::policy(reason)
                .with_details(json!({ "domain": domain_name, "action": action }))
                .with_context(ctx.frames())),
        }
    }

    async fn run_absent(
        &self,
        desired: &DesiredState,
        domain_name: &str,
        object_name: &str,
        existing: Option<CatalogObject>,
        ctx: &RunContext,
    ) -> Result<TaskResult> {
        let Some(object) = existing else {
            return Ok(self.result(
                desired,
                TaskAction::NoAction,
                ObjectKeys {
                    domain: domain_name.to_string(),
                    name: object_name.to_string(),
                    object_id: None,
                    version_id: None,
                },
                None,
                None,
                None,
                None,
                ctx,
            ));
        };

        let action = if self.checkmode {
            TaskAction::WouldDelete
        } else {
            TaskAction::Delete
        };
        let policy_warning = self.check_policy(domain_name, action, ctx)?;

        let before = self
            .platform
            .latest_version(&object.id)
            .await
            .map_err(|e| ReconcileError::from(e).with_context(ctx.frames()))?;

        if !self.checkmode {
            // EXECUTE: cascades all versions.
            self.platform
                .delete_object(&object.id)
                .await
                .map_err(|e| ReconcileError::from(e).with_context(ctx.frames()))?;
        }

        Ok(self.result(
            desired,
            action,
            ObjectKeys {
                domain: domain_name.to_string(),
                name: object_name.to_string(),
                object_id: Some(object.id),
                version_id: before.as_ref().map(|v| v.id.clone()),
            },
            before,
            None,
            None,
            policy_warning,
            ctx,
        ))
    }

    async fn run_present(
        &self,
        desired: &DesiredState,
        domain_name: &str,
        object_name: &str,
        domain_id: Option<ObjectId>,
        existing: Option<CatalogObject>,
        ctx: &RunContext,
    ) -> Result<TaskResult> {
        let fail = |e: ReconcileError| e.with_context(ctx.frames());

        // DECIDE_VERSION_ACTION needs the latest existing version, if any.
        let latest = match &existing {
            Some(object) => self
                .platform
                .latest_version(&object.id)
                .await
                .map_err(|e| fail(e.into()))?,
            None => None,
        };

        let Some(latest) = latest else {
            // No existing version: create unconditionally, no diff possible.
            let action = if self.checkmode {
                TaskAction::WouldCreateFirstVersion
            } else {
                TaskAction::CreateFirstVersion
            };
            let policy_warning = self.check_policy(domain_name, action, ctx)?;

            let (object_id, created) = if self.checkmode {
                (existing.map(|o| o.id), None)
            } else {
                let object_id = match existing {
                    Some(object) => object.id,
                    None => {
                        // DECIDE_OBJECT_ACTION: the unversioned object first.
                        self.platform
                            .create_object(CreateObject {
                                kind: desired.kind,
                                name: object_name.to_string(),
                                domain_id: domain_id.clone(),
                                shared: desired.shared,
                            })
                            .await
                            .map_err(|e| fail(e.into()))?
                            .id
                    }
                };
                let created = self
                    .create_version(desired, &object_id, &desired.version.version)
                    .await
                    .map_err(fail)?;
                (Some(object_id), Some(created))
            };

            return Ok(self.result(
                desired,
                action,
                ObjectKeys {
                    domain: domain_name.to_string(),
                    name: object_name.to_string(),
                    object_id,
                    version_id: created.as_ref().map(|v| v.id.clone()),
                },
                None,
                created,
                None,
                policy_warning,
                ctx,
            ));
        };

        // Existing version present: only a material difference triggers work.
        let diff = diff_settings(&desired.settings, &latest.settings);
        if diff.is_empty() {
            return Ok(self.result(
                desired,
                TaskAction::NoAction,
                ObjectKeys {
                    domain: domain_name.to_string(),
                    name: object_name.to_string(),
                    object_id: Some(latest.object_id.clone()),
                    version_id: Some(latest.id.clone()),
                },
                Some(latest.clone()),
                Some(latest),
                None,
                None,
                ctx,
            ));
        }

        // Resolve the target version under the active strategy.
        if desired.version.strategy == VersionStrategy::Exact
            && !version::is_greater(&desired.version.version, &latest.version).map_err(fail)?
        {
            // A diff exists against a version that is not newer.
            if self.checkmode {
                return Ok(self.result(
                    desired,
                    TaskAction::WouldFailCreateNewVersionOnExactVersionRequirement,
                    ObjectKeys {
                        domain: domain_name.to_string(),
                        name: object_name.to_string(),
                        object_id: Some(latest.object_id.clone()),
                        version_id: Some(latest.id.clone()),
                    },
                    Some(latest),
                    None,
                    Some(diff),
                    None,
                    ctx,
                ));
            }
            return Err(fail(
                ReconcileError::validation(format!(
                    "exact version '{}' is not greater than existing version '{}' but an update is required",
                    desired.version.version, latest.version
                ))
                .with_details(json!({
                    "requested": desired.version.version,
                    "existing": latest.version,
                    "strategy": desired.version.strategy,
                    "difference": diff,
                })),
            ));
        }

        let target_version =
            version::resolve(&latest.version, desired.version.strategy, &desired.version.version)
                .map_err(fail)?;

        let action = if self.checkmode {
            TaskAction::WouldCreateNewVersion
        } else {
            TaskAction::CreateNewVersion
        };
        let policy_warning = self.check_policy(domain_name, action, ctx)?;

        let created = if self.checkmode {
            None
        } else {
            Some(
                self.create_version(desired, &latest.object_id, &target_version)
                    .await
                    .map_err(fail)?,
            )
        };

        Ok(self.result(
            desired,
            action,
            ObjectKeys {
                domain: domain_name.to_string(),
                name: object_name.to_string(),
                object_id: Some(latest.object_id.clone()),
                version_id: created
                    .as_ref()
                    .map(|v| v.id.clone())
                    .or(Some(latest.id.clone())),
            },
            Some(latest),
            created,
            Some(diff),
            policy_warning,
            ctx,
        ))
    }

    async fn create_version(
        &self,
        desired: &DesiredState,
        object_id: &ObjectId,
        version: &str,
    ) -> Result<CatalogVersion> {
        Ok(self
            .platform
            .create_version(CreateVersion {
                object_id: object_id.clone(),
                version: version.to_string(),
                state: desired.lifecycle,
                display_name: desired.display_name.clone(),
                description: desired.description.clone(),
                settings: desired.settings.clone(),
            })
            .await?)
    }

    #[allow(clippy::too_many_arguments)]
    fn result(
        &self,
        desired: &DesiredState,
        action: TaskAction,
        keys: ObjectKeys,
        before: Option<CatalogVersion>,
        after: Option<CatalogVersion>,
        diff: Option<SettingsDiff>,
        policy_warning: Option<String>,
        ctx: &RunContext,
    ) -> TaskResult {
        TaskResult {
            task_id: Uuid::new_v4(),
            kind: desired.kind,
            keys,
            action,
            before,
            after,
            diff,
            policy_warning,
            timestamp: Utc::now(),
            context: ctx.frames(),
        }
    }
}
