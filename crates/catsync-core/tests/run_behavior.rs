//! Run-level propagation behavior: bulk delete runs collect issues and keep
//! going, present runs abort on the first fatal error while keeping every
//! result recorded before the abort, and conflicting batches are rejected
//! up front.

use std::collections::BTreeSet;

use async_trait::async_trait;
use catsync_core::{
    DesiredState, EnforcementPolicy, ErrorKind, LifecycleState, ObjectKind, RunConfig, RunMode,
    RunOrchestrator, TargetState, TaskAction, VersionSpec,
};
use catsync_platform::fakes::MemoryCatalogPlatform;
use catsync_platform::{
    CatalogObject, CatalogPlatform, CatalogVersion, CreateObject, CreateVersion, ObjectId,
    PlatformError, PlatformResult, VersionId,
};
use serde_json::json;

/// Delegates to the in-memory fake but rejects deletion of one object.
struct FlakyPlatform {
    inner: MemoryCatalogPlatform,
    poison_name: String,
}

impl FlakyPlatform {
    fn new(poison_name: &str) -> Self {
        Self {
            inner: MemoryCatalogPlatform::new(),
            poison_name: poison_name.to_string(),
        }
    }

    async fn poisoned_id(&self) -> Option<ObjectId> {
        // Scan across domains for the poisoned object name.
        for kind in [ObjectKind::Enumeration, ObjectKind::Schema] {
            for domain in self.domains().await {
                if let Ok(Some(o)) = self
                    .inner
                    .find_object(kind, Some(&domain), &self.poison_name)
                    .await
                {
                    return Some(o.id);
                }
            }
        }
        None
    }

    async fn domains(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        if let Ok(Some(d)) = self
            .inner
            .find_object(ObjectKind::ApplicationDomain, None, "d1")
            .await
        {
            out.push(d.id);
        }
        out
    }
}

#[async_trait]
impl CatalogPlatform for FlakyPlatform {
    async fn find_object(
        &self,
        kind: ObjectKind,
        domain_id: Option<&ObjectId>,
        name: &str,
    ) -> PlatformResult<Option<CatalogObject>> {
        self.inner.find_object(kind, domain_id, name).await
    }

    async fn latest_version(
        &self,
        object_id: &ObjectId,
    ) -> PlatformResult<Option<CatalogVersion>> {
        self.inner.latest_version(object_id).await
    }

    async fn get_version(&self, version_id: &VersionId) -> PlatformResult<Option<CatalogVersion>> {
        self.inner.get_version(version_id).await
    }

    async fn list_versions(&self, object_id: &ObjectId) -> PlatformResult<Vec<CatalogVersion>> {
        self.inner.list_versions(object_id).await
    }

    async fn create_object(&self, request: CreateObject) -> PlatformResult<CatalogObject> {
        self.inner.create_object(request).await
    }

    async fn create_version(&self, request: CreateVersion) -> PlatformResult<CatalogVersion> {
        if request.version == "6.6.6" {
            return Err(PlatformError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        self.inner.create_version(request).await
    }

    async fn delete_object(&self, object_id: &ObjectId) -> PlatformResult<()> {
        if Some(object_id.clone()) == self.poisoned_id().await {
            return Err(PlatformError::Api {
                status: 500,
                message: "delete rejected".to_string(),
            });
        }
        self.inner.delete_object(object_id).await
    }
}

fn config() -> RunConfig {
    RunConfig {
        run_id: None,
        mode: RunMode::Release,
        checkmode: false,
        policy: EnforcementPolicy::Off,
        owned_domains: BTreeSet::new(),
        domain_prefix: None,
    }
}

fn item(kind: ObjectKind, name: &str, target: TargetState) -> DesiredState {
    DesiredState {
        kind,
        domain: if kind == ObjectKind::ApplicationDomain {
            name.to_string()
        } else {
            "d1".to_string()
        },
        name: name.to_string(),
        shared: false,
        settings: json!({"marker": name}),
        version: VersionSpec::exact("1.0.0"),
        lifecycle: LifecycleState::Released,
        target,
        display_name: None,
        description: None,
    }
}

#[tokio::test]
async fn bulk_delete_collects_issues_and_continues() {
    let platform = FlakyPlatform::new("poisoned");

    // Seed: domain plus two enumerations, one of them poisoned for delete.
    let report = RunOrchestrator::new(&platform, config())
        .run(vec![
            item(ObjectKind::ApplicationDomain, "d1", TargetState::Present),
            item(ObjectKind::Enumeration, "poisoned", TargetState::Present),
            item(ObjectKind::Enumeration, "healthy", TargetState::Present),
        ])
        .await;
    assert!(report.succeeded());

    let report = RunOrchestrator::new(&platform, config())
        .run(vec![
            item(ObjectKind::Enumeration, "poisoned", TargetState::Absent),
            item(ObjectKind::Enumeration, "healthy", TargetState::Absent),
        ])
        .await;

    // The failing delete became an issue; the batch still made progress.
    assert!(report.succeeded(), "issues do not abort an absent run");
    assert_eq!(report.issue_count, 1);
    assert_eq!(report.issues[0].kind, ObjectKind::Enumeration);
    assert_eq!(report.issues[0].source_id, "d1/poisoned");
    assert_eq!(report.issues[0].cause.kind, ErrorKind::PlatformApi);
    assert_eq!(report.counters[&ObjectKind::Enumeration].deleted, 1);

    // The healthy object is gone, the poisoned one survives.
    let domain = platform
        .find_object(ObjectKind::ApplicationDomain, None, "d1")
        .await
        .unwrap()
        .unwrap();
    assert!(platform
        .find_object(ObjectKind::Enumeration, Some(&domain.id), "healthy")
        .await
        .unwrap()
        .is_none());
    assert!(platform
        .find_object(ObjectKind::Enumeration, Some(&domain.id), "poisoned")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn present_run_aborts_on_platform_error_keeping_prior_results() {
    let platform = FlakyPlatform::new("unused");

    let mut failing = item(ObjectKind::Schema, "s-fail", TargetState::Present);
    failing.version = VersionSpec::exact("6.6.6");

    let report = RunOrchestrator::new(&platform, config())
        .run(vec![
            item(ObjectKind::ApplicationDomain, "d1", TargetState::Present),
            failing,
            item(ObjectKind::Schema, "s-later", TargetState::Present),
        ])
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.run_error.as_ref().unwrap().kind, ErrorKind::PlatformApi);

    // The domain result recorded before the abort is preserved; the later
    // schema never ran.
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].kind, ObjectKind::ApplicationDomain);
    assert_eq!(report.results[0].action, TaskAction::CreateFirstVersion);
}

#[tokio::test]
async fn conflicting_batch_is_rejected_before_any_task_runs() {
    let platform = MemoryCatalogPlatform::new();

    let mut conflicting = item(ObjectKind::Schema, "s1", TargetState::Present);
    conflicting.settings = json!({"marker": "different"});

    let report = RunOrchestrator::new(&platform, config())
        .run(vec![
            item(ObjectKind::ApplicationDomain, "d1", TargetState::Present),
            item(ObjectKind::Schema, "s1", TargetState::Present),
            conflicting,
        ])
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.run_error.as_ref().unwrap().kind, ErrorKind::Consistency);
    assert!(report.results.is_empty());
    assert_eq!(platform.mutation_count(), 0);
}

#[tokio::test]
async fn identical_duplicates_reconcile_once() {
    let platform = MemoryCatalogPlatform::new();

    let report = RunOrchestrator::new(&platform, config())
        .run(vec![
            item(ObjectKind::ApplicationDomain, "d1", TargetState::Present),
            item(ObjectKind::Schema, "s1", TargetState::Present),
            item(ObjectKind::Schema, "s1", TargetState::Present),
        ])
        .await;

    assert!(report.succeeded());
    assert_eq!(report.counters[&ObjectKind::Schema].processed, 1);
}

#[tokio::test]
async fn rerun_after_abort_is_idempotent() {
    let platform = FlakyPlatform::new("unused");

    let mut failing = item(ObjectKind::Schema, "s-fail", TargetState::Present);
    failing.version = VersionSpec::exact("6.6.6");

    let aborted = RunOrchestrator::new(&platform, config())
        .run(vec![
            item(ObjectKind::ApplicationDomain, "d1", TargetState::Present),
            failing,
        ])
        .await;
    assert!(!aborted.succeeded());

    // Re-running the healthy subset converges: the domain created before the
    // abort resolves to no action.
    let report = RunOrchestrator::new(&platform, config())
        .run(vec![item(
            ObjectKind::ApplicationDomain,
            "d1",
            TargetState::Present,
        )])
        .await;
    assert!(report.succeeded());
    assert_eq!(
        report.results[0].action,
        TaskAction::NoAction
    );
}
