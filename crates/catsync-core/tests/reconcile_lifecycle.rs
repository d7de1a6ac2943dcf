//! End-to-end reconciliation lifecycle: first creation, idempotent re-runs,
//! exact-version conflicts and monotonic bump sequences.

use std::collections::BTreeSet;

use catsync_core::{
    DesiredState, EnforcementPolicy, ErrorKind, LifecycleState, ObjectKind, RunConfig,
    RunMode, RunOrchestrator, TargetState, TaskAction, VersionSpec, VersionStrategy,
};
use catsync_platform::fakes::MemoryCatalogPlatform;
use serde_json::json;

fn config(checkmode: bool) -> RunConfig {
    RunConfig {
        run_id: None,
        mode: RunMode::Release,
        checkmode,
        policy: EnforcementPolicy::Off,
        owned_domains: BTreeSet::new(),
        domain_prefix: None,
    }
}

fn domain(name: &str) -> DesiredState {
    DesiredState {
        kind: ObjectKind::ApplicationDomain,
        domain: name.to_string(),
        name: name.to_string(),
        shared: false,
        settings: json!({"description": "domain"}),
        version: VersionSpec::exact("1.0.0"),
        lifecycle: LifecycleState::Released,
        target: TargetState::Present,
        display_name: None,
        description: None,
    }
}

fn schema(content: serde_json::Value, version: &str, strategy: VersionStrategy) -> DesiredState {
    DesiredState {
        kind: ObjectKind::Schema,
        domain: "d1".to_string(),
        name: "s1".to_string(),
        shared: false,
        settings: json!({"content": content}),
        version: VersionSpec {
            version: version.to_string(),
            strategy,
        },
        lifecycle: LifecycleState::Released,
        target: TargetState::Present,
        display_name: None,
        description: None,
    }
}

fn schema_action(report: &catsync_core::RunReport) -> TaskAction {
    report
        .results
        .iter()
        .find(|r| r.kind == ObjectKind::Schema)
        .expect("schema result")
        .action
}

#[tokio::test]
async fn exact_version_scenario() {
    let platform = MemoryCatalogPlatform::new();
    let c1 = json!({"type": "object", "fields": ["a"]});
    let c2 = json!({"type": "object", "fields": ["a", "b"]});

    // First run: object plus first version "1.0.0".
    let report = RunOrchestrator::new(&platform, config(false))
        .run(vec![
            domain("d1"),
            schema(c1.clone(), "1.0.0", VersionStrategy::Exact),
        ])
        .await;
    assert!(report.succeeded());
    assert_eq!(schema_action(&report), TaskAction::CreateFirstVersion);
    let first = report
        .results
        .iter()
        .find(|r| r.kind == ObjectKind::Schema)
        .unwrap();
    assert_eq!(first.after.as_ref().unwrap().version, "1.0.0");

    // Identical input again: idempotent, no new version.
    let report = RunOrchestrator::new(&platform, config(false))
        .run(vec![
            domain("d1"),
            schema(c1.clone(), "1.0.0", VersionStrategy::Exact),
        ])
        .await;
    assert!(report.succeeded());
    assert_eq!(schema_action(&report), TaskAction::NoAction);
    let unchanged = report
        .results
        .iter()
        .find(|r| r.kind == ObjectKind::Schema)
        .unwrap();
    assert_eq!(unchanged.after.as_ref().unwrap().version, "1.0.0");

    // Changed content with the same exact version: dry run reports the
    // conflict instead of throwing.
    let report = RunOrchestrator::new(&platform, config(true))
        .run(vec![
            domain("d1"),
            schema(c2.clone(), "1.0.0", VersionStrategy::Exact),
        ])
        .await;
    assert!(report.succeeded());
    assert_eq!(
        schema_action(&report),
        TaskAction::WouldFailCreateNewVersionOnExactVersionRequirement
    );

    // The same input for real fails with a validation error and mutates nothing.
    let mutations_before = platform.mutation_count();
    let report = RunOrchestrator::new(&platform, config(false))
        .run(vec![
            domain("d1"),
            schema(c2.clone(), "1.0.0", VersionStrategy::Exact),
        ])
        .await;
    assert!(!report.succeeded());
    assert_eq!(report.run_error.as_ref().unwrap().kind, ErrorKind::Validation);
    assert_eq!(platform.mutation_count(), mutations_before);

    // A newer exact version creates exactly one new version with that string.
    let report = RunOrchestrator::new(&platform, config(false))
        .run(vec![
            domain("d1"),
            schema(c2.clone(), "1.1.0", VersionStrategy::Exact),
        ])
        .await;
    assert!(report.succeeded());
    assert_eq!(schema_action(&report), TaskAction::CreateNewVersion);
    let updated = report
        .results
        .iter()
        .find(|r| r.kind == ObjectKind::Schema)
        .unwrap();
    assert_eq!(updated.after.as_ref().unwrap().version, "1.1.0");
    assert_eq!(updated.before.as_ref().unwrap().version, "1.0.0");
    assert!(updated.diff.is_some());
}

#[tokio::test]
async fn bump_sequence_is_monotonic() {
    let platform = MemoryCatalogPlatform::new();

    let mut versions = Vec::new();
    for i in 0..4 {
        let content = json!({"rev": i});
        let report = RunOrchestrator::new(&platform, config(false))
            .run(vec![
                domain("d1"),
                schema(content, "1.0.0", VersionStrategy::BumpMinor),
            ])
            .await;
        assert!(report.succeeded());
        let result = report
            .results
            .iter()
            .find(|r| r.kind == ObjectKind::Schema)
            .unwrap();
        versions.push(result.after.as_ref().unwrap().version.clone());
    }

    assert_eq!(versions, vec!["1.0.0", "1.1.0", "1.2.0", "1.3.0"]);
    for pair in versions.windows(2) {
        let old = semver::Version::parse(&pair[0]).unwrap();
        let new = semver::Version::parse(&pair[1]).unwrap();
        assert!(new > old, "{} should be greater than {}", new, old);
    }
}

#[tokio::test]
async fn bump_major_resets_lower_components() {
    let platform = MemoryCatalogPlatform::new();

    let report = RunOrchestrator::new(&platform, config(false))
        .run(vec![
            domain("d1"),
            schema(json!({"rev": 0}), "1.2.3", VersionStrategy::Exact),
        ])
        .await;
    assert!(report.succeeded());

    let report = RunOrchestrator::new(&platform, config(false))
        .run(vec![
            domain("d1"),
            schema(json!({"rev": 1}), "1.0.0", VersionStrategy::BumpMajor),
        ])
        .await;
    assert!(report.succeeded());
    let result = report
        .results
        .iter()
        .find(|r| r.kind == ObjectKind::Schema)
        .unwrap();
    assert_eq!(result.after.as_ref().unwrap().version, "2.0.0");
}

#[tokio::test]
async fn counters_reflect_the_run() {
    let platform = MemoryCatalogPlatform::new();

    let report = RunOrchestrator::new(&platform, config(false))
        .run(vec![
            domain("d1"),
            schema(json!({"x": 1}), "1.0.0", VersionStrategy::Exact),
        ])
        .await;
    let domains = &report.counters[&ObjectKind::ApplicationDomain];
    assert_eq!(domains.processed, 1);
    assert_eq!(domains.created_first_versions, 1);
    let schemas = &report.counters[&ObjectKind::Schema];
    assert_eq!(schemas.created_first_versions, 1);
    assert_eq!(report.issue_count, 0);
    assert_eq!(report.warning_count, 0);
}
