//! catsync - declarative catalog reconciliation CLI
//!
//! Reads a desired-state file and reconciles the named resources against a
//! remote catalog platform.
//!
//! ## Commands
//!
//! - `apply`: reconcile the desired state (present run)
//! - `plan`: same as apply but checkmode only, mutating nothing
//! - `destroy`: delete every object named in the file (absent run)

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::Level;

use catsync_core::{
    init_tracing, write_report_json, DesiredState, EnforcementPolicy, LifecycleState, ObjectKind,
    RunConfig, RunMode, RunOrchestrator, RunReport, TargetState, VersionSpec, VersionStrategy,
};
use catsync_platform::http::HttpCatalogPlatform;

#[derive(Parser)]
#[command(name = "catsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconcile versioned catalog resources against a remote platform", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the desired state against the platform
    Apply {
        #[command(flatten)]
        platform: PlatformArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Predict what apply would do, mutating nothing
    Plan {
        #[command(flatten)]
        platform: PlatformArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Delete every object named in the desired-state file
    Destroy {
        #[command(flatten)]
        platform: PlatformArgs,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct PlatformArgs {
    /// Base URL of the catalog platform API
    #[arg(long, env = "CATSYNC_BASE_URL")]
    base_url: String,

    /// Bearer token for the platform API
    #[arg(long, env = "CATSYNC_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Args)]
struct RunArgs {
    /// Desired-state file (JSON array of records)
    #[arg(short, long)]
    file: PathBuf,

    /// Cross-domain enforcement policy
    #[arg(long, value_enum, default_value = "off")]
    policy: PolicyArg,

    /// Application domain owned by this run (repeatable)
    #[arg(long = "owned-domain")]
    owned_domains: Vec<String>,

    /// Prefix applied to every application domain name
    #[arg(long)]
    domain_prefix: Option<String>,

    /// Run mode recorded in the report
    #[arg(long, value_enum, default_value = "release")]
    run_mode: RunModeArg,

    /// Version strategy for records that do not specify one
    #[arg(long, value_enum, default_value = "bump-patch")]
    default_strategy: StrategyArg,

    /// Version string for records that do not specify one
    #[arg(long, default_value = "1.0.0")]
    default_version: String,

    /// Lifecycle state for records that do not specify one
    #[arg(long, value_enum, default_value = "released")]
    default_lifecycle: LifecycleArg,

    /// Shared flag for records that do not specify one
    #[arg(long)]
    default_shared: bool,

    /// Also write the structured report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Off,
    Lax,
    Strict,
}

impl From<PolicyArg> for EnforcementPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Off => EnforcementPolicy::Off,
            PolicyArg::Lax => EnforcementPolicy::Lax,
            PolicyArg::Strict => EnforcementPolicy::Strict,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RunModeArg {
    Release,
    TestPass1,
    TestPass2,
}

impl From<RunModeArg> for RunMode {
    fn from(arg: RunModeArg) -> Self {
        match arg {
            RunModeArg::Release => RunMode::Release,
            RunModeArg::TestPass1 => RunMode::TestPass1,
            RunModeArg::TestPass2 => RunMode::TestPass2,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    BumpPatch,
    BumpMinor,
    BumpMajor,
    Exact,
}

impl From<StrategyArg> for VersionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::BumpPatch => VersionStrategy::BumpPatch,
            StrategyArg::BumpMinor => VersionStrategy::BumpMinor,
            StrategyArg::BumpMajor => VersionStrategy::BumpMajor,
            StrategyArg::Exact => VersionStrategy::Exact,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LifecycleArg {
    Draft,
    Released,
    Deprecated,
    Retired,
}

impl From<LifecycleArg> for LifecycleState {
    fn from(arg: LifecycleArg) -> Self {
        match arg {
            LifecycleArg::Draft => LifecycleState::Draft,
            LifecycleArg::Released => LifecycleState::Released,
            LifecycleArg::Deprecated => LifecycleState::Deprecated,
            LifecycleArg::Retired => LifecycleState::Retired,
        }
    }
}

/// One record of the desired-state input file. Optional fields fall back to
/// the run's configured defaults.
#[derive(Debug, Deserialize)]
struct DesiredStateRecord {
    kind: ObjectKind,
    domain: String,
    name: String,
    #[serde(default)]
    shared: Option<bool>,
    #[serde(default)]
    settings: serde_json::Value,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    strategy: Option<VersionStrategy>,
    #[serde(default)]
    lifecycle: Option<LifecycleState>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

struct Defaults {
    strategy: VersionStrategy,
    version: String,
    lifecycle: LifecycleState,
    shared: bool,
}

impl DesiredStateRecord {
    fn into_desired(self, defaults: &Defaults, target: TargetState) -> DesiredState {
        DesiredState {
            kind: self.kind,
            domain: self.domain,
            name: self.name,
            shared: self.shared.unwrap_or(defaults.shared),
            settings: self.settings,
            version: VersionSpec {
                version: self.version.unwrap_or_else(|| defaults.version.clone()),
                strategy: self.strategy.unwrap_or(defaults.strategy),
            },
            lifecycle: self.lifecycle.unwrap_or(defaults.lifecycle),
            target,
            display_name: self.display_name,
            description: self.description,
        }
    }
}

fn load_desired_state(
    path: &Path,
    defaults: &Defaults,
    target: TargetState,
) -> Result<Vec<DesiredState>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read desired-state file {:?}", path))?;
    let records: Vec<DesiredStateRecord> =
        serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))?;
    Ok(records
        .into_iter()
        .map(|r| r.into_desired(defaults, target))
        .collect())
}

async fn execute(
    platform_args: PlatformArgs,
    run_args: RunArgs,
    checkmode: bool,
    target: TargetState,
) -> Result<RunReport> {
    let defaults = Defaults {
        strategy: run_args.default_strategy.into(),
        version: run_args.default_version.clone(),
        lifecycle: run_args.default_lifecycle.into(),
        shared: run_args.default_shared,
    };
    let items = load_desired_state(&run_args.file, &defaults, target)?;

    let config = RunConfig {
        run_id: None,
        mode: run_args.run_mode.into(),
        checkmode,
        policy: run_args.policy.into(),
        owned_domains: run_args.owned_domains.iter().cloned().collect::<BTreeSet<_>>(),
        domain_prefix: run_args.domain_prefix.clone(),
    };

    let platform = HttpCatalogPlatform::new(platform_args.base_url, platform_args.token);
    let report = RunOrchestrator::new(platform, config).run(items).await;

    if let Some(path) = &run_args.report {
        write_report_json(path, &report)?;
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let report = match cli.command {
        Commands::Apply { platform, run } => {
            execute(platform, run, false, TargetState::Present).await?
        }
        Commands::Plan { platform, run } => {
            execute(platform, run, true, TargetState::Present).await?
        }
        Commands::Destroy { platform, run } => {
            execute(platform, run, false, TargetState::Absent).await?
        }
    };

    println!("{}", report.render_text());

    // Warnings and issues alone do not fail the process; a fatal run
    // error does.
    if let Some(error) = &report.run_error {
        bail!("run {} failed: {}", report.run_id, error.message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn defaults() -> Defaults {
        Defaults {
            strategy: VersionStrategy::BumpPatch,
            version: "1.0.0".to_string(),
            lifecycle: LifecycleState::Released,
            shared: false,
        }
    }

    #[test]
    fn records_fill_missing_fields_from_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"[
                {{"kind": "application_domain", "domain": "d1", "name": "d1"}},
                {{
                    "kind": "schema",
                    "domain": "d1",
                    "name": "s1",
                    "shared": true,
                    "settings": {{"content": {{}}}},
                    "version": "2.0.0",
                    "strategy": "exact"
                }}
            ]"#
        )
        .expect("write");

        let items =
            load_desired_state(file.path(), &defaults(), TargetState::Present).expect("load");
        assert_eq!(items.len(), 2);

        let domain = &items[0];
        assert_eq!(domain.kind, ObjectKind::ApplicationDomain);
        assert_eq!(domain.version.version, "1.0.0");
        assert_eq!(domain.version.strategy, VersionStrategy::BumpPatch);
        assert!(!domain.shared);

        let schema = &items[1];
        assert_eq!(schema.version.version, "2.0.0");
        assert_eq!(schema.version.strategy, VersionStrategy::Exact);
        assert!(schema.shared);
        assert_eq!(schema.target, TargetState::Present);
    }

    #[test]
    fn destroy_target_marks_records_absent() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"[{{"kind": "enumeration", "domain": "d1", "name": "colors"}}]"#
        )
        .expect("write");

        let items =
            load_desired_state(file.path(), &defaults(), TargetState::Absent).expect("load");
        assert_eq!(items[0].target, TargetState::Absent);
    }

    #[test]
    fn malformed_file_reports_the_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "not json").expect("write");
        let err = load_desired_state(file.path(), &defaults(), TargetState::Present).unwrap_err();
        assert!(format!("{:#}", err).contains("parse"));
    }
}
