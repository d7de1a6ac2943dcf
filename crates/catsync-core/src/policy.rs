//! Cross-domain enforcement policy.
//!
//! Evaluates whether a task may mutate a resource in an application domain
//! the run does not own. The decision is pure; the task maps `Violation`
//! to a fatal policy error before issuing any mutating call, and the
//! orchestrator records `Warn` into the run summary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::TaskAction;

/// Run-level policy governing references into foreign domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementPolicy {
    Off,
    Lax,
    Strict,
}

/// Outcome of a policy check for one candidate action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyDecision {
    Allow,
    /// Allowed, but a warning is recorded in the run summary.
    Warn { reason: String },
    /// Forbidden; the task fails before any mutating call.
    Violation { reason: String },
}

/// Evaluate `policy` for a task that decided `action` on an object in
/// `domain`, given the domains this run owns.
///
/// Mutation-free actions are always allowed: the policy protects foreign
/// domains from being altered, not from being read.
pub fn evaluate(
    policy: EnforcementPolicy,
    owned_domains: &BTreeSet<String>,
    domain: &str,
    action: TaskAction,
) -> PolicyDecision {
    if policy == EnforcementPolicy::Off {
        return PolicyDecision::Allow;
    }
    if !action.is_change() {
        return PolicyDecision::Allow;
    }
    if owned_domains.contains(domain) {
        return PolicyDecision::Allow;
    }

    let reason = format!(
        "action {} targets domain '{}' which is not owned by this run (owned: [{}])",
        action,
        domain,
        owned_domains
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    );
    match policy {
        EnforcementPolicy::Lax => PolicyDecision::Warn { reason },
        EnforcementPolicy::Strict => PolicyDecision::Violation { reason },
        EnforcementPolicy::Off => unreachable!("handled above"),
    }
}
