//! Run-scoped context threaded through every operation for provenance.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the run was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Release,
    TestPass1,
    TestPass2,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunMode::Release => "release",
            RunMode::TestPass1 => "test_pass_1",
            RunMode::TestPass2 => "test_pass_2",
        };
        write!(f, "{}", s)
    }
}

/// Identifying metadata for one run plus a stack of nested processing frames.
///
/// Frames are pushed as the orchestrator descends into kinds and objects and
/// are snapshotted into every task result, issue and error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: Uuid,
    pub mode: RunMode,
    /// Prefix applied to every desired application domain name, used by
    /// replay front-ends to land objects in a separate namespace.
    pub domain_prefix: Option<String>,
    frames: Vec<String>,
}

impl RunContext {
    pub fn new(run_id: Uuid, mode: RunMode, domain_prefix: Option<String>) -> Self {
        Self {
            run_id,
            mode,
            domain_prefix,
            frames: Vec::new(),
        }
    }

    /// Push a processing frame (e.g. "kind:schema", "object:OrderCreated").
    pub fn push(&mut self, frame: impl Into<String>) {
        self.frames.push(frame.into());
    }

    /// Pop the innermost frame.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Snapshot of the current frame stack, outermost first.
    pub fn frames(&self) -> Vec<String> {
        self.frames.clone()
    }

    /// The effective platform-side name of a desired application domain.
    pub fn effective_domain(&self, name: &str) -> String {
        match &self.domain_prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name.to_string(),
        }
    }
}
