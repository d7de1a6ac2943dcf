//! Tagged error taxonomy for the reconciliation engine.
//!
//! One error struct with a [`ErrorKind`] discriminant instead of a class per
//! cause. Low-level causes (platform API failures, semver parse failures)
//! are mapped onto a kind at the point where they are wrapped.

use catsync_platform::PlatformError;
use serde::{Deserialize, Serialize};

/// Discriminant of a [`ReconcileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Desired state is internally inconsistent (malformed version string,
    /// exact version that is not newer while a diff exists, missing domain).
    Validation,
    /// A remote platform call was rejected or never completed.
    PlatformApi,
    /// A strict cross-domain policy breach.
    Policy,
    /// A batch maps the same object onto materially different target states.
    Consistency,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::PlatformApi => "platform_api",
            ErrorKind::Policy => "policy",
            ErrorKind::Consistency => "consistency",
        };
        write!(f, "{}", s)
    }
}

/// Error produced anywhere in the reconciliation engine.
///
/// Carries the run context frames that were active when the error was
/// raised, for traceability in reports.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind} error: {message}")]
pub struct ReconcileError {
    pub kind: ErrorKind,
    pub message: String,
    /// Structured supporting data (offending values, platform payloads).
    pub details: serde_json::Value,
    /// Snapshot of the run context frame stack.
    pub context: Vec<String>,
}

impl ReconcileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: serde_json::Value::Null,
            context: Vec::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Policy, message)
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Consistency, message)
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Attach the active run context frames.
    pub fn with_context(mut self, frames: Vec<String>) -> Self {
        self.context = frames;
        self
    }
}

impl From<PlatformError> for ReconcileError {
    fn from(err: PlatformError) -> Self {
        let details = match &err {
            PlatformError::Api { status, message } => serde_json::json!({
                "status": status,
                "payload": message,
            }),
            _ => serde_json::Value::Null,
        };
        Self::new(ErrorKind::PlatformApi, err.to_string()).with_details(details)
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
