//! Typed validation and diagnostic errors
//!
//! Errors the engine needs to tell apart get dedicated types; everything
//! else travels as `anyhow::Error` with context.

use thiserror::Error;

/// A rule raised unexpectedly while evaluating a resource
///
/// The resource is excluded from both marking and unmarking for the run and
/// reported separately; a broken rule must never cause an erroneous mark or
/// an erroneous "safe" unmark.
#[derive(Debug, Error)]
#[error("rule '{rule}' failed on resource '{resource_id}': {message}")]
pub struct RuleError {
    pub rule: String,
    pub resource_id: String,
    pub message: String,
}

impl RuleError {
    pub fn new(
        rule: impl Into<String>,
        resource_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }
}

/// Diagnostic failure raised by a dry-run cleanup probe
///
/// Distinguishable from a real cleanup failure: it signals "this resource
/// would fail real cleanup" and never reflects any cloud-state mutation.
#[derive(Debug, Error)]
#[error("dry-run cleanup would fail for '{resource_id}': {message}")]
pub struct DryRunFailure {
    pub resource_id: String,
    pub message: String,
}

impl DryRunFailure {
    pub fn new(resource_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }
}

/// Janitor configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// region field is empty
    #[error("region cannot be empty")]
    EmptyRegion,

    /// retention days is zero
    #[error("retention days must be at least 1, got {0}")]
    InvalidRetentionDays(u32),

    /// command hook strategy selected without a cleanup command
    #[error("hook strategy 'command' requires a cleanup command template")]
    MissingCleanupCommand,

    /// command template references an unknown placeholder
    #[error("unknown placeholder '{{{0}}}' in command template")]
    UnknownPlaceholder(String),
}
