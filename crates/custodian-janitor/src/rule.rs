//! Compliance rule contract and AND-composition
//!
//! A rule is a pure predicate over one resource: it reports a violation (or
//! not) and never mutates lifecycle fields. Deadline stamping is the
//! engine's job, which is what makes re-marking idempotent regardless of how
//! a rule is written.

use crate::error::RuleError;
use chrono::{DateTime, Utc};
use custodian_common::Resource;

/// A cleanup candidate finding produced by one rule
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the rule that flagged the resource
    pub rule: String,
    /// Human-readable diagnostic, becomes `termination_reason`
    pub reason: String,
    /// Deadline computed via the business calendar, becomes
    /// `expected_termination_time`
    pub terminate_after: DateTime<Utc>,
}

/// A single compliance predicate
///
/// `Ok(None)` means the resource satisfies this rule. A rule that does not
/// apply to the resource (wrong kind, say) must return `Ok(None)` as a
/// no-op. An `Err` excludes the resource from this run entirely.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, resource: &Resource) -> Result<Option<Violation>, RuleError>;
}

/// An allow-list predicate checked before any ordinary rule
///
/// An excluded resource is valid independent of all other rules.
pub trait ExclusionRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn excludes(&self, resource: &Resource) -> bool;
}

/// Aggregate verdict for one resource
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Every rule satisfied, or the resource is allow-listed
    Valid,
    /// At least one rule flagged the resource; violations in rule order
    Invalid(Vec<Violation>),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Aggregates rules with AND semantics into one verdict per resource
///
/// Exclusions short-circuit to valid. Otherwise every rule is evaluated
/// unconditionally so each one gets a chance to contribute its diagnostic,
/// and the aggregate is invalid if any rule produced a violation.
#[derive(Default)]
pub struct RuleEngine {
    exclusions: Vec<Box<dyn ExclusionRule>>,
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclusion(mut self, exclusion: impl ExclusionRule + 'static) -> Self {
        self.exclusions.push(Box::new(exclusion));
        self
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate all rules against one resource
    ///
    /// Bails on the first rule error: once any rule is broken the verdict
    /// cannot be trusted in either direction.
    pub fn evaluate(&self, resource: &Resource) -> Result<Verdict, RuleError> {
        for exclusion in &self.exclusions {
            if exclusion.excludes(resource) {
                tracing::debug!(
                    resource_id = %resource.id,
                    exclusion = exclusion.name(),
                    "Resource allow-listed"
                );
                return Ok(Verdict::Valid);
            }
        }

        let mut violations = Vec::new();
        for rule in &self.rules {
            if let Some(violation) = rule.evaluate(resource)? {
                violations.push(violation);
            }
        }

        if violations.is_empty() {
            Ok(Verdict::Valid)
        } else {
            Ok(Verdict::Invalid(violations))
        }
    }
}
