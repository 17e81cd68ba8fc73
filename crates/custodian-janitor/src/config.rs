//! Configuration types for a janitor instance
//!
//! Composed of focused sub-configs; retention and tag policy are rule
//! constructor parameters, not engine state.

use crate::error::ConfigError;
use custodian_common::defaults::{
    DEFAULT_EMPTY_GROUP_AGE_DAYS, DEFAULT_RETENTION_DAYS_WITHOUT_OWNER,
    DEFAULT_RETENTION_DAYS_WITH_OWNER,
};
use custodian_common::ResourceKind;

/// Retention grace periods, in business days
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Grace period when an accountable owner can be notified
    pub days_with_owner: u32,
    /// Grace period when nobody is accountable
    pub days_without_owner: u32,
    /// Minimum age before an empty group counts as abandoned
    pub empty_group_age_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days_with_owner: DEFAULT_RETENTION_DAYS_WITH_OWNER,
            days_without_owner: DEFAULT_RETENTION_DAYS_WITHOUT_OWNER,
            empty_group_age_days: DEFAULT_EMPTY_GROUP_AGE_DAYS,
        }
    }
}

/// Rule policy knobs
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    /// Tags every resource must carry; empty disables the required-tag rule
    pub required_tags: Vec<String>,
    pub retention: RetentionConfig,
}

/// Configuration for one janitor instance (one resource kind, one region)
#[derive(Debug, Clone)]
pub struct JanitorConfig {
    pub kind: ResourceKind,
    pub region: String,
    /// Safety mode: destructive actions are simulated, never executed
    pub leashed: bool,
    pub policy: PolicyConfig,
}

impl JanitorConfig {
    pub fn new(kind: ResourceKind, region: impl Into<String>) -> Self {
        Self {
            kind,
            region: region.into(),
            leashed: true,
            policy: PolicyConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::EmptyRegion);
        }
        for days in [
            self.policy.retention.days_with_owner,
            self.policy.retention.days_without_owner,
        ] {
            if days == 0 {
                return Err(ConfigError::InvalidRetentionDays(days));
            }
        }
        Ok(())
    }
}
