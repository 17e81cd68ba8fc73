//! Abandoned auto-scaling group rule

use crate::calendar::Calendar;
use crate::error::RuleError;
use crate::rule::{Rule, Violation};
use custodian_common::fields::{
    FIELD_CONFIG_CREATED_AT, FIELD_CREATED_AT, FIELD_LOAD_BALANCER_COUNT, FIELD_MEMBER_COUNT,
};
use custodian_common::tags::parse_timestamp;
use custodian_common::{Resource, ResourceKind};
use std::sync::Arc;

/// Flags auto-scaling groups with no members and an old configuration
///
/// Emptiness alone is not enough: a load balancer attachment is a
/// corroborating reference that explains the emptiness as transient (a group
/// mid-deploy, say), and a young configuration means someone touched it
/// recently. Other resource kinds are a no-op.
pub struct EmptyGroupRule {
    min_age_days: i64,
    retention_days: u32,
    calendar: Arc<dyn Calendar>,
}

impl EmptyGroupRule {
    pub fn new(min_age_days: i64, retention_days: u32, calendar: Arc<dyn Calendar>) -> Self {
        Self {
            min_age_days,
            retention_days,
            calendar,
        }
    }

    fn parse_count(&self, resource: &Resource, key: &str) -> Result<Option<u64>, RuleError> {
        match resource.field(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
                RuleError::new(
                    self.name(),
                    &resource.id,
                    format!("field '{key}' is not a count: '{raw}'"),
                )
            }),
        }
    }
}

impl Rule for EmptyGroupRule {
    fn name(&self) -> &'static str {
        "empty-group"
    }

    fn evaluate(&self, resource: &Resource) -> Result<Option<Violation>, RuleError> {
        if resource.kind != ResourceKind::AutoScalingGroup {
            return Ok(None);
        }

        // Without a member count there is no evidence of emptiness.
        let members = match self.parse_count(resource, FIELD_MEMBER_COUNT)? {
            Some(count) => count,
            None => return Ok(None),
        };
        if members > 0 {
            return Ok(None);
        }

        if self
            .parse_count(resource, FIELD_LOAD_BALANCER_COUNT)?
            .unwrap_or(0)
            > 0
        {
            return Ok(None);
        }

        // Prefer the launch configuration's age; fall back to the group's own.
        let created_raw = resource
            .field(FIELD_CONFIG_CREATED_AT)
            .or_else(|| resource.field(FIELD_CREATED_AT));
        let created = match created_raw {
            Some(raw) => parse_timestamp(raw).ok_or_else(|| {
                RuleError::new(
                    self.name(),
                    &resource.id,
                    format!("unparseable creation timestamp: '{raw}'"),
                )
            })?,
            None => return Ok(None),
        };

        let now = self.calendar.now();
        let age_days = (now - created).num_days();
        if age_days < self.min_age_days {
            return Ok(None);
        }

        Ok(Some(Violation {
            rule: self.name().to_string(),
            reason: format!(
                "auto-scaling group has no members, no load balancer, and a {age_days}-day-old configuration"
            ),
            terminate_after: self.calendar.business_days_after(now, self.retention_days),
        }))
    }
}
