//! Required-tag compliance rule

use crate::calendar::Calendar;
use crate::error::RuleError;
use crate::rule::{Rule, Violation};
use custodian_common::Resource;
use std::sync::Arc;

/// Flags resources missing any tag from a required set
///
/// Retention differs by whether an owner is known: an accountable owner gets
/// the longer grace period to react to the notification; an ownerless
/// resource gets the shorter one.
pub struct RequiredTagsRule {
    required: Vec<String>,
    retention_days_with_owner: u32,
    retention_days_without_owner: u32,
    calendar: Arc<dyn Calendar>,
}

impl RequiredTagsRule {
    pub fn new(
        required: Vec<String>,
        retention_days_with_owner: u32,
        retention_days_without_owner: u32,
        calendar: Arc<dyn Calendar>,
    ) -> Self {
        Self {
            required,
            retention_days_with_owner,
            retention_days_without_owner,
            calendar,
        }
    }
}

impl Rule for RequiredTagsRule {
    fn name(&self) -> &'static str {
        "required-tags"
    }

    fn evaluate(&self, resource: &Resource) -> Result<Option<Violation>, RuleError> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .map(String::as_str)
            .filter(|key| resource.tag(key).is_none())
            .collect();

        if missing.is_empty() {
            return Ok(None);
        }

        let retention_days = if resource.owner().is_some() {
            self.retention_days_with_owner
        } else {
            self.retention_days_without_owner
        };
        let now = self.calendar.now();

        Ok(Some(Violation {
            rule: self.name().to_string(),
            reason: format!("missing required tags: {}", missing.join(", ")),
            terminate_after: self.calendar.business_days_after(now, retention_days),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use custodian_common::tags::TAG_OWNER;
    use custodian_common::ResourceKind;

    struct FrozenCalendar(DateTime<Utc>);

    impl Calendar for FrozenCalendar {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }

        fn business_days_after(&self, start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
            start + Duration::days(i64::from(days))
        }
    }

    fn rule_at(now: DateTime<Utc>) -> RequiredTagsRule {
        RequiredTagsRule::new(
            vec!["owner".to_string(), "cost-center".to_string()],
            4,
            2,
            Arc::new(FrozenCalendar(now)),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fully_tagged_is_valid() {
        let rule = rule_at(now());
        let resource = Resource::new(ResourceKind::Instance, "i-1", "eu-west-1")
            .with_tag("owner", "team@example.com")
            .with_tag("cost-center", "4242");
        assert!(rule.evaluate(&resource).unwrap().is_none());
    }

    #[test]
    fn test_missing_tag_names_appear_in_reason() {
        let rule = rule_at(now());
        let resource = Resource::new(ResourceKind::Instance, "i-2", "eu-west-1");
        let violation = rule.evaluate(&resource).unwrap().unwrap();
        assert!(violation.reason.contains("owner"));
        assert!(violation.reason.contains("cost-center"));
    }

    #[test]
    fn test_retention_differs_by_owner_presence() {
        let rule = rule_at(now());

        let owned = Resource::new(ResourceKind::Instance, "i-3", "eu-west-1")
            .with_tag(TAG_OWNER, "team@example.com");
        let owned_violation = rule.evaluate(&owned).unwrap().unwrap();
        assert_eq!(owned_violation.terminate_after, now() + Duration::days(4));

        let ownerless = Resource::new(ResourceKind::Instance, "i-4", "eu-west-1");
        let ownerless_violation = rule.evaluate(&ownerless).unwrap().unwrap();
        assert_eq!(
            ownerless_violation.terminate_after,
            now() + Duration::days(2)
        );
    }
}
