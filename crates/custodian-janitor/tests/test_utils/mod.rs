//! Shared test fixtures for janitor integration tests
//!
//! Fake crawler, recording hooks, controllable rules and a frozen calendar.
//! Generic database helpers live in custodian-test-utils.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use custodian_common::tags::TAG_OWNER;
use custodian_common::{Resource, ResourceKind, ResourceState};
use custodian_janitor::calendar::Calendar;
use custodian_janitor::crawler::Crawler;
use custodian_janitor::error::{DryRunFailure, RuleError};
use custodian_janitor::hooks::ResourceHooks;
use custodian_janitor::rule::{Rule, Violation};
use custodian_janitor::tracker::{ResourceTracker, SqliteTracker};
use custodian_test_utils::open_test_db;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const TEST_REGION: &str = "us-east-1";

/// Wednesday, well clear of holidays
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
}

/// A calendar whose clock only moves when a test says so
pub struct FixedCalendar {
    now: Mutex<DateTime<Utc>>,
}

impl FixedCalendar {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::days(days);
    }
}

impl Calendar for FixedCalendar {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn business_days_after(&self, start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
        // Business-day vs calendar-day arithmetic is covered by the calendar
        // unit tests; integration tests use plain days.
        start + Duration::days(i64::from(days))
    }
}

/// Crawler over a test-controlled inventory
pub struct FakeCrawler {
    inventory: Mutex<Vec<Resource>>,
}

impl FakeCrawler {
    pub fn new(inventory: Vec<Resource>) -> Arc<Self> {
        Arc::new(Self {
            inventory: Mutex::new(inventory),
        })
    }
}

#[async_trait]
impl Crawler for FakeCrawler {
    async fn resources(&self, kind: ResourceKind) -> Result<Vec<Resource>> {
        Ok(self
            .inventory
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    async fn resources_by_id(&self, ids: &[String]) -> Result<Vec<Resource>> {
        Ok(self
            .inventory
            .lock()
            .unwrap()
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    fn resource_kinds(&self) -> HashSet<ResourceKind> {
        self.inventory
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.kind)
            .collect()
    }

    async fn owner_email_for(&self, resource: &Resource) -> Result<Option<String>> {
        Ok(resource.tag(TAG_OWNER).map(str::to_string))
    }
}

/// Hooks that record every invocation and fail on demand
#[derive(Default)]
pub struct RecordingHooks {
    fail_cleanup_ids: Mutex<HashSet<String>>,
    fail_dry_run_ids: Mutex<HashSet<String>>,
    post_mark_calls: Mutex<Vec<String>>,
    cleanup_calls: Mutex<Vec<String>>,
    dry_run_calls: Mutex<Vec<String>>,
    post_cleanup_calls: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_cleanup_for(&self, id: &str) {
        self.fail_cleanup_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_dry_run_for(&self, id: &str) {
        self.fail_dry_run_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn post_mark_calls(&self) -> Vec<String> {
        self.post_mark_calls.lock().unwrap().clone()
    }

    pub fn cleanup_calls(&self) -> Vec<String> {
        self.cleanup_calls.lock().unwrap().clone()
    }

    pub fn dry_run_calls(&self) -> Vec<String> {
        self.dry_run_calls.lock().unwrap().clone()
    }

    pub fn post_cleanup_calls(&self) -> Vec<String> {
        self.post_cleanup_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceHooks for RecordingHooks {
    async fn post_mark(&self, resource: &Resource) -> Result<()> {
        self.post_mark_calls
            .lock()
            .unwrap()
            .push(resource.id.clone());
        Ok(())
    }

    async fn cleanup(&self, resource: &Resource) -> Result<()> {
        self.cleanup_calls.lock().unwrap().push(resource.id.clone());
        if self.fail_cleanup_ids.lock().unwrap().contains(&resource.id) {
            anyhow::bail!("simulated cleanup failure for {}", resource.id);
        }
        Ok(())
    }

    async fn cleanup_dry_run(&self, resource: &Resource) -> Result<(), DryRunFailure> {
        self.dry_run_calls.lock().unwrap().push(resource.id.clone());
        if self.fail_dry_run_ids.lock().unwrap().contains(&resource.id) {
            return Err(DryRunFailure::new(&resource.id, "simulated dry-run failure"));
        }
        Ok(())
    }

    async fn post_cleanup(&self, resource: &Resource) -> Result<()> {
        self.post_cleanup_calls
            .lock()
            .unwrap()
            .push(resource.id.clone());
        Ok(())
    }
}

/// Flags exactly the resources whose ids are in the list
pub struct FlagListRule {
    flagged: HashSet<String>,
    calendar: Arc<FixedCalendar>,
    retention_days: u32,
}

impl FlagListRule {
    pub fn new(ids: &[&str], calendar: Arc<FixedCalendar>, retention_days: u32) -> Self {
        Self {
            flagged: ids.iter().map(|s| s.to_string()).collect(),
            calendar,
            retention_days,
        }
    }
}

impl Rule for FlagListRule {
    fn name(&self) -> &'static str {
        "flag-list"
    }

    fn evaluate(&self, resource: &Resource) -> Result<Option<Violation>, RuleError> {
        if !self.flagged.contains(&resource.id) {
            return Ok(None);
        }
        let now = self.calendar.now();
        Ok(Some(Violation {
            rule: self.name().to_string(),
            reason: format!("resource {} flagged by policy", resource.id),
            terminate_after: self
                .calendar
                .business_days_after(now, self.retention_days),
        }))
    }
}

/// Flags every resource whose id parses to an odd number
pub struct OddIdRule {
    calendar: Arc<FixedCalendar>,
    retention_days: u32,
}

impl OddIdRule {
    pub fn new(calendar: Arc<FixedCalendar>, retention_days: u32) -> Self {
        Self {
            calendar,
            retention_days,
        }
    }
}

impl Rule for OddIdRule {
    fn name(&self) -> &'static str {
        "odd-id"
    }

    fn evaluate(&self, resource: &Resource) -> Result<Option<Violation>, RuleError> {
        let odd = resource
            .id
            .parse::<u64>()
            .map(|n| n % 2 == 1)
            .unwrap_or(false);
        if !odd {
            return Ok(None);
        }
        let now = self.calendar.now();
        Ok(Some(Violation {
            rule: self.name().to_string(),
            reason: format!("odd-numbered resource {}", resource.id),
            terminate_after: self
                .calendar
                .business_days_after(now, self.retention_days),
        }))
    }
}

/// Raises for the configured ids, passes everything else
pub struct BrokenForRule {
    broken: HashSet<String>,
}

impl BrokenForRule {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            broken: ids.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Rule for BrokenForRule {
    fn name(&self) -> &'static str {
        "broken-for"
    }

    fn evaluate(&self, resource: &Resource) -> Result<Option<Violation>, RuleError> {
        if self.broken.contains(&resource.id) {
            return Err(RuleError::new(self.name(), &resource.id, "synthetic rule crash"));
        }
        Ok(None)
    }
}

/// In-memory SQLite tracker with schema installed
pub async fn sqlite_tracker() -> Arc<SqliteTracker> {
    let pool = open_test_db().await.unwrap();
    Arc::new(SqliteTracker::from_pool(pool).await.unwrap())
}

/// A crawled (ephemeral) instance resource
pub fn crawled(id: &str) -> Resource {
    Resource::new(ResourceKind::Instance, id, TEST_REGION)
}

/// A stored MARKED resource ready for cleanup-phase tests
pub fn marked(
    id: &str,
    deadline: DateTime<Utc>,
    notified_at: Option<DateTime<Utc>>,
    opt_out: bool,
) -> Resource {
    let mut r = Resource::new(ResourceKind::Instance, id, TEST_REGION);
    r.state = ResourceState::Marked;
    r.opt_out_of_janitor = opt_out;
    r.mark_time = Some(deadline - Duration::days(3));
    r.notification_time = notified_at;
    r.expected_termination_time = Some(deadline);
    r.termination_reason = Some("flagged in an earlier run".to_string());
    r
}

/// Persist a batch of resources into the tracker
pub async fn seed(tracker: &SqliteTracker, resources: &[Resource]) {
    for resource in resources {
        tracker.add_or_update(resource).await.unwrap();
    }
}
