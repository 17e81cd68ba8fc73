//! The janitor engine state machine
//!
//! Orchestrates a mark phase and a cleanup phase per run. Both phases are
//! idempotent across independent invocations: deadlines never slide, a
//! vanished resource is unmarked before cleanup can ever see it, and one
//! resource's failure never aborts the batch.
//!
//! Execution within a run is strictly sequential; the engine assumes it is
//! the sole writer for its (kind, region) at any instant. The surrounding
//! scheduler must not overlap runs for the same key.

use crate::calendar::Calendar;
use crate::config::JanitorConfig;
use crate::crawler::Crawler;
use crate::hooks::ResourceHooks;
use crate::rule::{RuleEngine, Verdict, Violation};
use crate::tracker::ResourceTracker;
use anyhow::{Context, Result};
use custodian_common::{Resource, ResourceKind, ResourceState};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cumulative counters for one janitor instance
///
/// Owned by the engine and surfaced through an accessor; counters accumulate
/// across runs while the per-run report lists are replaced each run.
#[derive(Debug, Default, Clone, Copy)]
pub struct JanitorMetrics {
    pub marked: u64,
    pub unmarked: u64,
    pub cleaned: u64,
    pub failed_to_clean: u64,
    pub dry_run_failures: u64,
    pub rule_failures: u64,
}

/// A rule that raised during evaluation; the resource sat this run out
#[derive(Debug, Clone)]
pub struct EvaluationFailure {
    pub resource_id: String,
    pub rule: String,
    pub message: String,
}

/// Outcome of one mark phase run
#[derive(Debug, Default, Clone)]
pub struct MarkReport {
    /// Newly marked this run (not previously-marked resources)
    pub marked: Vec<Resource>,
    /// Revoked this run: became compliant or vanished from the crawl
    pub unmarked: Vec<Resource>,
    pub evaluation_failures: Vec<EvaluationFailure>,
}

/// A cleanup hook failure isolated to one resource
#[derive(Debug, Clone)]
pub struct CleanupFailure {
    pub resource: Resource,
    pub message: String,
}

/// Why eligible-looking resources were skipped this run
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipBreakdown {
    pub opted_out: usize,
    pub awaiting_notification: usize,
    pub before_deadline: usize,
}

/// Outcome of one cleanup phase run
#[derive(Debug, Default, Clone)]
pub struct CleanupReport {
    pub cleaned: Vec<Resource>,
    pub failed: Vec<CleanupFailure>,
    pub skipped: SkipBreakdown,
}

/// Rule-driven mark/cleanup state machine for one (kind, region)
pub struct JanitorEngine {
    kind: ResourceKind,
    region: String,
    leashed: bool,
    crawler: Arc<dyn Crawler>,
    tracker: Arc<dyn ResourceTracker>,
    rule_engine: RuleEngine,
    hooks: Arc<dyn ResourceHooks>,
    calendar: Arc<dyn Calendar>,
    metrics: JanitorMetrics,
    last_mark_report: MarkReport,
    last_cleanup_report: CleanupReport,
}

impl JanitorEngine {
    pub fn new(
        config: &JanitorConfig,
        crawler: Arc<dyn Crawler>,
        tracker: Arc<dyn ResourceTracker>,
        rule_engine: RuleEngine,
        hooks: Arc<dyn ResourceHooks>,
        calendar: Arc<dyn Calendar>,
    ) -> Self {
        Self {
            kind: config.kind,
            region: config.region.clone(),
            leashed: config.leashed,
            crawler,
            tracker,
            rule_engine,
            hooks,
            calendar,
            metrics: JanitorMetrics::default(),
            last_mark_report: MarkReport::default(),
            last_cleanup_report: CleanupReport::default(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn is_leashed(&self) -> bool {
        self.leashed
    }

    pub fn set_leashed(&mut self, leashed: bool) {
        self.leashed = leashed;
    }

    pub fn metrics(&self) -> JanitorMetrics {
        self.metrics
    }

    pub fn last_mark_report(&self) -> &MarkReport {
        &self.last_mark_report
    }

    pub fn last_cleanup_report(&self) -> &CleanupReport {
        &self.last_cleanup_report
    }

    /// Mark phase: reconcile live inventory against tracker state and rule
    /// verdicts
    pub async fn mark_resources(&mut self) -> Result<&MarkReport> {
        self.last_mark_report = MarkReport::default();

        let crawled = self
            .crawler
            .resources(self.kind)
            .await
            .context("Failed to crawl live inventory")?;
        let tracked = self
            .tracker
            .get_resources(self.kind, ResourceState::Marked, &self.region)
            .await
            .context("Failed to fetch tracked resources")?;

        info!(
            kind = %self.kind,
            region = %self.region,
            crawled = crawled.len(),
            tracked = tracked.len(),
            "Starting mark phase"
        );

        let tracked_by_id: HashMap<String, Resource> =
            tracked.into_iter().map(|r| (r.id.clone(), r)).collect();

        // Reconcile disappearance before anything else: a resource removed
        // outside this system must be unmarked so the cleanup phase can never
        // act on it.
        for stored in tracked_by_id.values() {
            if !crawled.iter().any(|r| r.id == stored.id) {
                let mut gone = stored.clone();
                gone.state = ResourceState::Unmarked;
                self.tracker
                    .add_or_update(&gone)
                    .await
                    .context("Failed to unmark vanished resource")?;
                info!(
                    resource_id = %gone.id,
                    "Unmarked: no longer present in live inventory"
                );
                self.metrics.unmarked += 1;
                self.last_mark_report.unmarked.push(gone);
            }
        }

        for mut resource in crawled {
            if resource.region.is_empty() {
                resource.region = self.region.clone();
            }
            resource.opt_out_of_janitor = resource.is_opted_out();
            if resource.owner_email.is_none() {
                resource.owner_email = self
                    .crawler
                    .owner_email_for(&resource)
                    .await
                    .context("Failed to resolve owner email")?;
            }

            let verdict = match self.rule_engine.evaluate(&resource) {
                Ok(verdict) => verdict,
                Err(e) => {
                    // A broken rule must never cause an erroneous mark or an
                    // erroneous "safe" unmark; the resource sits this run out.
                    warn!(
                        resource_id = %resource.id,
                        rule = %e.rule,
                        error = %e.message,
                        "Rule evaluation failed; resource excluded from this run"
                    );
                    self.metrics.rule_failures += 1;
                    self.last_mark_report
                        .evaluation_failures
                        .push(EvaluationFailure {
                            resource_id: resource.id.clone(),
                            rule: e.rule,
                            message: e.message,
                        });
                    continue;
                }
            };

            let previously_marked = tracked_by_id.contains_key(&resource.id);
            match verdict {
                Verdict::Invalid(violations) => {
                    if previously_marked {
                        // Already marked: deadlines must not slide, and the
                        // resource is not re-counted as newly marked.
                        debug!(resource_id = %resource.id, "Already marked; left untouched");
                    } else {
                        self.mark(resource, &violations).await?;
                    }
                }
                Verdict::Valid => {
                    if let Some(stored) = tracked_by_id.get(&resource.id) {
                        let mut compliant = stored.clone();
                        compliant.state = ResourceState::Unmarked;
                        self.tracker
                            .add_or_update(&compliant)
                            .await
                            .context("Failed to unmark compliant resource")?;
                        info!(resource_id = %compliant.id, "Unmarked: compliant again");
                        self.metrics.unmarked += 1;
                        self.last_mark_report.unmarked.push(compliant);
                    }
                }
            }
        }

        info!(
            marked = self.last_mark_report.marked.len(),
            unmarked = self.last_mark_report.unmarked.len(),
            evaluation_failures = self.last_mark_report.evaluation_failures.len(),
            "Mark phase complete"
        );
        Ok(&self.last_mark_report)
    }

    /// Transition a resource into MARKED and stamp its deadline
    async fn mark(&mut self, mut resource: Resource, violations: &[Violation]) -> Result<()> {
        // A fresh marking episode: stale fields from a prior episode must not
        // leak into this one.
        resource.reset_mark_fields();
        resource.state = ResourceState::Marked;
        resource.mark_time = Some(self.calendar.now());

        // An operator protection recorded on the stored copy survives
        // re-marking even if the live tags changed.
        if let Some(existing) = self
            .tracker
            .get_resource(&resource.id, &self.region)
            .await
            .context("Failed to read stored resource")?
        {
            resource.opt_out_of_janitor |= existing.opt_out_of_janitor;
        }

        stamp_if_absent(&mut resource, violations);

        if let Err(e) = self.hooks.post_mark(&resource).await {
            warn!(resource_id = %resource.id, error = %e, "post_mark hook failed");
        }

        self.tracker
            .add_or_update(&resource)
            .await
            .context("Failed to persist marked resource")?;

        info!(
            resource_id = %resource.id,
            reason = resource.termination_reason.as_deref().unwrap_or(""),
            deadline = ?resource.expected_termination_time,
            "Marked resource for cleanup"
        );
        self.metrics.marked += 1;
        self.last_mark_report.marked.push(resource);
        Ok(())
    }

    /// Cleanup phase: act on marked resources that cleared every gate
    pub async fn cleanup_resources(&mut self) -> Result<&CleanupReport> {
        self.last_cleanup_report = CleanupReport::default();

        let tracked = self
            .tracker
            .get_resources(self.kind, ResourceState::Marked, &self.region)
            .await
            .context("Failed to fetch tracked resources")?;

        info!(
            kind = %self.kind,
            region = %self.region,
            candidates = tracked.len(),
            leashed = self.leashed,
            "Starting cleanup phase"
        );

        let now = self.calendar.now();
        for resource in tracked {
            if resource.is_opted_out() {
                debug!(resource_id = %resource.id, "Skipped: opted out");
                self.last_cleanup_report.skipped.opted_out += 1;
                continue;
            }
            if resource.notification_time.is_none() {
                debug!(resource_id = %resource.id, "Skipped: owner not yet notified");
                self.last_cleanup_report.skipped.awaiting_notification += 1;
                continue;
            }
            // A marked resource always carries a deadline; a missing one is
            // treated as not yet due rather than due immediately.
            let due = match resource.expected_termination_time {
                Some(deadline) => now >= deadline,
                None => {
                    warn!(resource_id = %resource.id, "Marked resource has no deadline");
                    false
                }
            };
            if !due {
                debug!(resource_id = %resource.id, "Skipped: deadline not reached");
                self.last_cleanup_report.skipped.before_deadline += 1;
                continue;
            }

            if self.leashed {
                match self.hooks.cleanup_dry_run(&resource).await {
                    Ok(()) => {
                        info!(resource_id = %resource.id, "[LEASHED] Would clean");
                    }
                    Err(e) => {
                        warn!(resource_id = %resource.id, error = %e, "Dry-run cleanup failed");
                        self.metrics.dry_run_failures += 1;
                    }
                }
                continue;
            }

            match self.hooks.cleanup(&resource).await {
                Ok(()) => {
                    if let Err(e) = self.hooks.post_cleanup(&resource).await {
                        warn!(resource_id = %resource.id, error = %e, "post_cleanup hook failed");
                    }
                    let mut done = resource;
                    done.state = ResourceState::JanitorTerminated;
                    done.actual_termination_time = Some(self.calendar.now());
                    self.tracker
                        .add_or_update(&done)
                        .await
                        .context("Failed to persist terminated resource")?;
                    info!(
                        resource_id = %done.id,
                        reason = done.termination_reason.as_deref().unwrap_or(""),
                        "Cleaned resource"
                    );
                    self.metrics.cleaned += 1;
                    self.last_cleanup_report.cleaned.push(done);
                }
                Err(e) => {
                    // Per-resource failure boundary: record and keep going.
                    warn!(resource_id = %resource.id, error = %e, "Failed to clean");
                    self.metrics.failed_to_clean += 1;
                    self.last_cleanup_report.failed.push(CleanupFailure {
                        resource,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            cleaned = self.last_cleanup_report.cleaned.len(),
            failed = self.last_cleanup_report.failed.len(),
            "Cleanup phase complete"
        );
        Ok(&self.last_cleanup_report)
    }
}

/// Stamp deadline and reason from the first violation, only if absent
///
/// Stamping lives here rather than in rules so idempotence across runs is a
/// property of the engine, not of rule-author discipline.
fn stamp_if_absent(resource: &mut Resource, violations: &[Violation]) {
    for violation in violations {
        if resource.expected_termination_time.is_none() {
            resource.expected_termination_time = Some(violation.terminate_after);
        }
        if resource.termination_reason.is_none() {
            resource.termination_reason = Some(violation.reason.clone());
        }
    }
}
