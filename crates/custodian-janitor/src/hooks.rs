//! Per-resource-type janitor capabilities
//!
//! The engine decides *whether* and *when* a resource goes; hooks decide
//! *how*. A concrete janitor supplies one [`ResourceHooks`] implementation
//! per resource type at construction time.

use crate::error::{ConfigError, DryRunFailure};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use custodian_common::defaults::DEFAULT_HOOK_TIMEOUT_SECS;
use custodian_common::Resource;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Capability interface injected into the engine per resource type
#[async_trait]
pub trait ResourceHooks: Send + Sync {
    /// Invoked right after a resource is newly marked; a notifier typically
    /// listens here. Failures are logged by the engine, not escalated.
    async fn post_mark(&self, resource: &Resource) -> Result<()>;

    /// The actual destructive action. An error means this resource failed;
    /// the engine isolates it from the rest of the batch.
    async fn cleanup(&self, resource: &Resource) -> Result<()>;

    /// Probe whether real cleanup would succeed. Must never mutate cloud
    /// state; failures are diagnostic only.
    async fn cleanup_dry_run(&self, resource: &Resource) -> Result<(), DryRunFailure>;

    /// Invoked after a successful cleanup, before the tracker transition.
    async fn post_cleanup(&self, resource: &Resource) -> Result<()>;
}

/// Hooks that record every action in the log and succeed
///
/// For staging a janitor before wiring a real executor: mark flow, reports,
/// and tracker transitions all behave normally while nothing touches the
/// cloud.
#[derive(Debug, Default, Clone)]
pub struct LoggingHooks;

#[async_trait]
impl ResourceHooks for LoggingHooks {
    async fn post_mark(&self, resource: &Resource) -> Result<()> {
        info!(
            resource_id = %resource.id,
            kind = %resource.kind,
            reason = resource.termination_reason.as_deref().unwrap_or(""),
            "Marked for cleanup"
        );
        Ok(())
    }

    async fn cleanup(&self, resource: &Resource) -> Result<()> {
        info!(resource_id = %resource.id, kind = %resource.kind, "Would clean (log-only hooks)");
        Ok(())
    }

    async fn cleanup_dry_run(&self, resource: &Resource) -> Result<(), DryRunFailure> {
        info!(resource_id = %resource.id, kind = %resource.kind, "[DRY RUN] Would clean");
        Ok(())
    }

    async fn post_cleanup(&self, resource: &Resource) -> Result<()> {
        info!(resource_id = %resource.id, "Cleanup recorded");
        Ok(())
    }
}

/// Operator-configured command templates for [`CommandHooks`]
///
/// Templates support `{id}`, `{kind}` and `{region}` placeholders and are
/// split on whitespace after substitution; there is no shell involved, so
/// quoting is not supported.
#[derive(Debug, Clone)]
pub struct CommandTemplates {
    pub cleanup: String,
    pub dry_run: Option<String>,
    pub post_mark: Option<String>,
    pub post_cleanup: Option<String>,
}

/// Hooks that shell out to operator-configured commands
///
/// This is how a deployment plugs its provider CLI in without the janitor
/// linking any provider SDK.
#[derive(Debug)]
pub struct CommandHooks {
    templates: CommandTemplates,
    timeout: Duration,
}

impl CommandHooks {
    pub fn new(templates: CommandTemplates) -> Result<Self, ConfigError> {
        Self::with_timeout(templates, Duration::from_secs(DEFAULT_HOOK_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        templates: CommandTemplates,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        for template in [Some(&templates.cleanup)]
            .into_iter()
            .flatten()
            .chain(templates.dry_run.iter())
            .chain(templates.post_mark.iter())
            .chain(templates.post_cleanup.iter())
        {
            validate_template(template)?;
        }
        Ok(Self { templates, timeout })
    }

    async fn run(&self, template: &str, resource: &Resource) -> Result<()> {
        let argv = render_template(template, resource);
        let Some((program, args)) = argv.split_first() else {
            bail!("hook command template rendered to nothing");
        };

        debug!(cmd = %argv.join(" "), resource_id = %resource.id, "Running hook command");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(program).args(args).output(),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "hook command timed out after {}s: {}",
                self.timeout.as_secs(),
                program
            )
        })?
        .with_context(|| format!("Failed to spawn hook command: {program}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "hook command exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceHooks for CommandHooks {
    async fn post_mark(&self, resource: &Resource) -> Result<()> {
        match &self.templates.post_mark {
            Some(template) => self.run(template, resource).await,
            None => Ok(()),
        }
    }

    async fn cleanup(&self, resource: &Resource) -> Result<()> {
        self.run(&self.templates.cleanup, resource).await
    }

    async fn cleanup_dry_run(&self, resource: &Resource) -> Result<(), DryRunFailure> {
        let Some(template) = &self.templates.dry_run else {
            debug!(resource_id = %resource.id, "No dry-run probe configured");
            return Ok(());
        };
        self.run(template, resource)
            .await
            .map_err(|e| DryRunFailure::new(&resource.id, e.to_string()))
    }

    async fn post_cleanup(&self, resource: &Resource) -> Result<()> {
        match &self.templates.post_cleanup {
            Some(template) => self.run(template, resource).await,
            None => {
                warn!(resource_id = %resource.id, "No post-cleanup command configured");
                Ok(())
            }
        }
    }
}

/// Substitute placeholders and split into argv on whitespace
fn render_template(template: &str, resource: &Resource) -> Vec<String> {
    template
        .replace("{id}", &resource.id)
        .replace("{kind}", resource.kind.as_str())
        .replace("{region}", &resource.region)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Reject templates with placeholders the renderer does not know
fn validate_template(template: &str) -> Result<(), ConfigError> {
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + close];
        if !matches!(name, "id" | "kind" | "region") {
            return Err(ConfigError::UnknownPlaceholder(name.to_string()));
        }
        rest = &rest[open + close + 1..];
    }
    Ok(())
}
