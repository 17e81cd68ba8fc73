//! Startup-time strategy resolution
//!
//! Hook strategies and rule sets are resolved from configuration once, at
//! startup, through an explicit factory. An unknown strategy is a startup
//! error, never a runtime lookup.

use crate::calendar::Calendar;
use crate::config::JanitorConfig;
use crate::error::ConfigError;
use crate::hooks::{CommandHooks, CommandTemplates, LoggingHooks, ResourceHooks};
use crate::rule::RuleEngine;
use crate::rules::{EmptyGroupRule, RequiredTagsRule, TagExclusion};
use std::sync::Arc;

/// Which cleanup executor a janitor instance uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStrategy {
    /// Record actions in the log and succeed
    Log,
    /// Shell out to operator-configured command templates
    Command,
}

impl HookStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStrategy::Log => "log",
            HookStrategy::Command => "command",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "log" => Some(HookStrategy::Log),
            "command" => Some(HookStrategy::Command),
            _ => None,
        }
    }
}

/// Hook strategy configuration, as parsed from the CLI
#[derive(Debug, Clone, Default)]
pub struct HookConfig {
    pub strategy: Option<HookStrategy>,
    pub cleanup_command: Option<String>,
    pub dry_run_command: Option<String>,
    pub post_mark_command: Option<String>,
    pub post_cleanup_command: Option<String>,
}

/// Resolve the hook strategy into a concrete executor
pub fn build_hooks(config: &HookConfig) -> Result<Arc<dyn ResourceHooks>, ConfigError> {
    match config.strategy.unwrap_or(HookStrategy::Log) {
        HookStrategy::Log => Ok(Arc::new(LoggingHooks)),
        HookStrategy::Command => {
            let cleanup = config
                .cleanup_command
                .clone()
                .ok_or(ConfigError::MissingCleanupCommand)?;
            let hooks = CommandHooks::new(CommandTemplates {
                cleanup,
                dry_run: config.dry_run_command.clone(),
                post_mark: config.post_mark_command.clone(),
                post_cleanup: config.post_cleanup_command.clone(),
            })?;
            Ok(Arc::new(hooks))
        }
    }
}

/// Assemble the rule set for a janitor instance from its policy config
pub fn build_rule_engine(config: &JanitorConfig, calendar: Arc<dyn Calendar>) -> RuleEngine {
    let retention = &config.policy.retention;
    let mut engine = RuleEngine::new().with_exclusion(TagExclusion::default());

    if !config.policy.required_tags.is_empty() {
        engine = engine.with_rule(RequiredTagsRule::new(
            config.policy.required_tags.clone(),
            retention.days_with_owner,
            retention.days_without_owner,
            calendar.clone(),
        ));
    }

    engine = engine.with_rule(EmptyGroupRule::new(
        retention.empty_group_age_days,
        retention.days_with_owner,
        calendar,
    ));

    engine
}
