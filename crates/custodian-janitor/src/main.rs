//! custodian: safety-net janitor for orphaned cloud resources
//!
//! Each invocation runs one phase for one (resource kind, region) janitor;
//! an external scheduler decides the cadence. The cleanup phase is leashed
//! unless `--execute` is passed.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use custodian_common::{ResourceKind, ResourceState};
use custodian_janitor::calendar::BusinessCalendar;
use custodian_janitor::config::JanitorConfig;
use custodian_janitor::crawler::SnapshotCrawler;
use custodian_janitor::engine::JanitorEngine;
use custodian_janitor::registry::{self, HookConfig, HookStrategy};
use custodian_janitor::tracker::{ResourceTracker, SqliteTracker};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "custodian")]
#[command(about = "Rule-driven janitor for orphaned cloud resources")]
#[command(version)]
struct Args {
    /// Tracker database path (defaults to the platform data directory)
    #[arg(long, global = true, env = "CUSTODIAN_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Policy knobs shared by the mark and cleanup commands
#[derive(clap::Args, Debug)]
struct PolicyArgs {
    /// Comma-separated tags every resource must carry
    #[arg(long, default_value = "")]
    required_tags: String,

    /// Business days of grace when an owner is known
    #[arg(long, default_value_t = custodian_common::defaults::DEFAULT_RETENTION_DAYS_WITH_OWNER)]
    retention_days_with_owner: u32,

    /// Business days of grace when no owner is known
    #[arg(long, default_value_t = custodian_common::defaults::DEFAULT_RETENTION_DAYS_WITHOUT_OWNER)]
    retention_days_without_owner: u32,

    /// Minimum age in days before an empty group counts as abandoned
    #[arg(long, default_value_t = custodian_common::defaults::DEFAULT_EMPTY_GROUP_AGE_DAYS)]
    empty_group_age_days: i64,
}

impl PolicyArgs {
    fn parse_required_tags(&self) -> Vec<String> {
        self.required_tags
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Hook executor selection shared by the mark and cleanup commands
#[derive(clap::Args, Debug)]
struct HookArgs {
    /// Hook strategy: "log" or "command"
    #[arg(long, default_value = "log")]
    hook_strategy: String,

    /// Cleanup command template ({id}, {kind}, {region} placeholders)
    #[arg(long)]
    cleanup_cmd: Option<String>,

    /// Dry-run probe command template
    #[arg(long)]
    dry_run_cmd: Option<String>,

    /// Command to run right after a resource is marked
    #[arg(long)]
    post_mark_cmd: Option<String>,

    /// Command to run after a successful cleanup
    #[arg(long)]
    post_cleanup_cmd: Option<String>,
}

impl HookArgs {
    fn to_hook_config(&self) -> Result<HookConfig> {
        let strategy = HookStrategy::parse(&self.hook_strategy)
            .with_context(|| format!("Unknown hook strategy '{}'", self.hook_strategy))?;
        Ok(HookConfig {
            strategy: Some(strategy),
            cleanup_command: self.cleanup_cmd.clone(),
            dry_run_command: self.dry_run_cmd.clone(),
            post_mark_command: self.post_mark_cmd.clone(),
            post_cleanup_command: self.post_cleanup_cmd.clone(),
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the mark phase: reconcile live inventory against rules
    Mark {
        /// Resource kind to janitor (e.g. "auto-scaling-group")
        #[arg(long)]
        kind: String,

        /// Region this janitor owns
        #[arg(long)]
        region: String,

        /// JSON inventory snapshot written by an external enumerator
        #[arg(long, env = "CUSTODIAN_INVENTORY")]
        inventory: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        hooks: HookArgs,
    },

    /// Run the cleanup phase on previously marked resources
    Cleanup {
        #[arg(long)]
        kind: String,

        #[arg(long)]
        region: String,

        /// JSON inventory snapshot (crawler collaborator for the engine)
        #[arg(long, env = "CUSTODIAN_INVENTORY")]
        inventory: PathBuf,

        /// Actually delete resources (default is leashed dry-run)
        #[arg(long)]
        execute: bool,

        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        hooks: HookArgs,
    },

    /// List tracked resources
    List {
        #[arg(long)]
        kind: String,

        #[arg(long)]
        region: String,

        /// Lifecycle state to list: unmarked, marked, janitor-terminated
        #[arg(long, default_value = "marked")]
        state: String,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Protect a tracked resource from cleanup
    OptOut {
        #[arg(long)]
        id: String,
        #[arg(long)]
        region: String,
    },

    /// Remove a tracked resource's cleanup protection
    OptIn {
        #[arg(long)]
        id: String,
        #[arg(long)]
        region: String,
    },

    /// Record that the owner has been notified (the sending is external)
    Notify {
        #[arg(long)]
        id: String,
        #[arg(long)]
        region: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let tracker = match &args.db {
        Some(path) => SqliteTracker::open_at(path).await?,
        None => SqliteTracker::open().await?,
    };
    let tracker = Arc::new(tracker);

    match args.command {
        Command::Mark {
            kind,
            region,
            inventory,
            policy,
            hooks,
        } => {
            let mut engine = build_engine(
                &kind, &region, &inventory, &policy, &hooks, true, tracker,
            )?;
            let report = engine.mark_resources().await?;

            println!("Marked:   {}", report.marked.len());
            for r in &report.marked {
                println!(
                    "  {} ({})",
                    r.id,
                    r.termination_reason.as_deref().unwrap_or("no reason")
                );
            }
            println!("Unmarked: {}", report.unmarked.len());
            for r in &report.unmarked {
                println!("  {}", r.id);
            }
            if !report.evaluation_failures.is_empty() {
                println!("Rule failures: {}", report.evaluation_failures.len());
                for f in &report.evaluation_failures {
                    println!("  {} [{}]: {}", f.resource_id, f.rule, f.message);
                }
            }
        }

        Command::Cleanup {
            kind,
            region,
            inventory,
            execute,
            policy,
            hooks,
        } => {
            let leashed = !execute;
            if leashed {
                info!("Janitor is leashed; pass --execute to perform real cleanup");
            }
            let mut engine = build_engine(
                &kind, &region, &inventory, &policy, &hooks, leashed, tracker,
            )?;
            let report = engine.cleanup_resources().await?;

            println!("Cleaned:        {}", report.cleaned.len());
            for r in &report.cleaned {
                println!("  {}", r.id);
            }
            println!("Failed:         {}", report.failed.len());
            for f in &report.failed {
                println!("  {}: {}", f.resource.id, f.message);
            }
            println!(
                "Skipped:        {} opted out, {} awaiting notification, {} before deadline",
                report.skipped.opted_out,
                report.skipped.awaiting_notification,
                report.skipped.before_deadline
            );
            if leashed {
                println!(
                    "Dry-run failures (cumulative): {}",
                    engine.metrics().dry_run_failures
                );
            }
        }

        Command::List {
            kind,
            region,
            state,
            format,
        } => {
            let kind = parse_kind(&kind)?;
            let state = ResourceState::from_str(&state)
                .ok()
                .with_context(|| format!("Unknown state '{state}'"))?;
            let resources = tracker.get_resources(kind, state, &region).await?;
            print_resources(&resources, &format)?;
        }

        Command::OptOut { id, region } => {
            set_opt_out(tracker.as_ref(), &id, &region, true).await?;
            println!("Opted out: {id}");
        }

        Command::OptIn { id, region } => {
            set_opt_out(tracker.as_ref(), &id, &region, false).await?;
            println!("Opted in: {id}");
        }

        Command::Notify { id, region } => {
            let mut resource = tracker
                .get_resource(&id, &region)
                .await?
                .with_context(|| format!("Resource '{id}' is not tracked in {region}"))?;
            if resource.notification_time.is_none() {
                resource.notification_time = Some(Utc::now());
                tracker.add_or_update(&resource).await?;
                println!("Notification recorded for {id}");
            } else {
                println!("Notification already recorded for {id}");
            }
        }
    }

    Ok(())
}

fn parse_kind(raw: &str) -> Result<ResourceKind> {
    match ResourceKind::parse(raw) {
        Some(kind) => Ok(kind),
        None => bail!("Unknown resource kind '{raw}'"),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_engine(
    kind: &str,
    region: &str,
    inventory: &PathBuf,
    policy: &PolicyArgs,
    hooks: &HookArgs,
    leashed: bool,
    tracker: Arc<SqliteTracker>,
) -> Result<JanitorEngine> {
    let mut config = JanitorConfig::new(parse_kind(kind)?, region);
    config.leashed = leashed;
    config.policy.required_tags = policy.parse_required_tags();
    config.policy.retention.days_with_owner = policy.retention_days_with_owner;
    config.policy.retention.days_without_owner = policy.retention_days_without_owner;
    config.policy.retention.empty_group_age_days = policy.empty_group_age_days;
    config.validate()?;

    let calendar = Arc::new(BusinessCalendar::new());
    let rule_engine = registry::build_rule_engine(&config, calendar.clone());
    let hooks = registry::build_hooks(&hooks.to_hook_config()?)?;
    let crawler = Arc::new(SnapshotCrawler::new(inventory.clone()));

    Ok(JanitorEngine::new(
        &config,
        crawler,
        tracker,
        rule_engine,
        hooks,
        calendar,
    ))
}

async fn set_opt_out(
    tracker: &SqliteTracker,
    id: &str,
    region: &str,
    opt_out: bool,
) -> Result<()> {
    let mut resource = tracker
        .get_resource(id, region)
        .await?
        .with_context(|| format!("Resource '{id}' is not tracked in {region}"))?;
    resource.opt_out_of_janitor = opt_out;
    tracker.add_or_update(&resource).await?;
    Ok(())
}

fn print_resources(resources: &[custodian_common::Resource], format: &str) -> Result<()> {
    if resources.is_empty() {
        println!("No tracked resources match.");
        return Ok(());
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(resources)?);
        return Ok(());
    }

    println!(
        "{:<22} {:<20} {:<10} {:<8} {:<20} REASON",
        "ID", "KIND", "STATE", "OPT-OUT", "DEADLINE"
    );
    println!("{}", "-".repeat(100));
    for r in resources {
        println!(
            "{:<22} {:<20} {:<10} {:<8} {:<20} {}",
            if r.id.len() > 21 {
                format!("{}...", &r.id[..18])
            } else {
                r.id.clone()
            },
            r.kind.as_str(),
            r.state.to_string(),
            if r.opt_out_of_janitor { "yes" } else { "no" },
            r.expected_termination_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            r.termination_reason.as_deref().unwrap_or(""),
        );
    }
    println!("\nTotal: {} resources", resources.len());
    Ok(())
}
