//! SQLite-backed resource tracker
//!
//! Uses sqlx for async database access with a connection pool. Timestamps
//! are stored as RFC 3339 text, tag and metadata maps as JSON blobs.

use super::ResourceTracker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custodian_common::tags::{format_timestamp, parse_timestamp};
use custodian_common::{Resource, ResourceKind, ResourceState};
use directories::ProjectDirs;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Database connection pool type alias
pub type DbPool = SqlitePool;

/// SQLite implementation of [`ResourceTracker`]
pub struct SqliteTracker {
    pool: DbPool,
}

/// Get the default tracker database path
fn default_db_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "custodian").context("Failed to get project directories")?;

    let state_dir = proj_dirs.data_local_dir();
    fs::create_dir_all(state_dir).context("Failed to create state directory")?;

    Ok(state_dir.join("janitor.db"))
}

impl SqliteTracker {
    /// Open the tracker at the default path, creating it if needed
    pub async fn open() -> Result<Self> {
        let path = default_db_path()?;
        Self::open_at(&path).await
    }

    /// Open the tracker at an explicit path
    pub async fn open_at(path: &std::path::Path) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open tracker database")?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool (tests use an in-memory pool here)
    pub async fn from_pool(pool: DbPool) -> Result<Self> {
        setup_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Setup database schema
async fn setup_schema(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            resource_kind TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            region TEXT NOT NULL,
            state TEXT NOT NULL,
            opt_out INTEGER NOT NULL DEFAULT 0,
            mark_time TEXT,
            notification_time TEXT,
            expected_termination_time TEXT,
            actual_termination_time TEXT,
            termination_reason TEXT,
            owner_email TEXT,
            tags TEXT NOT NULL DEFAULT '{}',
            additional_fields TEXT NOT NULL DEFAULT '{}',
            PRIMARY KEY (resource_kind, resource_id, region)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_resources_state ON resources(state)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_resources_region ON resources(region)")
        .execute(pool)
        .await?;

    Ok(())
}

fn to_text(time: &Option<DateTime<Utc>>) -> Option<String> {
    time.as_ref().map(|t| format_timestamp(*t))
}

fn from_text(raw: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .with_context(|| format!("Invalid {column} timestamp: '{s}'")),
    }
}

fn row_to_resource(row: &sqlx::sqlite::SqliteRow) -> Result<Resource> {
    let kind_str: String = row.get("resource_kind");
    let kind = ResourceKind::parse(&kind_str)
        .with_context(|| format!("Unknown resource kind '{kind_str}'"))?;

    let state_str: String = row.get("state");
    let state = ResourceState::from_str(&state_str)
        .ok()
        .with_context(|| format!("Unknown resource state '{state_str}'"))?;

    let tags_json: String = row.get("tags");
    let tags: HashMap<String, String> =
        serde_json::from_str(&tags_json).context("Invalid tags JSON")?;

    let fields_json: String = row.get("additional_fields");
    let additional_fields: HashMap<String, String> =
        serde_json::from_str(&fields_json).context("Invalid additional_fields JSON")?;

    Ok(Resource {
        id: row.get("resource_id"),
        kind,
        region: row.get("region"),
        state,
        opt_out_of_janitor: row.get::<i64, _>("opt_out") != 0,
        mark_time: from_text(row.get("mark_time"), "mark_time")?,
        notification_time: from_text(row.get("notification_time"), "notification_time")?,
        expected_termination_time: from_text(
            row.get("expected_termination_time"),
            "expected_termination_time",
        )?,
        actual_termination_time: from_text(
            row.get("actual_termination_time"),
            "actual_termination_time",
        )?,
        termination_reason: row.get("termination_reason"),
        owner_email: row.get("owner_email"),
        tags,
        additional_fields,
    })
}

#[async_trait]
impl ResourceTracker for SqliteTracker {
    async fn add_or_update(&self, resource: &Resource) -> Result<()> {
        let tags_json = serde_json::to_string(&resource.tags)?;
        let fields_json = serde_json::to_string(&resource.additional_fields)?;
        let state: &str = resource.state.as_ref();

        sqlx::query(
            r#"
            INSERT INTO resources (
                resource_kind, resource_id, region, state, opt_out,
                mark_time, notification_time, expected_termination_time,
                actual_termination_time, termination_reason, owner_email,
                tags, additional_fields
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (resource_kind, resource_id, region) DO UPDATE SET
                state = excluded.state,
                opt_out = excluded.opt_out,
                mark_time = excluded.mark_time,
                notification_time = excluded.notification_time,
                expected_termination_time = excluded.expected_termination_time,
                actual_termination_time = excluded.actual_termination_time,
                termination_reason = excluded.termination_reason,
                owner_email = excluded.owner_email,
                tags = excluded.tags,
                additional_fields = excluded.additional_fields
            "#,
        )
        .bind(resource.kind.as_str())
        .bind(&resource.id)
        .bind(&resource.region)
        .bind(state)
        .bind(resource.opt_out_of_janitor as i64)
        .bind(to_text(&resource.mark_time))
        .bind(to_text(&resource.notification_time))
        .bind(to_text(&resource.expected_termination_time))
        .bind(to_text(&resource.actual_termination_time))
        .bind(&resource.termination_reason)
        .bind(&resource.owner_email)
        .bind(&tags_json)
        .bind(&fields_json)
        .execute(&self.pool)
        .await
        .context("Failed to persist resource")?;

        Ok(())
    }

    async fn get_resources(
        &self,
        kind: ResourceKind,
        state: ResourceState,
        region: &str,
    ) -> Result<Vec<Resource>> {
        let state_str: &str = state.as_ref();
        let rows = sqlx::query(
            "SELECT * FROM resources
             WHERE resource_kind = ? AND state = ? AND region = ?
             ORDER BY resource_id",
        )
        .bind(kind.as_str())
        .bind(state_str)
        .bind(region)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query resources")?;

        rows.iter().map(row_to_resource).collect()
    }

    async fn get_resource(&self, id: &str, region: &str) -> Result<Option<Resource>> {
        let row = sqlx::query("SELECT * FROM resources WHERE resource_id = ? AND region = ?")
            .bind(id)
            .bind(region)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query resource")?;

        row.as_ref().map(row_to_resource).transpose()
    }
}
