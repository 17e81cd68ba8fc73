//! Durable resource lifecycle store
//!
//! The tracker is the janitor's memory across runs: which resources are
//! marked, with what deadline, and whether an operator opted them out.

mod sqlite;

pub use sqlite::SqliteTracker;

use anyhow::Result;
use async_trait::async_trait;
use custodian_common::{Resource, ResourceKind, ResourceState};

/// Durable store of resource lifecycle state, keyed by (kind, id, region)
#[async_trait]
pub trait ResourceTracker: Send + Sync {
    /// Insert the resource, or overwrite the stored copy wholesale
    async fn add_or_update(&self, resource: &Resource) -> Result<()>;

    /// All stored resources of a kind in exactly the given state and region
    async fn get_resources(
        &self,
        kind: ResourceKind,
        state: ResourceState,
        region: &str,
    ) -> Result<Vec<Resource>>;

    /// One stored resource by id and region, if tracked
    async fn get_resource(&self, id: &str, region: &str) -> Result<Option<Resource>>;
}
