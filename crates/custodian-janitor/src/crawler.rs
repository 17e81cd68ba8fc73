//! Live-inventory crawler contract
//!
//! The crawler is the authoritative view of what actually exists in the
//! cloud account right now. Implementations must return a fresh snapshot on
//! every call; the engine assumes no caching.

use anyhow::{Context, Result};
use async_trait::async_trait;
use custodian_common::tags::TAG_OWNER;
use custodian_common::{Resource, ResourceKind};
use std::collections::HashSet;
use std::path::PathBuf;

/// Enumerates live resources of a type/region from the cloud provider
#[async_trait]
pub trait Crawler: Send + Sync {
    /// All live resources of one kind
    async fn resources(&self, kind: ResourceKind) -> Result<Vec<Resource>>;

    /// Live resources matching specific ids
    async fn resources_by_id(&self, ids: &[String]) -> Result<Vec<Resource>>;

    /// The resource kinds this crawler can enumerate
    fn resource_kinds(&self) -> HashSet<ResourceKind>;

    /// Best-effort owner lookup for a resource
    async fn owner_email_for(&self, resource: &Resource) -> Result<Option<String>>;
}

/// Crawler over a JSON inventory snapshot written by an external enumerator
///
/// Provider SDK enumeration stays outside this crate; whatever produces the
/// snapshot (a describe-and-dump script, an inventory pipeline) re-writes
/// the file on its own schedule. The file is re-read on every call so each
/// crawl observes the latest snapshot.
pub struct SnapshotCrawler {
    path: PathBuf,
}

impl SnapshotCrawler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<Resource>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read inventory snapshot {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid inventory snapshot {}", self.path.display()))
    }
}

#[async_trait]
impl Crawler for SnapshotCrawler {
    async fn resources(&self, kind: ResourceKind) -> Result<Vec<Resource>> {
        let all = self.load().await?;
        Ok(all.into_iter().filter(|r| r.kind == kind).collect())
    }

    async fn resources_by_id(&self, ids: &[String]) -> Result<Vec<Resource>> {
        let all = self.load().await?;
        Ok(all
            .into_iter()
            .filter(|r| ids.iter().any(|id| *id == r.id))
            .collect())
    }

    fn resource_kinds(&self) -> HashSet<ResourceKind> {
        // A snapshot can carry any kind; the engine filters per janitor.
        [
            ResourceKind::AutoScalingGroup,
            ResourceKind::LaunchConfiguration,
            ResourceKind::LoadBalancer,
            ResourceKind::EbsVolume,
            ResourceKind::EbsSnapshot,
            ResourceKind::MachineImage,
            ResourceKind::Instance,
        ]
        .into_iter()
        .collect()
    }

    async fn owner_email_for(&self, resource: &Resource) -> Result<Option<String>> {
        Ok(resource.tag(TAG_OWNER).map(str::to_string))
    }
}
