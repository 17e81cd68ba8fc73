//! Cloud resource types and cleanup ordering
//!
//! Provides consistent cleanup priority across janitors. Resources must be
//! cleaned in dependency order to avoid failures.

use serde::{Deserialize, Serialize};

/// Types of cloud resources managed by custodian
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Auto-scaling group (must go before its launch configuration)
    AutoScalingGroup,
    /// Launch configuration (deletable only once no group references it)
    LaunchConfiguration,
    /// Load balancer
    LoadBalancer,
    /// Block-storage volume
    EbsVolume,
    /// Block-storage snapshot (must outlive any image built from it)
    EbsSnapshot,
    /// Machine image
    MachineImage,
    /// Plain compute instance
    Instance,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::AutoScalingGroup => "auto-scaling-group",
            ResourceKind::LaunchConfiguration => "launch-configuration",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::EbsVolume => "ebs-volume",
            ResourceKind::EbsSnapshot => "ebs-snapshot",
            ResourceKind::MachineImage => "machine-image",
            ResourceKind::Instance => "instance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto-scaling-group" => Some(ResourceKind::AutoScalingGroup),
            "launch-configuration" => Some(ResourceKind::LaunchConfiguration),
            "load-balancer" => Some(ResourceKind::LoadBalancer),
            "ebs-volume" => Some(ResourceKind::EbsVolume),
            "ebs-snapshot" => Some(ResourceKind::EbsSnapshot),
            "machine-image" => Some(ResourceKind::MachineImage),
            "instance" => Some(ResourceKind::Instance),
            _ => None,
        }
    }

    /// Get cleanup priority (lower number = cleanup first)
    ///
    /// Resources must be cleaned up in dependency order:
    /// - 0: Auto-scaling groups (release their instances and launch config)
    /// - 1: Instances and load balancers (no custodian-managed dependents)
    /// - 2: Launch configurations (only deletable once no group uses them)
    /// - 3: Volumes and machine images
    /// - 4: Snapshots (an image registration pins its backing snapshot)
    pub fn cleanup_priority(self) -> u8 {
        match self {
            ResourceKind::AutoScalingGroup => 0,
            ResourceKind::Instance => 1,
            ResourceKind::LoadBalancer => 1,
            ResourceKind::LaunchConfiguration => 2,
            ResourceKind::EbsVolume => 3,
            ResourceKind::MachineImage => 3,
            ResourceKind::EbsSnapshot => 4,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
