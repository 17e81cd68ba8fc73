//! The tracked resource entity and its lifecycle states

use crate::resource_kind::ResourceKind;
use crate::tags::{TAG_OPT_OUT, TAG_OWNER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a tracked resource
///
/// A resource absent from the tracker has never been marked; there is no
/// explicit "unknown" state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ResourceState {
    /// Not currently a cleanup candidate (either never marked, or revoked)
    #[default]
    #[strum(serialize = "unmarked")]
    #[serde(rename = "unmarked")]
    Unmarked,
    /// Flagged as a cleanup candidate with a termination deadline stamped
    #[strum(serialize = "marked")]
    #[serde(rename = "marked")]
    Marked,
    /// Terminated by the janitor; terminal
    #[strum(serialize = "janitor-terminated")]
    #[serde(rename = "janitor-terminated")]
    JanitorTerminated,
}

/// One cloud object's cleanup lifecycle state
///
/// An ephemeral copy is built from live cloud state by the crawler every run;
/// a durable copy is created by the tracker the first time the resource is
/// marked. `(kind, id, region)` is the composite identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceKind,
    pub region: String,
    #[serde(default)]
    pub state: ResourceState,
    /// Operator override: still marked and reported, but never cleaned up
    #[serde(default)]
    pub opt_out_of_janitor: bool,
    #[serde(default)]
    pub mark_time: Option<DateTime<Utc>>,
    /// Stamped by an external notifier; the engine only reads it
    #[serde(default)]
    pub notification_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_termination_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_termination_time: Option<DateTime<Utc>>,
    /// Diagnostic set from the rule that flagged the resource
    #[serde(default)]
    pub termination_reason: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Descriptive metadata read by rules, never by the state machine
    #[serde(default)]
    pub additional_fields: HashMap<String, String>,
}

impl Resource {
    /// Create an unmarked resource with bare identity
    pub fn new(kind: ResourceKind, id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            region: region.into(),
            state: ResourceState::Unmarked,
            opt_out_of_janitor: false,
            mark_time: None,
            notification_time: None,
            expected_termination_time: None,
            actual_termination_time: None,
            termination_reason: None,
            owner_email: None,
            tags: HashMap::new(),
            additional_fields: HashMap::new(),
        }
    }

    /// Builder-style tag attachment, for crawlers and tests
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Builder-style metadata attachment, for crawlers and tests
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_fields.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.additional_fields.get(key).map(String::as_str)
    }

    /// Whether the operator opted this resource out, via flag or tag
    pub fn is_opted_out(&self) -> bool {
        self.opt_out_of_janitor || self.tag(TAG_OPT_OUT).is_some_and(|v| v == "true")
    }

    /// Owner email from the explicit field, falling back to the owner tag
    pub fn owner(&self) -> Option<&str> {
        self.owner_email.as_deref().or_else(|| self.tag(TAG_OWNER))
    }

    /// Clear the fields of a previous marking episode
    ///
    /// Re-marking after an unmark starts a fresh episode; stale deadlines
    /// from the old episode must not survive into the new one.
    pub fn reset_mark_fields(&mut self) {
        self.mark_time = None;
        self.notification_time = None;
        self.expected_termination_time = None;
        self.actual_termination_time = None;
        self.termination_reason = None;
    }
}
