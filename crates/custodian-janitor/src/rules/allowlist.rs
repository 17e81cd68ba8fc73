//! Tag-based allow-listing

use crate::rule::ExclusionRule;
use custodian_common::tags::{TAG_EXCLUDE, TAG_EXCLUDE_VALUE};
use custodian_common::Resource;

/// Resources carrying a specific tag-value pair are always valid
///
/// This is the explicit allow-list: it wins over every other rule, unlike
/// opt-out, which still lets the resource be marked for visibility.
#[derive(Debug, Clone)]
pub struct TagExclusion {
    key: String,
    value: String,
}

impl TagExclusion {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Default for TagExclusion {
    fn default() -> Self {
        Self::new(TAG_EXCLUDE, TAG_EXCLUDE_VALUE)
    }
}

impl ExclusionRule for TagExclusion {
    fn name(&self) -> &'static str {
        "tag-exclusion"
    }

    fn excludes(&self, resource: &Resource) -> bool {
        resource.tag(&self.key) == Some(self.value.as_str())
    }
}
