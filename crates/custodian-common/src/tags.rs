//! Resource tag constants for custodian
//!
//! Custodian reads a small namespaced tag schema off every crawled resource
//! to honor operator overrides without any out-of-band configuration.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `custodian:exclude` | Allow-list marker; excluded resources are never flagged |
//! | `custodian:opt-out` | Operator opt-out; marked for visibility but never cleaned |
//! | `owner` | Owner email used for notification and retention selection |

/// Tag key for the allow-list marker
pub const TAG_EXCLUDE: &str = "custodian:exclude";

/// Tag value that activates the allow-list marker
pub const TAG_EXCLUDE_VALUE: &str = "true";

/// Tag key for operator opt-out
pub const TAG_OPT_OUT: &str = "custodian:opt-out";

/// Tag key for the resource owner's email
pub const TAG_OWNER: &str = "owner";

/// Helper to format a timestamp for tags and persistence
pub fn format_timestamp(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

/// Helper to parse a timestamp from tags and persistence
pub fn parse_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}
