//! Default configuration values shared across custodian components
//!
//! These constants keep janitor instances consistent when the operator does
//! not override retention policy.

/// Default business days between marking and termination when an owner is known
pub const DEFAULT_RETENTION_DAYS_WITH_OWNER: u32 = 4;

/// Default business days between marking and termination with no known owner
///
/// Shorter than the owned case: with nobody accountable to notify, waiting
/// longer buys nothing.
pub const DEFAULT_RETENTION_DAYS_WITHOUT_OWNER: u32 = 2;

/// Default minimum age in days before an empty group is considered abandoned
pub const DEFAULT_EMPTY_GROUP_AGE_DAYS: i64 = 30;

/// Default timeout in seconds for command-based cleanup hooks
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 300;
