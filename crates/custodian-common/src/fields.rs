//! Well-known `additional_fields` keys
//!
//! Crawlers attach descriptive metadata to resources under these keys; rules
//! read them to decide whether a resource is a cleanup candidate. The engine
//! itself never interprets them.

/// Number of live members in a group resource
pub const FIELD_MEMBER_COUNT: &str = "member.count";

/// Number of load balancers attached to a group resource
pub const FIELD_LOAD_BALANCER_COUNT: &str = "loadbalancer.count";

/// RFC 3339 creation time of the resource itself
pub const FIELD_CREATED_AT: &str = "created.at";

/// RFC 3339 creation time of the group's launch configuration
pub const FIELD_CONFIG_CREATED_AT: &str = "config.created.at";
