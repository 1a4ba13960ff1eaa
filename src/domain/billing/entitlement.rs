//! Entitlement classification.
//!
//! The single place where a provider subscription status string is
//! classified as entitled or lapsed. Every webhook handler consults this
//! function; the status set must never be duplicated elsewhere.

/// Subscription statuses that grant an entitlement.
///
/// `past_due` is deliberately absent: a failed payment alone does not
/// unpublish anything, but it does not count as entitled either. The
/// profile comes down only when a terminal subscription event arrives.
pub const ENTITLED_STATUSES: [&str; 2] = ["active", "trialing"];

/// Returns true if the given provider status string grants an entitlement.
pub fn is_entitled(status: &str) -> bool {
    ENTITLED_STATUSES.contains(&status)
}
