// ==============
// crates/client-lib/src/metrics.rs

//! Central place for metric keys
pub const AUTH_SUCCEEDED: &str = "auth.attempt.succeeded";
pub const AUTH_FAILED: &str = "auth.attempt.failed";
pub const AUTH_THROTTLED: &str = "auth.throttled";
pub const DIET_CACHE_MUTATION: &str = "diet.cache.mutation";
