//! Metrics declaration and recording.
//!
//! Everything here compiles to no-ops unless the `metrics` feature is on.

use crate::status::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of responses replayed from cache.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachestatic_hit_total",
            "Total number of responses replayed from cache."
        );
        "cachestatic_hit_total"
    };
    /// Track number of conditional replays answered with 304.
    pub static ref CACHE_NOT_MODIFIED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachestatic_not_modified_total",
            "Total number of cache hits answered with Not Modified."
        );
        "cachestatic_not_modified_total"
    };
    /// Track number of requests that reached the wrapped handler.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachestatic_miss_total",
            "Total number of cache miss events."
        );
        "cachestatic_miss_total"
    };
    /// Track number of requests that bypassed the cache.
    pub static ref CACHE_SKIP_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachestatic_skip_total",
            "Total number of requests that bypassed the cache."
        );
        "cachestatic_skip_total"
    };
    /// Track number of captured responses stored.
    pub static ref CACHE_COMMIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachestatic_commit_total",
            "Total number of captured responses stored in the cache."
        );
        "cachestatic_commit_total"
    };
    /// Track number of applied invalidation messages.
    pub static ref CACHE_INVALIDATION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachestatic_invalidation_total",
            "Total number of invalidation messages applied."
        );
        "cachestatic_invalidation_total"
    };
}

/// Records how a request was served.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_status(status: CacheStatus) {
    let counter = match status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::NotModified => *CACHE_NOT_MODIFIED_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
        CacheStatus::Skipped => *CACHE_SKIP_COUNTER,
    };
    metrics::counter!(counter).increment(1);
}

/// Records how a request was served (no-op when metrics feature is disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_status(_status: CacheStatus) {}

/// Records a stored capture.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_commit() {
    metrics::counter!(*CACHE_COMMIT_COUNTER).increment(1);
}

/// Records a stored capture (no-op when metrics feature is disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_commit() {}

/// Records an applied invalidation message.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_invalidation(clear: bool) {
    let scope = if clear { "all" } else { "key" };
    metrics::counter!(*CACHE_INVALIDATION_COUNTER, "scope" => scope).increment(1);
}

/// Records an applied invalidation message (no-op when metrics feature is disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_invalidation(_clear: bool) {}
