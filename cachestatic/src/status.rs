//! How a request was served by the cache.

use http::{HeaderName, HeaderValue};

/// Default header name for the cache status (`HIT`/`MISS`).
///
/// The header is only emitted when configured with
/// [`CacheStaticBuilder::cache_status_header`](crate::CacheStaticBuilder::cache_status_header).
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Outcome of a request passing through the cache middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The full cached response was replayed.
    Hit,
    /// A cached response matched `If-Modified-Since` and 304 was sent.
    NotModified,
    /// The wrapped handler produced the response.
    Miss,
    /// The request bypassed the cache.
    Skipped,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::NotModified => "not_modified",
            CacheStatus::Miss => "miss",
            CacheStatus::Skipped => "skipped",
        }
    }

    /// Value sent in the cache status header, if this outcome has one.
    pub fn header_value(&self) -> Option<HeaderValue> {
        match self {
            CacheStatus::Hit | CacheStatus::NotModified => Some(HeaderValue::from_static("HIT")),
            CacheStatus::Miss => Some(HeaderValue::from_static("MISS")),
            CacheStatus::Skipped => None,
        }
    }
}
