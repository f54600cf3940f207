//! Cached responses.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use http::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue};

use crate::snapshot::HeaderSnapshot;

/// A captured `200 OK` response, ready to be replayed.
///
/// Entries are immutable. The store replaces them whole and shares them
/// behind an `Arc`, so a reader holding one never needs a lock.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    body: Bytes,
    headers: HeaderSnapshot,
    last_modified: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Builds an entry, parsing `Last-Modified` from the snapshot once.
    pub fn new(body: impl Into<Bytes>, headers: HeaderSnapshot) -> Self {
        let last_modified = headers.get(LAST_MODIFIED).and_then(parse_http_date);
        Self {
            body: body.into(),
            headers,
            last_modified,
        }
    }

    /// Response payload as written by the handler.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Response headers as they were when the status was sent.
    pub fn headers(&self) -> &HeaderSnapshot {
        &self.headers
    }

    /// Parsed `Last-Modified`, absent when missing or unparseable.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Returns `true` when `request` carries an `If-Modified-Since` equal
    /// to this entry's `Last-Modified`.
    ///
    /// An unparseable request date never matches.
    pub fn is_not_modified(&self, request: &HeaderMap) -> bool {
        let Some(last_modified) = self.last_modified else {
            return false;
        };
        request
            .get(IF_MODIFIED_SINCE)
            .and_then(parse_http_date)
            .is_some_and(|since| since == last_modified)
    }
}

/// IMF-fixdate layout.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parses an RFC 1123 HTTP date such as `Tue, 15 Nov 1994 08:12:31 GMT`.
///
/// Other RFC 2822 spellings, like numeric zones or a missing weekday, are
/// rejected.
pub fn parse_http_date(value: &HeaderValue) -> Option<DateTime<Utc>> {
    let value = value.to_str().ok()?;
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE)
        .ok()
        .map(|date| date.and_utc())
}
