//! Immutable copies of response headers.

use http::header::{GetAll, Iter};
use http::{HeaderMap, HeaderName, HeaderValue};

/// An owned, read-only copy of a header map.
///
/// A snapshot is taken from the live transport headers at the moment a
/// response head is finalized. The copy owns its map, so later mutation of
/// the transport's headers never reaches a stored entry, and nothing hands
/// out mutable access to it afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSnapshot {
    headers: HeaderMap,
}

impl HeaderSnapshot {
    /// Copies every name and value of `headers`.
    pub fn capture(headers: &HeaderMap) -> Self {
        let mut copy = HeaderMap::with_capacity(headers.keys_len());
        for (name, value) in headers {
            copy.append(name.clone(), value.clone());
        }
        Self { headers: copy }
    }

    /// Returns the first value stored for `name`.
    pub fn get(&self, name: impl http::header::AsHeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Returns every value stored for `name`, in insertion order.
    pub fn get_all(&self, name: impl http::header::AsHeaderName) -> GetAll<'_, HeaderValue> {
        self.headers.get_all(name)
    }

    /// Iterates over all name/value pairs.
    pub fn iter(&self) -> Iter<'_, HeaderValue> {
        self.headers.iter()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns `true` if no headers were captured.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Borrows the snapshot as a plain header map.
    pub fn as_map(&self) -> &HeaderMap {
        &self.headers
    }

    /// Writes the snapshot onto `target`.
    ///
    /// Every name present in the snapshot ends up with exactly the stored
    /// values. Names the snapshot does not carry are left untouched.
    pub fn replay_onto(&self, target: &mut HeaderMap) {
        for name in self.headers.keys() {
            target.remove(name);
        }
        for (name, value) in &self.headers {
            target.append(name.clone(), value.clone());
        }
    }
}

impl<'a> IntoIterator for &'a HeaderSnapshot {
    type Item = (&'a HeaderName, &'a HeaderValue);
    type IntoIter = Iter<'a, HeaderValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}
