//! The caching middleware.
//!
//! Every request walks the same small state machine:
//!
//! ```text
//! skip check ──skipped──▶ next handler
//!     │
//!   index ──▶ lookup ──hit──▶ conditional check ──▶ 304 | full replay
//!                  │
//!                 miss ──▶ next handler through CaptureWriter ──▶ commit if 200
//! ```
//!
//! There is no coalescing of concurrent misses: two requests missing the
//! same key both run the handler and the last one to finish wins the slot.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderName, StatusCode};
use tokio::sync::mpsc;
use tower::Layer;
use tracing::{debug, trace};

use crate::Request;
use crate::entry::CacheEntry;
use crate::handler::Handler;
use crate::index::{DefaultIndexer, Indexer};
use crate::metrics;
use crate::sink::CaptureWriter;
use crate::skip::{NeverSkip, Skipper};
use crate::status::CacheStatus;
use crate::store::{CacheStore, spawn_invalidation};
use crate::writer::{ResponseWriter, ResponseWriterExt};

/// Response cache middleware.
///
/// A `CacheStatic` owns one [`CacheStore`]. Every handler wrapped by it, or
/// by any of its clones, shares that store, and the store lives as long as
/// the last of them.
///
/// Wrap a handler with [`wrap`](Self::wrap) or use it as a tower
/// [`Layer`].
#[derive(Clone)]
pub struct CacheStatic {
    store: Arc<CacheStore>,
    skipper: Arc<dyn Skipper>,
    indexer: Arc<dyn Indexer>,
    status_header: Option<HeaderName>,
}

impl CacheStatic {
    /// Creates the middleware with default settings: nothing is skipped,
    /// keys are [`DefaultIndexer`] keys, and there is no invalidation source.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder.
    pub fn builder() -> CacheStaticBuilder {
        CacheStaticBuilder::default()
    }

    /// The store backing this middleware.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Wraps `next` with caching.
    pub fn wrap<H>(&self, next: H) -> Cached<H> {
        Cached {
            next,
            cache: self.clone(),
        }
    }

    async fn replay(
        &self,
        entry: &CacheEntry,
        request: &Request,
        writer: &mut dyn ResponseWriter,
    ) -> CacheStatus {
        let status = if entry.is_not_modified(request.headers()) {
            CacheStatus::NotModified
        } else {
            CacheStatus::Hit
        };

        let headers = writer.headers_mut();
        entry.headers().replay_onto(headers);
        // a stored header of the same name came from the handler and wins
        if let Some((name, value)) = self.status_header.clone().zip(status.header_value())
            && entry.headers().get(&name).is_none()
        {
            headers.insert(name, value);
        }

        if status == CacheStatus::NotModified {
            headers.remove(CONTENT_TYPE);
            headers.remove(CONTENT_LENGTH);
            headers.remove(ACCEPT_RANGES);
            writer.write_status(StatusCode::NOT_MODIFIED);
            return status;
        }

        writer.write_status(StatusCode::OK);
        if let Err(error) = writer.write_all(entry.body()).await {
            debug!(%error, "client write failed during replay");
        }
        status
    }

    fn commit(&self, key: String, sink: CaptureWriter<'_>) {
        let status = sink.status();
        if status != Some(StatusCode::OK) || !sink.is_intact() {
            debug!(%key, ?status, intact = sink.is_intact(), "response not cacheable");
            return;
        }
        if let Some(entry) = sink.into_entry() {
            self.store.put(key, entry);
            metrics::record_commit();
        }
    }
}

impl Default for CacheStatic {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheStatic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStatic")
            .field("entries", &self.store.len())
            .field("skipper", &"...")
            .field("indexer", &"...")
            .field("status_header", &self.status_header)
            .finish()
    }
}

impl<H> Layer<H> for CacheStatic {
    type Service = Cached<H>;

    fn layer(&self, next: H) -> Self::Service {
        self.wrap(next)
    }
}

/// Builder for [`CacheStatic`].
pub struct CacheStaticBuilder {
    skipper: Arc<dyn Skipper>,
    indexer: Arc<dyn Indexer>,
    invalidation: Option<mpsc::Receiver<String>>,
    status_header: Option<HeaderName>,
}

impl CacheStaticBuilder {
    /// Sets the predicate deciding which requests bypass the cache.
    pub fn skipper<S>(self, skipper: S) -> Self
    where
        S: Skipper + 'static,
    {
        CacheStaticBuilder {
            skipper: Arc::new(skipper),
            ..self
        }
    }

    /// Sets the function mapping requests to cache keys.
    pub fn indexer<I>(self, indexer: I) -> Self
    where
        I: Indexer + 'static,
    {
        CacheStaticBuilder {
            indexer: Arc::new(indexer),
            ..self
        }
    }

    /// Applies keys received on `keys` as invalidations.
    ///
    /// An empty key clears the store. A consumer task is spawned by
    /// [`build`](Self::build), which must then run inside a tokio runtime.
    pub fn invalidation(self, keys: mpsc::Receiver<String>) -> Self {
        CacheStaticBuilder {
            invalidation: Some(keys),
            ..self
        }
    }

    /// Emits `HIT`/`MISS` in the given response header.
    ///
    /// The header is added to the live response only and never stored. A
    /// handler setting a header of the same name keeps its own value.
    pub fn cache_status_header(self, name: HeaderName) -> Self {
        CacheStaticBuilder {
            status_header: Some(name),
            ..self
        }
    }

    /// Builds the middleware with a fresh, empty store.
    ///
    /// # Panics
    ///
    /// Panics if an invalidation source is configured and this is called
    /// outside of a tokio runtime.
    pub fn build(self) -> CacheStatic {
        let store = Arc::new(CacheStore::new());
        if let Some(keys) = self.invalidation {
            spawn_invalidation(&store, keys);
        }
        CacheStatic {
            store,
            skipper: self.skipper,
            indexer: self.indexer,
            status_header: self.status_header,
        }
    }
}

impl Default for CacheStaticBuilder {
    fn default() -> Self {
        Self {
            skipper: Arc::new(NeverSkip),
            indexer: Arc::new(DefaultIndexer),
            invalidation: None,
            status_header: None,
        }
    }
}

/// A handler wrapped by [`CacheStatic`].
#[derive(Clone, Debug)]
pub struct Cached<H> {
    next: H,
    cache: CacheStatic,
}

impl<H> Cached<H> {
    /// The wrapped handler.
    pub fn get_ref(&self) -> &H {
        &self.next
    }

    /// The middleware configuration and store.
    pub fn cache(&self) -> &CacheStatic {
        &self.cache
    }
}

#[async_trait]
impl<H> Handler for Cached<H>
where
    H: Handler,
{
    async fn serve(&self, request: &Request, writer: &mut dyn ResponseWriter) {
        let cache = &self.cache;
        if cache.skipper.skip(request) {
            trace!(uri = %request.uri(), "request bypasses cache");
            metrics::record_status(CacheStatus::Skipped);
            return self.next.serve(request, writer).await;
        }

        let key = cache.indexer.index(request);
        if let Some(entry) = cache.store.get(&key) {
            let status = cache.replay(&entry, request, writer).await;
            debug!(%key, status = status.as_str(), "served from cache");
            metrics::record_status(status);
            return;
        }

        debug!(%key, "cache miss");
        metrics::record_status(CacheStatus::Miss);
        let mut sink = CaptureWriter::new(writer);
        if let Some((name, value)) = cache
            .status_header
            .clone()
            .zip(CacheStatus::Miss.header_value())
        {
            sink = sink.with_live_header(name, value);
        }
        self.next.serve(request, &mut sink).await;
        cache.commit(key, sink);
    }
}
