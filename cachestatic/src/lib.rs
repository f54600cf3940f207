//! In-process HTTP response capture and replay.
//!
//! `cachestatic` is a middleware that sits in front of a [`Handler`]. The
//! first request for a key runs the handler through a [`CaptureWriter`],
//! which forwards everything to the client while recording status, headers
//! and body. A `200 OK` capture becomes an immutable [`CacheEntry`] in the
//! middleware's [`CacheStore`], and later requests mapping to the same key
//! are replayed from it without touching the handler.
//!
//! # Core Concepts
//!
//! - **[`ResponseWriter`]**: what handlers write into. Optional transport
//!   capabilities (flush, close notification, push, hijack) are looked up with
//!   methods returning `Option<&mut dyn ..>`; [`ResponseWriterExt`] supplies
//!   the fallbacks when a capability is missing.
//! - **[`CacheStatic`]**: the middleware. Configure it with
//!   [`CacheStatic::builder()`], then [`wrap`](CacheStatic::wrap) a handler
//!   or use it as a tower [`Layer`](tower::Layer).
//! - **[`Indexer`]**: maps a request to its cache key. [`DefaultIndexer`]
//!   uses method and cleaned path, [`EncodingIndexer`] also folds in a
//!   negotiated content coding.
//! - **[`Skipper`]**: decides which requests bypass the cache.
//! - **Invalidation**: keys sent on a tokio channel evict entries; the empty
//!   key clears the store.
//!
//! Entries never expire and the store has no size bound. It is memory
//! resident and lost on restart.
//!
//! # Conditional requests
//!
//! When a cached entry carries `Last-Modified` and the request's
//! `If-Modified-Since` names the same instant, the middleware answers
//! `304 Not Modified` without a body and without `Content-Type`,
//! `Content-Length` and `Accept-Ranges`.
//!
//! # Quick Start
//!
//! ```ignore
//! use cachestatic::{CacheStatic, EncodingIndexer, Handler, Request, ResponseWriter};
//! use tokio::sync::mpsc;
//!
//! let (invalidate, keys) = mpsc::channel(16);
//! let cache = CacheStatic::builder()
//!     .indexer(EncodingIndexer::new("gzip"))
//!     .skipper(|req: &Request| req.uri().path().starts_with("/api/"))
//!     .invalidation(keys)
//!     .build();
//!
//! let handler = cache.wrap(StaticFiles::new("./public"));
//!
//! // later, when a file changes
//! invalidate.send("GET:/index.html".to_owned()).await?;
//! ```
//!
//! # Feature Flags
//!
//! - `metrics`: record hit/miss/commit/invalidation counters with the
//!   `metrics` crate.

#![warn(missing_docs)]

/// Cached response records.
pub mod entry;
/// Error types for optional writer capabilities.
pub mod error;
/// The handler abstraction.
pub mod handler;
/// Request to cache key mapping.
pub mod index;
/// Metrics collection for cache observability.
pub mod metrics;
/// The caching middleware and its builder.
pub mod middleware;
/// In-memory response writer.
pub mod recorder;
/// Capturing writer used on cache misses.
pub mod sink;
/// Cache bypass predicates.
pub mod skip;
/// Immutable header copies.
pub mod snapshot;
/// Cache outcome reporting.
pub mod status;
/// Entry storage and invalidation.
pub mod store;
/// Response writer contract and optional capabilities.
pub mod writer;

/// Request type seen by handlers: head plus a fully read body.
pub type Request = http::Request<bytes::Bytes>;

pub use entry::{CacheEntry, parse_http_date};
pub use error::{Capability, CapabilityError};
pub use handler::Handler;
pub use index::{DefaultIndexer, EncodingIndexer, Indexer, clean_path};
pub use middleware::{CacheStatic, CacheStaticBuilder, Cached};
pub use recorder::ResponseRecorder;
pub use sink::CaptureWriter;
pub use skip::{NeverSkip, Skipper};
pub use snapshot::HeaderSnapshot;
pub use status::{CacheStatus, DEFAULT_CACHE_STATUS_HEADER};
pub use store::{CacheStore, spawn_invalidation};
pub use writer::{
    CloseNotify, Connection, Flush, Hijack, Push, PushOptions, ResponseWriter, ResponseWriterExt,
    Upgrade,
};
