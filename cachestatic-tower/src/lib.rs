//! Optional tower integration for [`cachestatic`].
//!
//! The cache works with any [`ResponseWriter`](cachestatic::ResponseWriter)
//! and does not need this crate. Use it when handlers should run behind
//! tower or hyper.
//!
//! This crate serves any [`cachestatic::Handler`], including one wrapped
//! by the cache middleware, as a tower [`Service`](tower::Service) over
//! `http::Request<B>`. Plug the service into hyper with
//! `hyper_util::service::TowerToHyperService`.
//!
//! # Core Concepts
//!
//! - **[`HandlerService`]**: reads the request body, runs the handler on a
//!   tokio task and resolves once the response status is written.
//! - **[`ChannelWriter`]**: the live writer handed to the handler. It
//!   streams the body in frames, supports flush and close notification,
//!   and can hijack the connection when the request asked for an upgrade
//!   (serve hyper connections `with_upgrades()` for that).
//! - **[`ResponseBody`]**: the streaming response body.
//! - **[`ServeLayer`]**: a tower layer producing [`HandlerService`]s.
//!
//! # Quick Start
//!
//! ```ignore
//! use cachestatic::CacheStatic;
//! use cachestatic_tower::ServeLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(ServeLayer)
//!     .layer(CacheStatic::new())
//!     .service(StaticFiles::new("./public"));
//! ```

#![warn(missing_docs)]

mod body;
mod error;
mod future;
mod layer;
mod service;
mod writer;

pub use body::ResponseBody;
pub use error::{BoxError, ServeError};
pub use future::ServeFuture;
pub use layer::ServeLayer;
pub use service::HandlerService;
pub use writer::{ChannelWriter, FRAME_SIZE};
