//! The handler abstraction the middleware wraps.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Request;
use crate::writer::ResponseWriter;

/// Produces a response for a request by writing into a [`ResponseWriter`].
///
/// Handlers compose: a middleware is a handler holding the next one. The
/// body of the request is already fully read.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Serves `request`, writing the response into `writer`.
    async fn serve(&self, request: &Request, writer: &mut dyn ResponseWriter);
}

#[async_trait]
impl<H> Handler for Arc<H>
where
    H: Handler + ?Sized,
{
    async fn serve(&self, request: &Request, writer: &mut dyn ResponseWriter) {
        (**self).serve(request, writer).await
    }
}

#[async_trait]
impl<H> Handler for Box<H>
where
    H: Handler + ?Sized,
{
    async fn serve(&self, request: &Request, writer: &mut dyn ResponseWriter) {
        (**self).serve(request, writer).await
    }
}
