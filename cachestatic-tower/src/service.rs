use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use cachestatic::Handler;
use http::{Request, Response};
use http_body::Body;
use tower::Service;

use crate::body::ResponseBody;
use crate::error::{BoxError, ServeError};
use crate::future::ServeFuture;

/// Serves a [`Handler`] as a tower [`Service`].
///
/// Each call reads the request body in full, then runs the handler on its
/// own tokio task with a [`ChannelWriter`](crate::ChannelWriter). Calls
/// must happen inside a tokio runtime.
pub struct HandlerService<H> {
    handler: Arc<H>,
}

impl<H> HandlerService<H> {
    /// Wraps `handler`.
    pub fn new(handler: H) -> Self {
        HandlerService {
            handler: Arc::new(handler),
        }
    }

    /// The served handler.
    pub fn get_ref(&self) -> &H {
        &self.handler
    }
}

impl<H> Clone for HandlerService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H> fmt::Debug for HandlerService<H>
where
    H: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerService")
            .field("handler", &self.handler)
            .finish()
    }
}

impl<H, B> Service<Request<B>> for HandlerService<H>
where
    H: Handler + 'static,
    B: Body,
    B::Error: Into<BoxError>,
{
    type Response = Response<ResponseBody>;
    type Error = ServeError;
    type Future = ServeFuture<H, B>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        ServeFuture::new(Arc::clone(&self.handler), request)
    }
}
