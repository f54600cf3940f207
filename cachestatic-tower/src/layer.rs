use tower::Layer;

use crate::service::HandlerService;

/// Tower [`Layer`] turning a [`Handler`](cachestatic::Handler) into a
/// [`HandlerService`].
///
/// Put it outermost so the cache middleware sits between it and the
/// handler:
///
/// ```ignore
/// let service = tower::ServiceBuilder::new()
///     .layer(ServeLayer)
///     .layer(CacheStatic::new())
///     .service(handler);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ServeLayer;

impl<H> Layer<H> for ServeLayer {
    type Service = HandlerService<H>;

    fn layer(&self, handler: H) -> Self::Service {
        HandlerService::new(handler)
    }
}
