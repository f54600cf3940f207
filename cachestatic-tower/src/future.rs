use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cachestatic::Handler;
use futures::ready;
use http::Response;
use http::request::Parts;
use http_body::Body;
use http_body_util::combinators::Collect;
use hyper::upgrade::OnUpgrade;
use pin_project::pin_project;
use tokio::sync::oneshot;
use tracing::trace;

use crate::body::ResponseBody;
use crate::error::{BoxError, ServeError};
use crate::writer::{ChannelWriter, Head};

/// Response future of [`HandlerService`](crate::HandlerService).
///
/// Reads the request body, starts the handler on a tokio task and resolves
/// with the response head as soon as the handler writes it. The body keeps
/// streaming from the task afterwards.
///
/// # Panics
///
/// Panics if polled again after it resolved.
#[pin_project]
pub struct ServeFuture<H, B>
where
    B: Body,
{
    #[pin]
    state: State<H, B>,
}

#[pin_project(project = StateProj)]
enum State<H, B>
where
    B: Body,
{
    Collecting {
        #[pin]
        collect: Collect<B>,
        parts: Option<Parts>,
        handler: Arc<H>,
    },
    AwaitingHead {
        #[pin]
        head: oneshot::Receiver<Head>,
        body: Option<ResponseBody>,
    },
    Done,
}

impl<H, B> ServeFuture<H, B>
where
    B: Body,
{
    pub(crate) fn new(handler: Arc<H>, request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        ServeFuture {
            state: State::Collecting {
                collect: http_body_util::BodyExt::collect(body),
                parts: Some(parts),
                handler,
            },
        }
    }
}

impl<H, B> Future for ServeFuture<H, B>
where
    H: Handler + 'static,
    B: Body,
    B::Error: Into<BoxError>,
{
    type Output = Result<Response<ResponseBody>, ServeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        loop {
            match this.state.as_mut().project() {
                StateProj::Collecting {
                    collect,
                    parts,
                    handler,
                } => {
                    let collected =
                        ready!(collect.poll(cx)).map_err(|error| ServeError::Body(error.into()))?;
                    let Some(mut parts) = parts.take() else {
                        return Poll::Ready(Err(ServeError::Aborted));
                    };
                    let upgrade = parts.extensions.remove::<OnUpgrade>();
                    let request = http::Request::from_parts(parts, collected.to_bytes());

                    let (head_tx, head_rx) = oneshot::channel();
                    let (mut writer, body) = ChannelWriter::new(head_tx, upgrade);
                    let handler = Arc::clone(handler);
                    tokio::spawn(async move {
                        handler.serve(&request, &mut writer).await;
                        writer.finish().await;
                        trace!(uri = %request.uri(), "handler finished");
                    });

                    this.state.set(State::AwaitingHead {
                        head: head_rx,
                        body: Some(body),
                    });
                }
                StateProj::AwaitingHead { head, body } => {
                    let head = ready!(head.poll(cx)).map_err(|_| ServeError::Aborted)?;
                    let Some(body) = body.take() else {
                        return Poll::Ready(Err(ServeError::Aborted));
                    };
                    this.state.set(State::Done);
                    return Poll::Ready(Ok(head.into_response(body)));
                }
                StateProj::Done => panic!("ServeFuture polled after completion"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use cachestatic::{Request, ResponseWriter};
    use http_body_util::Empty;
    use pretty_assertions::assert_eq;
    use std::task::Waker;

    struct Silent;

    #[async_trait]
    impl Handler for Silent {
        async fn serve(&self, _request: &Request, _writer: &mut dyn ResponseWriter) {}
    }

    #[tokio::test]
    #[should_panic(expected = "polled after completion")]
    async fn polling_a_resolved_future_panics() {
        let request = http::Request::get("/").body(Empty::<Bytes>::new()).unwrap();
        let mut future = Box::pin(ServeFuture::new(Arc::new(Silent), request));

        let response = future.as_mut().await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let _ = future.as_mut().poll(&mut Context::from_waker(Waker::noop()));
    }
}
