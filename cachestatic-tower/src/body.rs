use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame};
use tokio::sync::{mpsc, watch};

/// Streaming body of a response produced by a [`ChannelWriter`](crate::ChannelWriter).
///
/// Frames arrive as the handler writes. The body ends when the handler is
/// done or hijacks the connection. Dropping it tells the writer the client
/// went away.
pub struct ResponseBody {
    frames: mpsc::Receiver<Bytes>,
    // Dropped together with the body, which wakes close notifications.
    _alive: watch::Sender<()>,
}

impl ResponseBody {
    pub(crate) fn new(frames: mpsc::Receiver<Bytes>, alive: watch::Sender<()>) -> Self {
        Self {
            frames,
            _alive: alive,
        }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.frames
            .poll_recv(cx)
            .map(|frame| frame.map(|data| Ok(Frame::data(data))))
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}
