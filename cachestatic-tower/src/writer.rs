use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use cachestatic::{
    Capability, CapabilityError, CloseNotify, Connection, Flush, Hijack, ResponseWriter, Upgrade,
};
use futures::future::BoxFuture;
use http::{HeaderMap, Response, StatusCode};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace};

use crate::body::ResponseBody;

/// Buffered bytes are sent as a frame once this many accumulate.
pub const FRAME_SIZE: usize = 8 * 1024;

/// Frames queued ahead of a slow client before writes wait.
const FRAME_QUEUE: usize = 16;

/// Status and headers of a response, sent once per response.
#[derive(Debug)]
pub(crate) struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

impl Head {
    pub(crate) fn into_response(self, body: ResponseBody) -> Response<ResponseBody> {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// [`ResponseWriter`] connected to a streaming [`ResponseBody`].
///
/// The head goes out when the status is written. Body bytes are buffered
/// and sent in frames of [`FRAME_SIZE`], or earlier on flush. Supports
/// [`Flush`], [`CloseNotify`] and, when the request carried an upgrade
/// handle, [`Hijack`]. Server push is not available.
pub struct ChannelWriter {
    headers: HeaderMap,
    head: Option<oneshot::Sender<Head>>,
    frames: Option<mpsc::Sender<Bytes>>,
    pending: BytesMut,
    alive: watch::Receiver<()>,
    upgrade: Option<OnUpgrade>,
}

impl ChannelWriter {
    /// Creates a writer and the body it streams into.
    ///
    /// The head is delivered on `head` when the status is written.
    pub(crate) fn new(
        head: oneshot::Sender<Head>,
        upgrade: Option<OnUpgrade>,
    ) -> (Self, ResponseBody) {
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE);
        let (alive_tx, alive_rx) = watch::channel(());
        let writer = ChannelWriter {
            headers: HeaderMap::new(),
            head: Some(head),
            frames: Some(frames_tx),
            pending: BytesMut::new(),
            alive: alive_rx,
            upgrade,
        };
        (writer, ResponseBody::new(frames_rx, alive_tx))
    }

    /// Completes the response after the handler returned.
    ///
    /// Sends `200 OK` if no status was written and delivers buffered bytes.
    pub(crate) async fn finish(mut self) {
        if self.head.is_some() {
            self.write_status(StatusCode::OK);
        }
        if let Err(error) = self.send_pending().await {
            trace!(%error, "client gone before the last frame");
        }
    }

    async fn send_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let frames = self.frames.as_ref().ok_or_else(hijacked)?;
        let frame = self.pending.split().freeze();
        frames.send(frame).await.map_err(|_| broken_pipe())
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client closed the response")
}

fn hijacked() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection was hijacked")
}

#[async_trait]
impl ResponseWriter for ChannelWriter {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        let Some(sender) = self.head.take() else {
            trace!(%status, "status already written");
            return;
        };
        let head = Head {
            status,
            headers: self.headers.clone(),
        };
        if sender.send(head).is_err() {
            debug!(%status, "response future dropped before the head was sent");
        }
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.head.is_some() {
            self.write_status(StatusCode::OK);
        }
        let frames = self.frames.as_ref().ok_or_else(hijacked)?;
        if frames.is_closed() {
            return Err(broken_pipe());
        }
        self.pending.extend_from_slice(buf);
        if self.pending.len() >= FRAME_SIZE {
            self.send_pending().await?;
        }
        Ok(buf.len())
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }

    fn close_notifier(&mut self) -> Option<&mut dyn CloseNotify> {
        Some(self)
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        if self.upgrade.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl Flush for ChannelWriter {
    async fn flush(&mut self) -> io::Result<()> {
        if self.head.is_some() {
            self.write_status(StatusCode::OK);
        }
        self.send_pending().await
    }
}

impl CloseNotify for ChannelWriter {
    fn closed(&mut self) -> BoxFuture<'static, ()> {
        let mut alive = self.alive.clone();
        Box::pin(async move { while alive.changed().await.is_ok() {} })
    }
}

impl Hijack for ChannelWriter {
    fn hijack(&mut self) -> Result<Upgrade, CapabilityError> {
        let upgrade = self
            .upgrade
            .take()
            .ok_or(CapabilityError::NotSupported(Capability::Hijack))?;
        if self.head.is_some() {
            self.write_status(StatusCode::SWITCHING_PROTOCOLS);
        }
        // Ends the body so the server can hand over the connection.
        self.frames = None;
        self.pending.clear();
        debug!("connection hijacked");

        Ok(Box::pin(async move {
            let upgraded = upgrade.await.map_err(io::Error::other)?;
            Ok(Box::new(TokioIo::new(upgraded)) as Box<dyn Connection>)
        }))
    }
}
