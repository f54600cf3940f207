//! The transport-facing write contract and its optional capabilities.
//!
//! A [`ResponseWriter`] is what a [`Handler`](crate::Handler) writes its
//! response into. Beyond the mandatory surface (headers, status, body bytes)
//! a transport may expose optional capabilities: streaming flush,
//! close notification, server push and connection takeover. Each one is
//! discovered through an accessor returning `Option<&mut dyn ..>`, so
//! wrappers can forward the lookup to the writer they wrap and downstream
//! code keeps detecting exactly what the real transport supports.
//!
//! Handlers normally go through [`ResponseWriterExt`], which turns a missing
//! capability into the documented fallback: flush and close notification
//! degrade silently, push and hijack return
//! [`CapabilityError::NotSupported`].

use std::io;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use http::{HeaderMap, Method, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Capability, CapabilityError};

/// Writes an HTTP response to a client.
///
/// The status is sent once. Writing body bytes before any status implies
/// `200 OK`, headers mutated after the status was written are not
/// transmitted, and a repeated [`write_status`](Self::write_status) is
/// ignored.
#[async_trait]
pub trait ResponseWriter: Send {
    /// Headers that will be sent with the status.
    fn headers(&self) -> &HeaderMap;

    /// Mutable access to the headers that will be sent with the status.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the response head with the given status.
    fn write_status(&mut self, status: StatusCode);

    /// Writes body bytes, returning how many were accepted.
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Returns the streaming flush capability, if supported.
    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        None
    }

    /// Returns the close notification capability, if supported.
    fn close_notifier(&mut self) -> Option<&mut dyn CloseNotify> {
        None
    }

    /// Returns the server push capability, if supported.
    fn pusher(&mut self) -> Option<&mut dyn Push> {
        None
    }

    /// Returns the connection takeover capability, if supported.
    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        None
    }
}

/// Sends buffered body bytes to the client immediately.
#[async_trait]
pub trait Flush: Send {
    /// Flushes pending body bytes.
    async fn flush(&mut self) -> io::Result<()>;
}

/// Reports when the client connection goes away.
pub trait CloseNotify: Send {
    /// Returns a future that resolves once the client is gone.
    fn closed(&mut self) -> BoxFuture<'static, ()>;
}

/// Initiates a server push for an associated resource.
pub trait Push: Send {
    /// Pushes `target` to the client.
    fn push(&mut self, target: &str, options: PushOptions) -> Result<(), CapabilityError>;
}

/// Takes over the underlying connection.
pub trait Hijack: Send {
    /// Detaches the connection from HTTP handling.
    ///
    /// The returned future resolves to the raw duplex stream once the
    /// transport has released it.
    fn hijack(&mut self) -> Result<Upgrade, CapabilityError>;
}

/// A raw duplex connection obtained through [`Hijack`].
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin + ?Sized {}

/// Future resolving to a hijacked connection.
pub type Upgrade = BoxFuture<'static, io::Result<Box<dyn Connection>>>;

/// Options for [`Push::push`].
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Method of the promised request.
    pub method: Method,
    /// Additional headers of the promised request.
    pub headers: HeaderMap,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
        }
    }
}

/// Convenience methods available on every [`ResponseWriter`].
pub trait ResponseWriterExt: ResponseWriter {
    /// Flushes buffered bytes, or does nothing when flushing is unsupported.
    fn flush(&mut self) -> BoxFuture<'_, io::Result<()>> {
        match self.flusher() {
            Some(flusher) => flusher.flush(),
            None => future::ready(Ok(())).boxed(),
        }
    }

    /// Resolves when the client goes away.
    ///
    /// Never resolves when the transport cannot report it.
    fn close_notify(&mut self) -> BoxFuture<'static, ()> {
        match self.close_notifier() {
            Some(notifier) => notifier.closed(),
            None => future::pending().boxed(),
        }
    }

    /// Pushes `target`, or fails with [`CapabilityError::NotSupported`].
    fn push(&mut self, target: &str, options: PushOptions) -> Result<(), CapabilityError> {
        self.pusher()
            .ok_or(CapabilityError::NotSupported(Capability::Push))?
            .push(target, options)
    }

    /// Hijacks the connection, or fails with [`CapabilityError::NotSupported`].
    fn hijack(&mut self) -> Result<Upgrade, CapabilityError> {
        self.hijacker()
            .ok_or(CapabilityError::NotSupported(Capability::Hijack))?
            .hijack()
    }

    /// Writes the whole buffer, retrying partial writes.
    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let mut rest = buf;
            while !rest.is_empty() {
                match self.write(rest).await {
                    Ok(0) => {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "failed to write whole buffer",
                        ));
                    }
                    Ok(n) => rest = &rest[n..],
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })
    }
}

impl<W> ResponseWriterExt for W where W: ResponseWriter + ?Sized {}
