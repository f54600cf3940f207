//! Capturing response writer used on cache misses.

use std::io;

use async_trait::async_trait;
use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::trace;

use crate::entry::CacheEntry;
use crate::error::{Capability, CapabilityError};
use crate::snapshot::HeaderSnapshot;
use crate::writer::{CloseNotify, Flush, Hijack, Push, ResponseWriter, Upgrade};

/// A [`ResponseWriter`] that records everything written through it while
/// forwarding it to the live writer.
///
/// Header mutations are made on a private copy, created lazily from the live
/// headers the first time [`headers_mut`](ResponseWriter::headers_mut) is
/// called, and merged into the live headers when the status is written. The
/// headers the client actually receives are snapshotted at that moment.
///
/// Optional capabilities are offered exactly when the wrapped writer has
/// them. Flushing and hijacking send the head, so they merge the private
/// headers first, the same way writing the status does.
pub struct CaptureWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    headers: Option<HeaderMap>,
    live_header: Option<(HeaderName, HeaderValue)>,
    status: Option<StatusCode>,
    sent: Option<HeaderSnapshot>,
    body: BytesMut,
    intact: bool,
}

impl<'a> CaptureWriter<'a> {
    /// Wraps `inner`.
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            headers: None,
            live_header: None,
            status: None,
            sent: None,
            body: BytesMut::new(),
            intact: true,
        }
    }

    /// Adds a header to the live response only.
    ///
    /// It is set on the wrapped writer when the status is written and is
    /// never part of the captured headers. If the handler already set a
    /// header of that name, the handler's value is sent and captured instead.
    pub fn with_live_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.live_header = Some((name, value));
        self
    }

    /// Status written by the handler, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Body bytes accepted by the live writer so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns `false` once a forwarded write has failed.
    pub fn is_intact(&self) -> bool {
        self.intact
    }

    /// Turns the capture into a cache entry.
    ///
    /// Returns `None` if no status was ever written. Deciding whether the
    /// entry is worth storing is up to the caller.
    pub fn into_entry(self) -> Option<CacheEntry> {
        let headers = self.sent?;
        Some(CacheEntry::new(self.body.freeze(), headers))
    }

    // the private copy was seeded from the live map, so it replaces it
    fn merge_headers(&mut self) {
        if let Some(headers) = self.headers.take() {
            *self.inner.headers_mut() = headers;
        }
    }
}

#[async_trait]
impl<'a> ResponseWriter for CaptureWriter<'a> {
    fn headers(&self) -> &HeaderMap {
        match &self.headers {
            Some(headers) => headers,
            None => self.inner.headers(),
        }
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.headers.get_or_insert_with(|| self.inner.headers().clone())
    }

    fn write_status(&mut self, status: StatusCode) {
        if let Some(written) = self.status {
            trace!(%written, ignored = %status, "superfluous write_status");
            return;
        }
        self.status = Some(status);
        self.merge_headers();

        self.sent = Some(HeaderSnapshot::capture(self.inner.headers()));
        // a handler-set value wins over the live-only header
        if let Some((name, value)) = self.live_header.take()
            && !self.inner.headers().contains_key(&name)
        {
            self.inner.headers_mut().insert(name, value);
        }

        self.inner.write_status(status);
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_status(StatusCode::OK);
        }
        match self.inner.write(buf).await {
            Ok(n) => {
                self.body.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            Err(e) => {
                self.intact = false;
                Err(e)
            }
        }
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        if self.inner.flusher().is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn close_notifier(&mut self) -> Option<&mut dyn CloseNotify> {
        self.inner.close_notifier()
    }

    fn pusher(&mut self) -> Option<&mut dyn Push> {
        self.inner.pusher()
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        if self.inner.hijacker().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

/// Flushing sends the head, so it finalizes the status like a first write.
#[async_trait]
impl<'a> Flush for CaptureWriter<'a> {
    async fn flush(&mut self) -> io::Result<()> {
        if self.status.is_none() {
            self.write_status(StatusCode::OK);
        }
        match self.inner.flusher() {
            Some(flusher) => flusher.flush().await,
            None => Ok(()),
        }
    }
}

/// The inner writer picks the status of a hijacked response, so the headers
/// are handed over and the capture is abandoned.
impl<'a> Hijack for CaptureWriter<'a> {
    fn hijack(&mut self) -> Result<Upgrade, CapabilityError> {
        if self.inner.hijacker().is_none() {
            return Err(CapabilityError::NotSupported(Capability::Hijack));
        }
        self.merge_headers();
        self.intact = false;
        self.inner
            .hijacker()
            .ok_or(CapabilityError::NotSupported(Capability::Hijack))?
            .hijack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::ResponseRecorder;
    use crate::writer::{PushOptions, ResponseWriterExt};
    use futures::future::{self, BoxFuture, FutureExt};
    use http::header::{CONTENT_TYPE, LAST_MODIFIED, UPGRADE};
    use pretty_assertions::assert_eq;

    /// Writer exposing every optional capability and counting calls.
    #[derive(Default)]
    struct FullWriter {
        headers: HeaderMap,
        flushes: usize,
        pushes: Vec<String>,
        hijacks: usize,
    }

    #[async_trait]
    impl ResponseWriter for FullWriter {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_status(&mut self, _status: StatusCode) {}

        async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flusher(&mut self) -> Option<&mut dyn Flush> {
            Some(self)
        }

        fn close_notifier(&mut self) -> Option<&mut dyn CloseNotify> {
            Some(self)
        }

        fn pusher(&mut self) -> Option<&mut dyn Push> {
            Some(self)
        }

        fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
            Some(self)
        }
    }

    #[async_trait]
    impl Flush for FullWriter {
        async fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    impl CloseNotify for FullWriter {
        fn closed(&mut self) -> BoxFuture<'static, ()> {
            future::ready(()).boxed()
        }
    }

    impl Push for FullWriter {
        fn push(&mut self, target: &str, _options: PushOptions) -> Result<(), CapabilityError> {
            self.pushes.push(target.to_owned());
            Ok(())
        }
    }

    impl Hijack for FullWriter {
        fn hijack(&mut self) -> Result<Upgrade, CapabilityError> {
            self.hijacks += 1;
            Ok(future::ready(Err(io::Error::from(io::ErrorKind::NotConnected))).boxed())
        }
    }

    /// Writer whose writes always fail.
    #[derive(Default)]
    struct BrokenWriter {
        headers: HeaderMap,
    }

    #[async_trait]
    impl ResponseWriter for BrokenWriter {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_status(&mut self, _status: StatusCode) {}

        async fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[tokio::test]
    async fn records_and_forwards_writes() {
        let mut recorder = ResponseRecorder::new();
        let mut sink = CaptureWriter::new(&mut recorder);

        sink.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        sink.write_status(StatusCode::OK);
        sink.write_all(b"hello ").await.unwrap();
        sink.write_all(b"world").await.unwrap();

        assert_eq!(sink.status(), Some(StatusCode::OK));
        let entry = sink.into_entry().unwrap();
        assert_eq!(entry.body().as_ref(), b"hello world");
        assert_eq!(entry.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(recorder.body(), b"hello world");
        assert_eq!(recorder.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn header_changes_stay_private_until_status() {
        let mut recorder = ResponseRecorder::new();
        recorder
            .headers_mut()
            .insert("x-outer", HeaderValue::from_static("1"));
        let mut sink = CaptureWriter::new(&mut recorder);

        sink.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(sink.inner.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(sink.headers().get("x-outer").unwrap(), "1");

        sink.write_status(StatusCode::OK);
        drop(sink);

        let sent = recorder.sent_headers().unwrap();
        assert_eq!(sent.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(sent.get_all("x-outer").iter().count(), 1);
    }

    #[tokio::test]
    async fn first_write_implies_ok() {
        let mut recorder = ResponseRecorder::new();
        let mut sink = CaptureWriter::new(&mut recorder);

        sink.write_all(b"body").await.unwrap();

        assert_eq!(sink.status(), Some(StatusCode::OK));
        drop(sink);
        assert_eq!(recorder.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn second_status_is_ignored() {
        let mut recorder = ResponseRecorder::new();
        let mut sink = CaptureWriter::new(&mut recorder);

        sink.write_status(StatusCode::NOT_FOUND);
        sink.write_status(StatusCode::OK);

        assert_eq!(sink.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn live_header_is_not_captured() {
        let mut recorder = ResponseRecorder::new();
        let mut sink = CaptureWriter::new(&mut recorder).with_live_header(
            HeaderName::from_static("x-cache-status"),
            HeaderValue::from_static("MISS"),
        );

        sink.headers_mut().insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Tue, 15 Nov 1994 08:12:31 GMT"),
        );
        sink.write_status(StatusCode::OK);
        let entry = sink.into_entry().unwrap();

        assert!(entry.headers().get("x-cache-status").is_none());
        assert!(entry.last_modified().is_some());
        assert_eq!(
            recorder.sent_headers().unwrap().get("x-cache-status").unwrap(),
            "MISS"
        );
    }

    #[tokio::test]
    async fn without_status_there_is_no_entry() {
        let mut recorder = ResponseRecorder::new();
        let sink = CaptureWriter::new(&mut recorder);

        assert!(sink.into_entry().is_none());
    }

    #[tokio::test]
    async fn write_errors_propagate_and_break_the_capture() {
        let mut broken = BrokenWriter::default();
        let mut sink = CaptureWriter::new(&mut broken);

        let err = sink.write(b"lost").await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(!sink.is_intact());
        assert!(sink.body().is_empty());
    }

    #[tokio::test]
    async fn capabilities_are_delegated() {
        let mut full = FullWriter::default();
        let mut sink = CaptureWriter::new(&mut full);

        ResponseWriterExt::flush(&mut sink).await.unwrap();
        sink.push("/style.css", PushOptions::default()).unwrap();
        assert!(ResponseWriterExt::hijack(&mut sink).is_ok());
        sink.close_notify().await;
        drop(sink);

        assert_eq!(full.flushes, 1);
        assert_eq!(full.pushes, vec!["/style.css".to_owned()]);
        assert_eq!(full.hijacks, 1);
    }

    #[tokio::test]
    async fn missing_capabilities_degrade() {
        let mut broken = BrokenWriter::default();
        let mut sink = CaptureWriter::new(&mut broken);

        ResponseWriterExt::flush(&mut sink).await.unwrap();
        assert!(sink.flusher().is_none());
        assert!(sink.close_notifier().is_none());

        let err = sink.push("/app.js", PushOptions::default()).unwrap_err();
        assert!(matches!(err, CapabilityError::NotSupported(Capability::Push)));
        let err = ResponseWriterExt::hijack(&mut sink).err().unwrap();
        assert!(matches!(err, CapabilityError::NotSupported(Capability::Hijack)));
        assert!(sink.is_intact());
    }

    #[tokio::test]
    async fn flush_before_status_sends_private_headers() {
        let mut recorder = ResponseRecorder::new();
        let mut sink = CaptureWriter::new(&mut recorder);

        sink.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/css"));
        ResponseWriterExt::flush(&mut sink).await.unwrap();
        sink.write_all(b"body").await.unwrap();

        assert_eq!(sink.status(), Some(StatusCode::OK));
        let entry = sink.into_entry().unwrap();
        assert!(recorder.is_flushed());
        let sent = recorder.sent_headers().unwrap();
        assert_eq!(sent.get(CONTENT_TYPE).unwrap(), "text/css");
        assert_eq!(entry.headers().get(CONTENT_TYPE).unwrap(), "text/css");
        assert_eq!(entry.body().as_ref(), b"body");
    }

    #[tokio::test]
    async fn hijack_before_status_hands_over_headers() {
        let mut full = FullWriter::default();
        let mut sink = CaptureWriter::new(&mut full);

        sink.headers_mut()
            .insert(UPGRADE, HeaderValue::from_static("echo"));
        assert!(ResponseWriterExt::hijack(&mut sink).is_ok());

        assert!(!sink.is_intact());
        assert!(sink.status().is_none());
        assert!(sink.into_entry().is_none());
        assert_eq!(full.headers.get(UPGRADE).unwrap(), "echo");
        assert_eq!(full.hijacks, 1);
    }

    #[tokio::test]
    async fn handler_header_wins_over_live_header() {
        let mut recorder = ResponseRecorder::new();
        let mut sink = CaptureWriter::new(&mut recorder).with_live_header(
            HeaderName::from_static("x-cache-status"),
            HeaderValue::from_static("MISS"),
        );

        sink.headers_mut()
            .insert("x-cache-status", HeaderValue::from_static("custom"));
        sink.write_status(StatusCode::OK);
        let entry = sink.into_entry().unwrap();

        assert_eq!(entry.headers().get("x-cache-status").unwrap(), "custom");
        let sent = recorder.sent_headers().unwrap();
        let values: Vec<_> = sent.get_all("x-cache-status").iter().collect();
        assert_eq!(values, vec!["custom"]);
    }
}
