//! In-memory response writer.

use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};

use crate::writer::{Flush, ResponseWriter};

/// A [`ResponseWriter`] that keeps the whole response in memory.
///
/// Useful for rendering a handler without a connection, and for tests.
/// It supports [`Flush`], recording that a flush happened.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    headers: HeaderMap,
    head: Option<(StatusCode, HeaderMap)>,
    body: BytesMut,
    flushed: bool,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status written so far.
    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|(status, _)| *status)
    }

    /// Headers as they were when the status was written.
    pub fn sent_headers(&self) -> Option<&HeaderMap> {
        self.head.as_ref().map(|(_, headers)| headers)
    }

    /// Body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns `true` if the handler flushed at least once.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Consumes the recorder, returning the recorded body.
    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }
}

#[async_trait]
impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if self.head.is_none() {
            self.head = Some((status, self.headers.clone()));
        }
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_status(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }
}

#[async_trait]
impl Flush for ResponseRecorder {
    async fn flush(&mut self) -> io::Result<()> {
        self.write_status(StatusCode::OK);
        self.flushed = true;
        Ok(())
    }
}
