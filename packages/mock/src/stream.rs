//! Streams for writing test response bodies.
//!
//! [`FlushingStream`] flushes after every write, so a listener attached to
//! the underlying stream sees each chunk as soon as it is written (provided
//! the stream is flowing). [`capture`] builds one that records everything
//! written to it into a shared string.

use std::{cell::RefCell, rc::Rc};

use bytes::Bytes;
use strata::Body;
use strata_stream_utils::{BufferedStream, ChunkSink, StreamError};

/// A stream that flushes its sink after every write.
#[derive(Debug, Clone, Default)]
pub struct FlushingStream<S: ChunkSink = BufferedStream> {
    inner: S,
}

impl<S: ChunkSink> FlushingStream<S> {
    pub const fn from_sink(inner: S) -> Self {
        Self { inner }
    }

    /// Writes `chunk`, then flushes.
    ///
    /// # Errors
    ///
    /// * If the sink rejects the chunk; nothing is flushed in that case
    pub fn write(&self, chunk: impl Into<Bytes>) -> Result<(), StreamError> {
        self.inner.write_chunk(chunk.into())?;
        self.inner.flush();
        Ok(())
    }

    pub fn flush(&self) {
        self.inner.flush();
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl FlushingStream {
    #[must_use]
    pub fn new() -> Self {
        Self::from_sink(BufferedStream::new())
    }

    pub fn on_data(&self, listener: impl FnMut(&Bytes) + 'static) {
        self.inner.on_data(listener);
    }

    pub fn on_end(&self, listener: impl FnOnce() + 'static) {
        self.inner.on_end(listener);
    }

    pub fn on_close(&self, listener: impl FnOnce() + 'static) {
        self.inner.on_close(listener);
    }

    /// # Errors
    ///
    /// * If the stream has been destroyed
    pub fn end(&self) -> Result<(), StreamError> {
        self.inner.end()
    }

    pub fn pause(&self) {
        self.inner.pause();
    }

    pub fn resume(&self) {
        self.inner.resume();
    }

    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

impl<S: ChunkSink> ChunkSink for FlushingStream<S> {
    fn write_chunk(&self, chunk: Bytes) -> Result<(), StreamError> {
        self.write(chunk)
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

impl<S: ChunkSink> std::io::Write for FlushingStream<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Self::write(self, buf.to_vec()).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Self::flush(self);
        Ok(())
    }
}

impl From<FlushingStream> for Body {
    fn from(value: FlushingStream) -> Self {
        Self::Stream(value.into_inner())
    }
}

/// Shared text written by a [`capture`] stream.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    data: Rc<RefCell<String>>,
}

impl Captured {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured so far.
    #[must_use]
    pub fn data(&self) -> String {
        self.data.borrow().clone()
    }
}

/// Returns a flowing stream that appends each written chunk to `target`.
///
/// `target` is cleared first. Chunks are decoded on their own, so a
/// multi-byte character split across writes is replaced with U+FFFD.
///
/// A capture stream that is ended before the app responds has delivered
/// everything to `target` already, so a buffering request reports
/// [`Error::StreamConsumed`](crate::Error::StreamConsumed) for it.
#[must_use]
pub fn capture(target: &Captured) -> FlushingStream {
    target.data.borrow_mut().clear();

    let stream = FlushingStream::new();
    let data = target.data.clone();
    stream.on_data(move |chunk| {
        data.borrow_mut().push_str(&String::from_utf8_lossy(chunk));
    });

    stream
}
