#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Push-style byte streams for single-threaded, callback driven code.
//!
//! [`BufferedStream`] holds written chunks in an internal buffer until it is
//! flushed (explicitly, or by [`BufferedStream::resume`] and
//! [`BufferedStream::end`]). Chunks are only handed out while the stream is
//! *flowing*: not paused and with at least one `data` listener attached. The
//! `end` notification fires once, after the last buffered chunk has been
//! delivered.
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use strata_stream_utils::BufferedStream;
//!
//! let stream = BufferedStream::new();
//! stream.write("ab").unwrap();
//! stream.write("cd").unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! stream.on_data(move |chunk| sink.borrow_mut().push(chunk.clone()));
//!
//! assert!(seen.borrow().is_empty());
//! stream.flush();
//! assert_eq!(seen.borrow().len(), 2);
//! ```

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Stream has already ended")]
    Ended,
    #[error("Stream has been destroyed")]
    Destroyed,
}

/// The write half of an incremental byte stream.
pub trait ChunkSink {
    /// Queue a chunk for delivery.
    ///
    /// # Errors
    ///
    /// * If the stream has ended or been destroyed
    fn write_chunk(&self, chunk: Bytes) -> Result<(), StreamError>;

    /// Deliver every queued chunk that can currently be delivered.
    fn flush(&self);
}

type DataListener = Rc<RefCell<dyn FnMut(&Bytes)>>;
type SignalListener = Box<dyn FnOnce()>;

#[derive(Default)]
struct State {
    buffer: VecDeque<Bytes>,
    paused: bool,
    ending: bool,
    ended: bool,
    closed: bool,
    destroyed: bool,
    flushing: bool,
    data_listeners: Vec<DataListener>,
    end_listeners: Vec<SignalListener>,
    close_listeners: Vec<SignalListener>,
}

impl State {
    fn is_flowing(&self) -> bool {
        !self.paused && !self.destroyed && !self.data_listeners.is_empty()
    }
}

/// Cloneable handle to a shared, buffered byte stream.
///
/// Every clone refers to the same underlying stream, so a handler may keep
/// writing into a stream after handing a clone of it to somebody else.
#[derive(Clone, Default)]
pub struct BufferedStream {
    state: Rc<RefCell<State>>,
}

impl BufferedStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `chunk` in the internal buffer. Empty chunks are ignored.
    ///
    /// # Errors
    ///
    /// * If [`end`](Self::end) or [`destroy`](Self::destroy) was already called
    pub fn write(&self, chunk: impl Into<Bytes>) -> Result<(), StreamError> {
        let chunk = chunk.into();
        let mut state = self.state.borrow_mut();

        if state.destroyed {
            return Err(StreamError::Destroyed);
        }
        if state.ending {
            return Err(StreamError::Ended);
        }
        if chunk.is_empty() {
            return Ok(());
        }

        log::trace!("Buffering chunk of size {}", chunk.len());
        state.buffer.push_back(chunk);
        drop(state);

        Ok(())
    }

    /// Deliver buffered chunks to the `data` listeners, in write order, and
    /// fire `end` once the buffer is drained after [`end`](Self::end).
    ///
    /// Does nothing while the stream is paused or has no `data` listener.
    pub fn flush(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.flushing {
                return;
            }
            state.flushing = true;
        }

        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                if state.is_flowing() {
                    state
                        .buffer
                        .pop_front()
                        .map(|chunk| (chunk, state.data_listeners.clone()))
                } else {
                    None
                }
            };

            let Some((chunk, listeners)) = next else {
                break;
            };

            log::trace!("Emitting chunk of size {}", chunk.len());
            for listener in listeners {
                let mut listener = listener.borrow_mut();
                (&mut *listener)(&chunk);
            }
        }

        self.state.borrow_mut().flushing = false;
        self.emit_end_if_drained();
    }

    /// Stop delivering chunks until [`resume`](Self::resume) is called.
    pub fn pause(&self) {
        self.state.borrow_mut().paused = true;
    }

    /// Start (or restart) delivery and flush whatever is buffered.
    pub fn resume(&self) {
        self.state.borrow_mut().paused = false;
        self.flush();
    }

    /// Mark the stream as finished. No more writes are accepted; `end` fires
    /// after the remaining buffered chunks have been delivered.
    ///
    /// # Errors
    ///
    /// * If the stream has been destroyed
    pub fn end(&self) -> Result<(), StreamError> {
        {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return Err(StreamError::Destroyed);
            }
            state.ending = true;
        }

        self.flush();

        Ok(())
    }

    /// Tear the stream down: buffered chunks are dropped, later writes fail
    /// and `close` fires. `end` will never fire after this.
    pub fn destroy(&self) {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if state.destroyed || state.closed {
                return;
            }
            state.destroyed = true;
            state.closed = true;
            state.buffer.clear();
            state.data_listeners.clear();
            state.end_listeners.clear();
            std::mem::take(&mut state.close_listeners)
        };

        log::debug!("Stream destroyed");
        for listener in listeners {
            listener();
        }
    }

    /// Subscribe to chunk delivery. Attaching a listener does not flush by
    /// itself.
    pub fn on_data(&self, listener: impl FnMut(&Bytes) + 'static) {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return;
        }
        state.data_listeners.push(Rc::new(RefCell::new(listener)));
    }

    /// Subscribe to the end notification. Runs immediately if the stream
    /// has already ended.
    pub fn on_end(&self, listener: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        if state.ended {
            drop(state);
            listener();
        } else if !state.destroyed {
            state.end_listeners.push(Box::new(listener));
        }
    }

    /// Subscribe to the close notification, fired after `end` or by
    /// [`destroy`](Self::destroy). Runs immediately if already closed.
    pub fn on_close(&self, listener: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        if state.closed {
            drop(state);
            listener();
        } else {
            state.close_listeners.push(Box::new(listener));
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state.borrow().ended
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Number of chunks waiting for a flush.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.state.borrow().buffer.len()
    }

    /// Number of listeners currently attached, across all notifications.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let state = self.state.borrow();
        state.data_listeners.len() + state.end_listeners.len() + state.close_listeners.len()
    }

    /// Whether `other` is a handle to the same underlying stream.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    fn emit_end_if_drained(&self) {
        let (end_listeners, close_listeners) = {
            let mut state = self.state.borrow_mut();
            if !state.ending || state.ended || !state.buffer.is_empty() || !state.is_flowing() {
                return;
            }
            state.ended = true;
            state.closed = true;
            state.data_listeners.clear();
            (
                std::mem::take(&mut state.end_listeners),
                std::mem::take(&mut state.close_listeners),
            )
        };

        log::debug!("Stream ended");
        for listener in end_listeners {
            listener();
        }
        for listener in close_listeners {
            listener();
        }
    }
}

impl ChunkSink for BufferedStream {
    fn write_chunk(&self, chunk: Bytes) -> Result<(), StreamError> {
        self.write(chunk)
    }

    fn flush(&self) {
        Self::flush(self);
    }
}

impl std::io::Write for BufferedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Self::write(self, buf.to_vec()).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Self::flush(self);
        Ok(())
    }
}

impl std::fmt::Debug for BufferedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("BufferedStream")
            .field("buffered", &state.buffer.len())
            .field("paused", &state.paused)
            .field("ended", &state.ended)
            .field("destroyed", &state.destroyed)
            .finish_non_exhaustive()
    }
}
