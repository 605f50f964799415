//! Server-Sent Events decoding
//!
//! Decoding is split in two layers:
//!
//! - [`LineDecoder`] is a pull-based splitter: bytes are pushed in whatever
//!   pieces the transport delivers them, complete lines are pulled out. It
//!   knows nothing about async runtimes or HTTP clients.
//! - [`BufferedSSEParser`] drives a `LineDecoder` from a byte stream and hands
//!   each `data:` payload to a provider-specific [`SSEEventParser`].

use crate::{CompletionError, RawFrame};
use bytes::Bytes;
use futures_util::Stream;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

/// End-of-stream sentinel used by OpenAI-style SSE
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data: ";

/// Buffers partial input until a full line is available.
///
/// Bytes are kept undecoded until a newline arrives, so multi-byte UTF-8
/// sequences split across reads are reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete line with its `\n` / `\r\n` terminator removed
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Whatever is left once the input is exhausted, if anything
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// What a single decoded line means at the SSE level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// JSON (or other) payload following `data: `
    Data(&'a str),
    /// The `[DONE]` sentinel
    Done,
    /// Blank lines, comments, `event:`/`id:` fields and anything else
    Ignored,
}

pub fn classify_line(line: &str) -> SseLine<'_> {
    let line = line.trim();

    if line.is_empty() || line.starts_with(':') {
        return SseLine::Ignored;
    }

    match line.strip_prefix(DATA_PREFIX) {
        Some(data) if data.trim() == DONE_SENTINEL => SseLine::Done,
        Some(data) => SseLine::Data(data.trim()),
        None => SseLine::Ignored,
    }
}

/// Provider-specific decoding of one `data:` payload
pub trait SSEEventParser {
    type State: Send + Unpin;

    /// Decode a payload into zero or more frames.
    ///
    /// Payloads that cannot be understood should return `Ok(vec![])` so the
    /// stream continues; an `Err` terminates the stream.
    fn parse_event(state: &mut Self::State, data: &str) -> Result<Vec<RawFrame>, CompletionError>;
}

/// SSE stream parser that buffers incomplete lines across network reads
/// and queues every frame produced by a single read.
///
/// The inner byte stream is only polled when no decoded frames are waiting,
/// so reading never runs ahead of the consumer.
pub struct BufferedSSEParser<S, P: SSEEventParser> {
    inner: S,
    decoder: LineDecoder,
    state: P::State,
    pending: VecDeque<Result<RawFrame, CompletionError>>,
    /// Set once `[DONE]` is seen, the inner stream ends, or an error is queued
    finished: bool,
    _parser: PhantomData<fn() -> P>,
}

impl<S, P: SSEEventParser> BufferedSSEParser<S, P> {
    pub fn new(stream: S, state: P::State) -> Self {
        Self {
            inner: stream,
            decoder: LineDecoder::new(),
            state,
            pending: VecDeque::new(),
            finished: false,
            _parser: PhantomData,
        }
    }

    fn process_line(&mut self, line: &str) {
        match classify_line(line) {
            SseLine::Ignored => {}
            SseLine::Done => {
                tracing::debug!("Received SSE end-of-stream sentinel");
                self.finished = true;
                self.decoder.clear();
            }
            SseLine::Data(data) => match P::parse_event(&mut self.state, data) {
                Ok(frames) => self.pending.extend(frames.into_iter().map(Ok)),
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.finished = true;
                    self.decoder.clear();
                }
            },
        }
    }

    fn process_buffer(&mut self) {
        while !self.finished {
            match self.decoder.next_line() {
                Some(line) => self.process_line(&line),
                None => break,
            }
        }
    }
}

impl<S, E, P> Stream for BufferedSSEParser<S, P>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
    P: SSEEventParser,
{
    type Item = Result<RawFrame, CompletionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(item) = this.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.decoder.push(&bytes);
                    this.process_buffer();
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    this.decoder.clear();
                    return Poll::Ready(Some(Err(CompletionError::ConnectionError(
                        e.to_string(),
                    ))));
                }
                Poll::Ready(None) => {
                    // A final line may arrive without a trailing newline
                    if let Some(rest) = this.decoder.finish() {
                        if !rest.trim().is_empty() {
                            tracing::debug!(
                                bytes = rest.len(),
                                "Processing unterminated SSE line at stream end"
                            );
                            this.process_line(&rest);
                        }
                    }
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
