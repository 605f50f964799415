//! Stream normalization
//!
//! [`UpstreamSession`] owns a single upstream request from the moment it is
//! issued until the connection is released. It moves through three states:
//!
//! ```text
//! Open --(response headers ok)--> Streaming --(exhausted)--> Terminal (Done)
//!   |                                |
//!   +--(http / connect error)--------+--(decode / transport error)--> Terminal (Error)
//! ```
//!
//! Exactly one terminal event (`Error` or `Done`) is yielded, after which the
//! stream ends. Cancellation via [`CancelHandle`] or by dropping the session
//! releases the upstream connection and yields no terminal event at all.
//!
//! The upstream request is not issued until the session is first polled, and
//! the upstream body is only read when the consumer asks for the next event.

use crate::external::{BackendConfig, ProviderBackend};
use crate::{ChatCompletionParams, CompletionError, FrameStream, StreamEvent};
use futures_util::future::BoxFuture;
use futures_util::task::AtomicWaker;
use futures_util::{FutureExt, Stream};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

type OpenFuture = BoxFuture<'static, Result<FrameStream, CompletionError>>;

#[derive(Default)]
enum SessionState {
    /// Request issued (or about to be); waiting for the upstream to accept it
    Open(OpenFuture),
    /// Upstream accepted; frames are flowing
    Streaming(FrameStream),
    /// Terminal event emitted, or cancelled; upstream resources released
    #[default]
    Terminal,
}

/// State shared between a session and its cancel handles.
///
/// The upstream future or frame stream lives here so that `cancel()` can
/// drop it without waiting for the consumer to poll again.
#[derive(Default)]
struct SessionShared {
    cancelled: AtomicBool,
    waker: AtomicWaker,
    state: Mutex<SessionState>,
}

impl SessionShared {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in `Terminal` and drop the previous state outside the lock
    fn release(&self) {
        let released = std::mem::take(&mut *self.lock_state());
        drop(released);
    }
}

/// Cloneable handle that cancels an in-flight session from anywhere.
///
/// Cancelling releases the upstream connection immediately and wakes a
/// consumer blocked on the next event; that poll then returns `None`
/// without a terminal event.
#[derive(Clone, Default)]
pub struct CancelHandle {
    inner: Arc<SessionShared>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.release();
            tracing::debug!("Upstream session cancelled by caller");
            self.inner.waker.wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// One upstream streaming request, normalized to [`StreamEvent`]s
pub struct UpstreamSession {
    cancel: CancelHandle,
}

impl UpstreamSession {
    fn with_state(state: SessionState) -> Self {
        let cancel = CancelHandle::new();
        *cancel.inner.lock_state() = state;
        Self { cancel }
    }

    /// Wrap a future that opens the upstream stream
    pub fn new<F>(open: F) -> Self
    where
        F: Future<Output = Result<FrameStream, CompletionError>> + Send + 'static,
    {
        Self::with_state(SessionState::Open(open.boxed()))
    }

    /// Session that opens `model` on `backend` when first polled
    pub fn open(
        backend: Arc<dyn ProviderBackend>,
        config: BackendConfig,
        model: String,
        params: ChatCompletionParams,
    ) -> Self {
        Self::new(async move {
            tracing::debug!(
                backend = backend.backend_type(),
                model = %model,
                "Issuing upstream request"
            );
            backend.chat_completion_stream(&config, &model, params).await
        })
    }

    /// Session over an already-open frame stream
    pub fn from_frames(frames: FrameStream) -> Self {
        Self::with_state(SessionState::Streaming(frames))
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(*self.cancel.inner.lock_state(), SessionState::Terminal)
    }
}

/// Move to Terminal and report `error`, unless it is a cancellation
fn fail(state: &mut SessionState, error: CompletionError) -> Poll<Option<StreamEvent>> {
    *state = SessionState::Terminal;

    if matches!(error, CompletionError::Cancelled) {
        tracing::debug!("Upstream stream cancelled");
        return Poll::Ready(None);
    }

    tracing::warn!(error = %error, "Upstream stream failed");
    Poll::Ready(Some(StreamEvent::Error {
        kind: error.stream_error_kind(),
        message: error.to_string(),
    }))
}

impl Stream for UpstreamSession {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        let shared = &self.cancel.inner;
        shared.waker.register(cx.waker());

        let mut state = shared.lock_state();
        if shared.cancelled.load(Ordering::Acquire) {
            // cancel() already released the upstream; nothing is left to drop
            *state = SessionState::Terminal;
            return Poll::Ready(None);
        }

        loop {
            match &mut *state {
                SessionState::Open(open) => match open.as_mut().poll(cx) {
                    Poll::Ready(Ok(frames)) => {
                        tracing::debug!("Upstream accepted request, streaming");
                        *state = SessionState::Streaming(frames);
                    }
                    Poll::Ready(Err(e)) => return fail(&mut state, e),
                    Poll::Pending => return Poll::Pending,
                },
                SessionState::Streaming(frames) => {
                    return match frames.as_mut().poll_next(cx) {
                        Poll::Ready(Some(Ok(frame))) => Poll::Ready(Some(frame.into())),
                        Poll::Ready(Some(Err(e))) => fail(&mut state, e),
                        Poll::Ready(None) => {
                            *state = SessionState::Terminal;
                            tracing::debug!("Upstream stream completed");
                            Poll::Ready(Some(StreamEvent::Done))
                        }
                        Poll::Pending => Poll::Pending,
                    };
                }
                SessionState::Terminal => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for UpstreamSession {
    // Cancel handles may outlive the session; the connection must not
    fn drop(&mut self) {
        self.cancel.inner.release();
    }
}
