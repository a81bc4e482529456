//! Stream adapter that classifies mid-stream failures

use super::types::StreamFault;
use crate::recovery::classifier::classify_stream_error;
use futures::Stream;
use std::error::Error;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Wraps a provider stream so every failure reaches the consumer as a
/// [`StreamFault`] with its kind attached.
///
/// `is_terminal` recognises the item that marks a complete response. If
/// the inner stream ends before one was seen, a single `Incomplete` fault
/// is yielded. The stream ends after the first fault.
pub struct GuardedStream<S, P> {
    inner: S,
    is_terminal: P,
    saw_terminal: bool,
    done: bool,
}

impl<S, P> GuardedStream<S, P> {
    pub fn new(inner: S, is_terminal: P) -> Self {
        Self {
            inner,
            is_terminal,
            saw_terminal: false,
            done: false,
        }
    }

    /// Whether the terminal item has been observed
    pub fn is_complete(&self) -> bool {
        self.saw_terminal
    }
}

impl<S, P, T, E> Stream for GuardedStream<S, P>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    P: Fn(&T) -> bool + Unpin,
    E: Error + 'static,
{
    type Item = Result<T, StreamFault>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(item))) => {
                if (this.is_terminal)(&item) {
                    this.saw_terminal = true;
                }
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(Err(error))) => {
                this.done = true;
                let kind = classify_stream_error(&error);
                tracing::warn!(kind = %kind, error = %error, "Stream failed mid-response");
                Poll::Ready(Some(Err(StreamFault::new(kind, error.to_string()))))
            }
            Poll::Ready(None) => {
                this.done = true;
                if this.saw_terminal {
                    Poll::Ready(None)
                } else {
                    tracing::warn!("Stream ended before its terminal item");
                    Poll::Ready(Some(Err(StreamFault::incomplete())))
                }
            }
        }
    }
}

impl<S, P> std::fmt::Debug for GuardedStream<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedStream")
            .field("saw_terminal", &self.saw_terminal)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
