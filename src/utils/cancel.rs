//! Cancellation utilities
//!
//! Provides first-class cancellation handles for chat streams, so a consumer
//! can abandon an exchange without leaving an unattended background pull on
//! the upstream transport.

use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. A wrapped stream observing this handle stops at
    /// once, even while blocked on a stalled upstream pull; dropping it then
    /// closes the underlying HTTP connection so the provider stops generating
    /// tokens.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Wrap a chat stream so it can be cancelled, returning the cancel handle.
///
/// Cancellation is raced against the upstream pull, so it interrupts a pull
/// already in flight rather than waiting for the next chunk to arrive.
pub fn make_cancellable_stream(
    stream: crate::stream::ChatStream,
) -> (crate::stream::ChatStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let wrapped = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    (Box::pin(wrapped), handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatChunk;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_stream_stops_yielding() {
        let chunks = (0..100).map(|i| Ok(ChatChunk::text(format!("c{i}"))));
        let inner: crate::stream::ChatStream = Box::pin(futures::stream::iter(chunks));
        let (mut stream, handle) = make_cancellable_stream(inner);

        assert!(stream.next().await.is_some());
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn cancel_wakes_a_pull_blocked_on_a_stalled_upstream() {
        // A stream that never yields and never ends.
        let pending: crate::stream::ChatStream = Box::pin(futures::stream::pending());
        let (mut stream, handle) = make_cancellable_stream(pending);

        let waiter = tokio::spawn(async move { stream.next().await });

        // Give the task a chance to poll and block on `next()`.
        tokio::task::yield_now().await;
        handle.cancel();

        let item = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the blocked pull")
            .expect("task ok");
        assert!(item.is_none());
    }
}
