//! Streaming types.

use futures::Stream;
use std::pin::Pin;

use crate::error::GatewayError;
use crate::types::ChatChunk;

/// A lazy, forward-only, non-restartable sequence of normalized chunks.
///
/// Pulling the next element is the sole suspension point of a streaming
/// exchange; dropping the stream closes the underlying HTTP connection on
/// every exit path, including cancellation.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, GatewayError>> + Send>>;

/// A chat stream paired with a first-class cancellation handle.
///
/// Cancelling interrupts even a pull blocked on a stalled upstream; dropping
/// the stream then releases the transport so the provider stops generating
/// tokens.
pub struct ChatStreamHandle {
    pub stream: ChatStream,
    pub cancel: crate::utils::cancel::CancelHandle,
}
