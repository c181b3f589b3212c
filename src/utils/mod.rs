//! Shared helpers: wire framing and cancellation.

pub mod cancel;
pub mod streaming;
