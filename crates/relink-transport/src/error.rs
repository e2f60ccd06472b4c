//! # Errors
//!
//! A single crate-wide error enum. Decode failures and connection timeouts
//! are deliberately absent here — per the channel's contract they are
//! resolved into a `close` event or silently dropped, never returned from a
//! fallible call.

use std::fmt;

/// Errors a [`crate::channel::Channel`] can return from its public operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// `send`/`close` called while the channel is not in the `Open` state.
    #[error("channel is not open")]
    NotOpen,

    /// The value passed to `send` has no wire representation. Unreachable
    /// through the typed `SendValue` API; kept for parity with the
    /// documented error surface.
    #[error("unsupported value type")]
    Unsupported,

    /// A message would require more fragments than the wire format allows
    /// (128 per message).
    #[error("message of {0} bytes exceeds the maximum fragmentable size")]
    MessageTooLarge(usize),

    /// The carrier rejected a send.
    #[error("carrier error: {0}")]
    Carrier(#[source] CarrierError),
}

/// Type-erased error surfaced by an [`crate::carrier::UnreliableCarrier`].
#[derive(Debug)]
pub struct CarrierError(pub Box<dyn std::error::Error + Send + Sync + 'static>);

impl fmt::Display for CarrierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CarrierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

impl CarrierError {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CarrierError(Box::new(err))
    }
}
