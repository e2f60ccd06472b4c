//! # Unreliable carrier
//!
//! The one collaborator this crate depends on: something that can move
//! opaque datagrams, with no guarantee of delivery, ordering, or
//! integrity. A [`crate::channel::Channel`] is generic over this trait;
//! nothing in the crate assumes a particular transport underneath it.

use bytes::Bytes;

use crate::error::CarrierError;

/// A send-only view of an unreliable datagram transport. Delivery of
/// inbound datagrams and out-of-band errors is not modeled as a trait
/// method — the owner of both the carrier and the channel is expected to
/// call [`crate::channel::Channel::receive`] / [`crate::channel::Channel::notify_carrier_error`]
/// whenever the carrier produces one, the same way a socket's read loop
/// feeds bytes forward.
pub trait UnreliableCarrier {
    /// Hand a datagram to the transport. Treated as synchronous: once
    /// this returns `Ok`, the buffer has been handed off (not
    /// necessarily delivered — the carrier may still drop it in
    /// flight).
    fn send(&mut self, data: Bytes) -> Result<(), CarrierError>;
}
