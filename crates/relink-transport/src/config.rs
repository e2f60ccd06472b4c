//! # Channel configuration
//!
//! Immutable once the channel is constructed; mirrors the configurable
//! knobs a reliability layer over an unreliable carrier customarily
//! exposes.

use std::time::Duration;

/// How inbound payloads are represented to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryMode {
    /// Deliver raw bytes.
    Bytes,
    /// Deliver bytes tagged as an opaque blob (no decoding attempted either
    /// way; this only changes which [`crate::channel::ChannelEvent::Message`]
    /// tag a caller sees).
    Blob,
}

impl Default for BinaryMode {
    fn default() -> Self {
        BinaryMode::Bytes
    }
}

/// Construction-time configuration for a [`crate::channel::Channel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Largest application-level fragment slice carried by a single DATA
    /// packet. A message larger than this is split across multiple
    /// fragments (capped at 128 per message).
    pub max_packet_payload_size: usize,

    /// How long the sender waits for an ACK before retransmitting an
    /// outstanding packet.
    pub retransmission_timeout: Duration,

    /// Maximum number of retransmission attempts before a packet is
    /// silently dropped from the outstanding table.
    pub max_retransmit_attempts: u8,

    /// How long the channel waits in `Connecting` for the peer's SYN, and
    /// in `Closing` for the peer's FIN, before giving up.
    pub connection_timeout: Duration,

    /// How inbound messages are represented to the caller.
    pub binary_mode: BinaryMode,

    /// If set, a fragment-reassembly buffer that receives no new fragment
    /// within this long is dropped on the next `poll`. `None` means
    /// buffers are never evicted.
    pub fragment_reassembly_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            max_packet_payload_size: 1489,
            retransmission_timeout: Duration::from_millis(1000),
            max_retransmit_attempts: 5,
            connection_timeout: Duration::from_millis(5000),
            binary_mode: BinaryMode::default(),
            fragment_reassembly_timeout: None,
        }
    }
}
