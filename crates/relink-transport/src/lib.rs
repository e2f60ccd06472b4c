//! # relink-transport
//!
//! A reliable, message-oriented channel built on top of an unreliable,
//! unordered packet carrier: think a minimal reimplementation of the
//! reliability half of WebRTC's data channel, with no media, no SCTP,
//! and no DTLS underneath it — just sequencing, acknowledgement, bounded
//! retransmission, fragmentation and a SYN/FIN handshake.
//!
//! ## Crate structure
//!
//! - [`wire`] — Fixed 11-byte packet header, CRC32 checksum, flag bitset
//! - [`fragment`] — Message fragmentation and reassembly
//! - [`reliability`] — Sequencing, ACK handling, bounded retransmission, duplicate suppression
//! - [`connection`] — CONNECTING/OPEN/CLOSING/CLOSED handshake state machine
//! - [`carrier`] — The `UnreliableCarrier` trait this crate depends on
//! - [`mock`] — A configurable in-process carrier for tests
//! - [`channel`] — The caller-facing façade tying the above together
//! - [`config`] — `ChannelConfig`
//! - [`error`] — `ChannelError`

pub mod carrier;
pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod fragment;
pub mod mock;
pub mod reliability;
pub mod wire;

pub use carrier::UnreliableCarrier;
pub use channel::{Channel, ChannelEvent, SendValue};
pub use config::{BinaryMode, ChannelConfig};
pub use connection::ConnectionState;
pub use error::ChannelError;
