//! # Packet format
//!
//! Fixed 11-byte header, no variable-length fields — every packet on the
//! wire is exactly `HEADER_LEN + payload.len()` bytes.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence (32)                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Checksum (32)                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Flags    |       Payload Length (16)      |   Payload... |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The checksum is a CRC32 (IEEE 802.3 polynomial) over the sequence, flags
//! and payload-length fields followed by the payload itself — i.e. over
//! the header *without* the checksum field. A packet whose checksum does
//! not match on decode is not a wire error: it is simply not a packet, and
//! callers are expected to discard it.

use bytes::{Buf, BufMut, Bytes, BytesMut};

// ─── Constants ───────────────────────────────────────────────────────────

/// Fixed header size: 4 (sequence) + 4 (checksum) + 1 (flags) + 2 (payload length).
pub const HEADER_LEN: usize = 11;

// ─── Flags ─────────────────────────────────────────────────────────────────

/// Bitset carried in the packet header's single flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    pub const DATA: Flags = Flags(0x01);
    pub const ACK: Flags = Flags(0x02);
    pub const SYN: Flags = Flags(0x04);
    pub const FIN: Flags = Flags(0x08);

    #[inline]
    pub const fn empty() -> Self {
        Flags(0)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Flags(bits)
    }

    #[inline]
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

// ─── Header ──────────────────────────────────────────────────────────────

/// A decoded packet: header fields plus the payload slice, zero-copy over
/// the input `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub sequence: u32,
    pub flags: Flags,
    pub payload: Bytes,
}

/// Reasons a buffer failed to decode into a [`Packet`]. Never surfaced to a
/// caller as a `Result` error — see module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    TooShort,
    LengthMismatch,
    ChecksumMismatch,
}

fn checksum(sequence: u32, flags: Flags, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&sequence.to_le_bytes());
    hasher.update(&[flags.bits()]);
    hasher.update(&(payload.len() as u16).to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

/// Encode a packet onto the wire.
pub fn encode(sequence: u32, flags: Flags, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    let crc = checksum(sequence, flags, payload);
    buf.put_u32_le(sequence);
    buf.put_u32_le(crc);
    buf.put_u8(flags.bits());
    buf.put_u16_le(payload.len() as u16);
    buf.put_slice(payload);
    buf.freeze()
}

/// Decode a packet from the wire. Returns `Err` on anything that doesn't
/// look like a well-formed, uncorrupted packet — callers treat all of
/// these identically (discard, no ACK).
pub fn decode(mut raw: Bytes) -> Result<Packet, DecodeError> {
    if raw.len() < HEADER_LEN {
        return Err(DecodeError::TooShort);
    }
    let sequence = raw.get_u32_le();
    let crc = raw.get_u32_le();
    let flags = Flags::from_bits(raw.get_u8());
    let payload_length = raw.get_u16_le() as usize;
    if raw.len() != payload_length {
        return Err(DecodeError::LengthMismatch);
    }
    let payload = raw;
    if checksum(sequence, flags, &payload) != crc {
        return Err(DecodeError::ChecksumMismatch);
    }
    Ok(Packet {
        sequence,
        flags,
        payload,
    })
}

/// Build a SYN packet. SYNs always carry sequence 0 and an empty payload,
/// and are never routed through the reliability engine's retransmit
/// machinery.
pub fn encode_syn() -> Bytes {
    encode(0, Flags::SYN, &[])
}

/// Build a bare ACK packet for `sequence`.
pub fn encode_ack(sequence: u32) -> Bytes {
    encode(sequence, Flags::ACK, &[])
}

/// Build a bare FIN packet carrying `sequence`, bypassing the reliability
/// engine the same way a SYN does.
pub fn encode_fin(sequence: u32) -> Bytes {
    encode(sequence, Flags::FIN, &[])
}

// ─── Tests ─────────────────────────────────────────────────────────────────
