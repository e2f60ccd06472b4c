//! # Fragmentation and reassembly
//!
//! Messages larger than a single packet's payload budget are split into up
//! to 128 fragments, each carrying a 5-byte header ahead of its slice:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Message ID (32)                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |L|          Index (7)         |         Slice...              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! A DATA payload under [`FRAGMENT_HEADER_LEN`] bytes never carries this
//! header at all — it is delivered to the reassembler as a complete
//! message directly. This is the only way a receiver can tell a tiny
//! unfragmented message apart from a fragment header, so the fragmenter
//! mirrors it on the outbound side: any message of
//! [`FRAGMENT_HEADER_LEN`] bytes or more gets the header, even when it
//! fits in a single packet (index 0, last-fragment bit set).

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;

use quanta::Instant;

// ─── Constants ───────────────────────────────────────────────────────────

/// Size of the fragment header prefix.
pub const FRAGMENT_HEADER_LEN: usize = 5;

/// Hard cap on fragments per message — the index field is 7 bits.
pub const MAX_FRAGMENTS_PER_MESSAGE: usize = 128;

// ─── Outbound ──────────────────────────────────────────────────────────────

/// Splits outbound messages into wire-ready DATA payloads, assigning a
/// fresh message id to each multi/single-fragment message.
#[derive(Debug)]
pub struct Fragmenter {
    next_message_id: u32,
}

impl Fragmenter {
    pub fn new() -> Self {
        Fragmenter { next_message_id: 1 }
    }

    /// Split `data` into one or more DATA payloads, each ready to hand to
    /// the reliability engine unchanged. Returns `None` if the message
    /// would require more than [`MAX_FRAGMENTS_PER_MESSAGE`] fragments.
    pub fn split(&mut self, data: &Bytes, max_slice: usize) -> Option<Vec<Bytes>> {
        if data.len() < FRAGMENT_HEADER_LEN {
            return Some(vec![data.clone()]);
        }

        let total = data.len().div_ceil(max_slice).max(1);
        if total > MAX_FRAGMENTS_PER_MESSAGE {
            return None;
        }

        let message_id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);

        let mut out = Vec::with_capacity(total);
        for index in 0..total {
            let start = index * max_slice;
            let end = (start + max_slice).min(data.len());
            let is_last = index == total - 1;
            out.push(build_fragment(
                message_id,
                index as u8,
                is_last,
                &data[start..end],
            ));
        }
        Some(out)
    }
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self::new()
    }
}

fn build_fragment(message_id: u32, index: u8, is_last: bool, slice: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAGMENT_HEADER_LEN + slice.len());
    buf.put_u32_le(message_id);
    let index_and_last = (index & 0x7F) | if is_last { 0x80 } else { 0 };
    buf.put_u8(index_and_last);
    buf.put_slice(slice);
    buf.freeze()
}

// ─── Inbound ───────────────────────────────────────────────────────────────

struct PendingMessage {
    fragments: HashMap<u8, Bytes>,
    total: Option<u8>,
    last_seen: Instant,
}

/// Reassembles inbound DATA payloads into complete messages.
#[derive(Default)]
pub struct Reassembler {
    pending: HashMap<u32, PendingMessage>,
}

impl Reassembler {
    pub fn new() -> Self {
        Reassembler {
            pending: HashMap::new(),
        }
    }

    /// Feed a decoded DATA payload in. Returns the completed message once
    /// every fragment of it has arrived.
    pub fn process(&mut self, payload: Bytes, now: Instant) -> Option<Bytes> {
        if payload.len() < FRAGMENT_HEADER_LEN {
            return Some(payload);
        }

        let message_id = u32::from_le_bytes(payload[0..4].try_into().unwrap());
        let index_and_last = payload[4];
        let index = index_and_last & 0x7F;
        let is_last = index_and_last & 0x80 != 0;
        let slice = payload.slice(FRAGMENT_HEADER_LEN..);

        let entry = self.pending.entry(message_id).or_insert_with(|| PendingMessage {
            fragments: HashMap::new(),
            total: None,
            last_seen: now,
        });
        entry.fragments.insert(index, slice);
        entry.last_seen = now;
        if is_last {
            entry.total = Some(index.checked_add(1)?);
        }

        let complete = match entry.total {
            Some(total) => (0..total).all(|i| entry.fragments.contains_key(&i)),
            None => false,
        };
        if !complete {
            return None;
        }

        let entry = self.pending.remove(&message_id)?;
        let total = entry.total?;
        let mut out = BytesMut::new();
        for i in 0..total {
            out.put_slice(entry.fragments.get(&i)?);
        }
        Some(out.freeze())
    }

    /// Drop reassembly buffers that have not seen a new fragment within
    /// `timeout`. No-op when the caller never configures eviction.
    pub fn evict_stale(&mut self, now: Instant, timeout: std::time::Duration) {
        self.pending
            .retain(|_, msg| now.duration_since(msg.last_seen) < timeout);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
