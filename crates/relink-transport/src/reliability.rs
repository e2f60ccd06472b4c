//! # Reliability engine
//!
//! Sequencing, acknowledgement and bounded per-packet retransmission for
//! DATA/SYN/FIN traffic, plus duplicate suppression on the receive side.
//! This module does no I/O: callers hand it outbound payloads and get
//! back wire-ready bytes to push through the carrier, and hand it inbound
//! wire bytes to get back a decoded packet (if any) plus an ACK to send
//! (if any).

use std::collections::{HashMap, HashSet, VecDeque};

use bytes::Bytes;
use quanta::Instant;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::wire::{self, Flags};

/// Capacity of the bounded duplicate-suppression window. Fixed, not
/// configurable — the data model only requires "at least 1000".
const RECEIVED_WINDOW_CAPACITY: usize = 1024;

// ─── Received window ────────────────────────────────────────────────────────

/// Bounded FIFO of recently-seen sequence numbers, used to recognize
/// retransmitted duplicates without growing without bound.
struct ReceivedWindow {
    order: VecDeque<u32>,
    members: HashSet<u32>,
    capacity: usize,
}

impl ReceivedWindow {
    fn new(capacity: usize) -> Self {
        ReceivedWindow {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    fn contains(&self, sequence: u32) -> bool {
        self.members.contains(&sequence)
    }

    fn insert(&mut self, sequence: u32) {
        if !self.members.insert(sequence) {
            return;
        }
        self.order.push_back(sequence);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
    }
}

// ─── Outstanding packets ─────────────────────────────────────────────────────

struct Outstanding {
    encoded: Bytes,
    attempts: u8,
    next_fire: Instant,
}

/// A packet decoded off the wire, with duplicate status resolved against
/// the received window.
#[derive(Debug, Clone)]
pub struct DecodedPacket {
    pub sequence: u32,
    pub flags: Flags,
    pub payload: Bytes,
    pub is_duplicate: bool,
}

/// Result of feeding one inbound buffer to the engine.
#[derive(Debug, Default)]
pub struct InboundResult {
    pub packet: Option<DecodedPacket>,
    pub ack_to_send: Option<Bytes>,
}

/// The sequencing/ACK/retransmit engine. Owns no carrier; all I/O is
/// pushed back to the caller as encoded buffers to send.
pub struct ReliabilityEngine {
    next_sequence: u32,
    outstanding: HashMap<u32, Outstanding>,
    received: ReceivedWindow,
}

impl ReliabilityEngine {
    pub fn new() -> Self {
        ReliabilityEngine {
            // Sequence 0 is reserved for the SYN, which is sent outside
            // this engine and still passes through the received window
            // on the inbound side (see `handle_inbound`). Starting
            // assignment at 1 keeps every engine-assigned sequence
            // disjoint from it.
            next_sequence: 1,
            outstanding: HashMap::new(),
            received: ReceivedWindow::new(RECEIVED_WINDOW_CAPACITY),
        }
    }

    /// Sequence number the next call to [`Self::send_packet`] will assign,
    /// without consuming it. Used to give a bare, unsequenced control
    /// packet (SYN/FIN) the same sequence as its reliably-sent twin.
    pub fn peek_next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Assign the next sequence number to `payload`, register it for
    /// retransmission, and return the sequence plus the wire-ready bytes.
    pub fn send_packet(
        &mut self,
        payload: Bytes,
        flags: Flags,
        now: Instant,
        retransmission_timeout: Duration,
    ) -> (u32, Bytes) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let encoded = wire::encode(sequence, flags, &payload);
        self.outstanding.insert(
            sequence,
            Outstanding {
                encoded: encoded.clone(),
                attempts: 0,
                next_fire: now + retransmission_timeout,
            },
        );
        trace!(sequence, bytes = encoded.len(), "packet queued for delivery");
        (sequence, encoded)
    }

    /// Decode an inbound buffer, resolving ACKs and duplicate status.
    pub fn handle_inbound(&mut self, raw: Bytes) -> InboundResult {
        let decoded = match wire::decode(raw) {
            Ok(p) => p,
            Err(err) => {
                trace!(?err, "discarding undecodable packet");
                return InboundResult::default();
            }
        };

        if decoded.flags.contains(Flags::ACK) {
            self.cancel_outstanding(decoded.sequence);
            return InboundResult::default();
        }

        let is_duplicate = self.received.contains(decoded.sequence);
        if !is_duplicate {
            self.received.insert(decoded.sequence);
        } else {
            debug!(sequence = decoded.sequence, "duplicate packet suppressed");
        }

        InboundResult {
            packet: Some(DecodedPacket {
                sequence: decoded.sequence,
                flags: decoded.flags,
                payload: decoded.payload,
                is_duplicate,
            }),
            ack_to_send: Some(wire::encode_ack(decoded.sequence)),
        }
    }

    /// Cancel the outstanding entry for `sequence`, if any (an ACK arrived
    /// for it).
    pub fn cancel_outstanding(&mut self, sequence: u32) {
        if self.outstanding.remove(&sequence).is_some() {
            trace!(sequence, "ack received, retransmission cancelled");
        }
    }

    /// Resend any outstanding packet whose retransmission timer has
    /// fired, dropping those that have exhausted their retry budget.
    /// Returns the buffers to push back through the carrier.
    pub fn poll_retransmits(
        &mut self,
        now: Instant,
        max_attempts: u8,
        retransmission_timeout: Duration,
    ) -> Vec<Bytes> {
        let mut due = Vec::new();
        let mut exhausted = Vec::new();

        for (&sequence, entry) in self.outstanding.iter_mut() {
            if entry.next_fire > now {
                continue;
            }
            if entry.attempts >= max_attempts {
                exhausted.push(sequence);
                continue;
            }
            entry.attempts += 1;
            entry.next_fire = now + retransmission_timeout;
            debug!(sequence, attempts = entry.attempts, "retransmitting");
            due.push(entry.encoded.clone());
        }

        for sequence in exhausted {
            self.outstanding.remove(&sequence);
            warn!(sequence, "retransmit budget exhausted, dropping packet");
        }

        due
    }

    /// Total bytes currently queued for (re)transmission.
    pub fn buffered_amount(&self) -> usize {
        self.outstanding.values().map(|o| o.encoded.len()).sum()
    }

    /// Drop every outstanding entry and reset the duplicate window. Called
    /// on transition to `Closed`.
    pub fn clear(&mut self) {
        self.outstanding.clear();
    }
}

impl Default for ReliabilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
