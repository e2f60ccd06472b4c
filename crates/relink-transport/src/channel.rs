//! # Channel façade
//!
//! The caller-facing object: wraps a reliability engine, connection state
//! machine, and fragmenter/reassembler around a single
//! [`crate::carrier::UnreliableCarrier`], and reports everything that
//! happens as a drainable event queue — the same shape as this crate's
//! other event-producing state machines.

use std::collections::VecDeque;

use bytes::Bytes;
use quanta::{Clock, Instant};
use tracing::warn;

use crate::carrier::UnreliableCarrier;
use crate::config::{BinaryMode, ChannelConfig};
use crate::connection::{Connection, ConnectionState, CLOSE_CODE_ABNORMAL, CLOSE_CODE_NORMAL};
use crate::error::{CarrierError, ChannelError};
use crate::fragment::{Fragmenter, Reassembler};
use crate::reliability::ReliabilityEngine;
use crate::wire::{self, Flags};

/// A value a caller can hand to [`Channel::send`].
#[derive(Debug, Clone)]
pub enum SendValue {
    Text(String),
    Bytes(Bytes),
}

/// Events a [`Channel`] reports back to its owner. Drained with
/// [`Channel::drain_events`] rather than delivered through callbacks,
/// since Rust has no ergonomic equivalent of an assignable `on_x` slot
/// without shared interior mutability.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Open,
    Message { data: Bytes, mode: BinaryMode },
    Error(String),
    Close {
        code: u16,
        reason: String,
        was_clean: bool,
    },
}

/// The reliable, message-oriented channel itself, generic over the
/// carrier it rides on.
pub struct Channel<C: UnreliableCarrier> {
    carrier: C,
    clock: Clock,
    config: ChannelConfig,
    connection: Connection,
    engine: ReliabilityEngine,
    fragmenter: Fragmenter,
    reassembler: Reassembler,
    events: VecDeque<ChannelEvent>,
    pending_close: Option<(u16, String)>,
}

impl<C: UnreliableCarrier> Channel<C> {
    /// Open a new channel: sends the initial SYN and arms the handshake
    /// timer. Uses the system monotonic clock.
    pub fn new(carrier: C, config: ChannelConfig) -> Self {
        Self::with_clock(carrier, config, Clock::new())
    }

    /// Like [`Self::new`], but with an explicit clock — used by tests to
    /// inject [`quanta::Clock::mock`] for deterministic timer scenarios.
    pub fn with_clock(carrier: C, config: ChannelConfig, clock: Clock) -> Self {
        let now = clock.now();
        let mut channel = Channel {
            carrier,
            connection: Connection::new(now, config.connection_timeout),
            engine: ReliabilityEngine::new(),
            fragmenter: Fragmenter::new(),
            reassembler: Reassembler::new(),
            events: VecDeque::new(),
            pending_close: None,
            clock,
            config,
        };
        channel.carrier_send(wire::encode_syn());
        channel
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn buffered_amount(&self) -> usize {
        self.engine.buffered_amount()
    }

    pub fn binary_mode(&self) -> BinaryMode {
        self.config.binary_mode
    }

    /// Direct access to the underlying carrier. Chiefly useful in tests
    /// driving a [`crate::mock::MockCarrier`] by hand.
    pub fn carrier_mut(&mut self) -> &mut C {
        &mut self.carrier
    }

    /// Iterate and remove every event accumulated since the last drain.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ChannelEvent> + '_ {
        self.events.drain(..)
    }

    fn carrier_send(&mut self, data: Bytes) {
        if let Err(err) = self.carrier.send(data) {
            self.notify_carrier_error(err);
        }
    }

    /// Report an error originating from the carrier (as opposed to a
    /// protocol-level discard, which is always silent).
    pub fn notify_carrier_error(&mut self, err: CarrierError) {
        warn!(%err, "carrier error");
        self.events.push_back(ChannelEvent::Error(err.to_string()));
    }

    /// Submit a message for delivery. Requires the channel to be `Open`.
    pub fn send(&mut self, value: SendValue) -> Result<(), ChannelError> {
        if self.connection.state() != ConnectionState::Open {
            return Err(ChannelError::NotOpen);
        }
        let bytes = match value {
            SendValue::Text(s) => Bytes::from(s.into_bytes()),
            SendValue::Bytes(b) => b,
        };
        let len = bytes.len();
        let fragments = self
            .fragmenter
            .split(&bytes, self.config.max_packet_payload_size)
            .ok_or(ChannelError::MessageTooLarge(len))?;

        let now = self.clock.now();
        let mut outgoing = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let (_, encoded) =
                self.engine
                    .send_packet(fragment, Flags::DATA, now, self.config.retransmission_timeout);
            outgoing.push(encoded);
        }
        for encoded in outgoing {
            self.carrier_send(encoded);
        }
        Ok(())
    }

    /// Begin a graceful close. A no-op if already closing/closed.
    pub fn close(&mut self, code: Option<u16>, reason: Option<String>) {
        if !matches!(self.connection.state(), ConnectionState::Open) {
            return;
        }
        let now = self.clock.now();
        let next_sequence = self.engine.peek_next_sequence();
        let bare_fin = wire::encode_fin(next_sequence);
        self.carrier_send(bare_fin);

        let (_, reliable_fin) =
            self.engine
                .send_packet(Bytes::new(), Flags::FIN, now, self.config.retransmission_timeout);
        self.carrier_send(reliable_fin);

        self.connection.begin_close();
        self.connection.arm_closing_timer(now, self.config.connection_timeout);
        self.pending_close = Some((code.unwrap_or(CLOSE_CODE_NORMAL), reason.unwrap_or_default()));
    }

    /// Feed an inbound datagram from the carrier into the channel.
    pub fn receive(&mut self, raw: Bytes) {
        let now = self.clock.now();
        let result = self.engine.handle_inbound(raw);
        if let Some(ack) = result.ack_to_send {
            self.carrier_send(ack);
        }
        let Some(packet) = result.packet else {
            return;
        };

        if packet.flags.contains(Flags::SYN) {
            if self.connection.on_syn_received() {
                self.carrier_send(wire::encode_syn());
                self.events.push_back(ChannelEvent::Open);
            }
        }

        if packet.flags.contains(Flags::FIN) {
            let (code, reason) = self.pending_close.clone().unwrap_or((CLOSE_CODE_NORMAL, String::new()));
            if self.connection.on_fin_received() {
                self.transition_to_closed(code, reason, true);
            }
        }

        if packet.flags.contains(Flags::DATA) && !packet.is_duplicate {
            if let Some(complete) = self.reassembler.process(packet.payload, now) {
                self.events.push_back(ChannelEvent::Message {
                    data: complete,
                    mode: self.config.binary_mode,
                });
            }
        }
    }

    /// Drive timers and retransmission. Call periodically from the host's
    /// event loop.
    pub fn poll(&mut self) {
        let now = self.clock.now();

        if self.connection.poll_connecting_timeout(now) {
            self.transition_to_closed(CLOSE_CODE_ABNORMAL, "handshake timed out".to_string(), false);
            return;
        }
        if self.connection.poll_closing_timeout(now) {
            // Closing-timer expiry reports the code/reason the caller
            // passed to `close()`, not a fixed value.
            let (code, reason) = self
                .pending_close
                .clone()
                .unwrap_or((CLOSE_CODE_NORMAL, String::new()));
            self.transition_to_closed(code, reason, false);
            return;
        }

        let due = self
            .engine
            .poll_retransmits(now, self.config.max_retransmit_attempts, self.config.retransmission_timeout);
        for encoded in due {
            self.carrier_send(encoded);
        }

        if let Some(timeout) = self.config.fragment_reassembly_timeout {
            self.reassembler.evict_stale(now, timeout);
        }
    }

    fn transition_to_closed(&mut self, code: u16, reason: String, was_clean: bool) {
        self.engine.clear();
        self.events.push_back(ChannelEvent::Close { code, reason, was_clean });
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
