//! # Mock carrier
//!
//! An in-process [`crate::carrier::UnreliableCarrier`] with configurable
//! loss, corruption, duplication, delay and reordering, for driving
//! [`crate::channel::Channel`] in tests without a real socket. Not gated
//! behind a feature flag: the carrier contract names impairment as a
//! first-class testing need, not an optional extra.

use bytes::{Bytes, BytesMut};
use quanta::{Clock, Instant};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;

use crate::carrier::UnreliableCarrier;
use crate::error::CarrierError;

/// Impairment knobs for a [`MockCarrier`]. All probabilities are in
/// `[0.0, 1.0]` and independent of one another.
#[derive(Debug, Clone, Copy)]
pub struct MockCarrierConfig {
    pub loss_probability: f64,
    pub corruption_probability: f64,
    pub duplication_probability: f64,
    pub reorder_probability: f64,
    pub delay: Duration,
}

impl Default for MockCarrierConfig {
    fn default() -> Self {
        MockCarrierConfig {
            loss_probability: 0.0,
            corruption_probability: 0.0,
            duplication_probability: 0.0,
            reorder_probability: 0.0,
            delay: Duration::ZERO,
        }
    }
}

impl MockCarrierConfig {
    /// A carrier that drops every buffer handed to it.
    pub fn always_drop() -> Self {
        MockCarrierConfig {
            loss_probability: 1.0,
            ..Default::default()
        }
    }
}

/// Send-side view of an impaired in-memory link. Pair two of these with
/// [`connect`] to simulate a two-endpoint conversation, or construct one
/// standalone and drain it by hand.
pub struct MockCarrier {
    config: MockCarrierConfig,
    clock: Clock,
    rng: SmallRng,
    ready: VecDeque<(Instant, Bytes)>,
}

impl MockCarrier {
    pub fn new(config: MockCarrierConfig, clock: Clock) -> Self {
        MockCarrier {
            config,
            clock,
            rng: SmallRng::from_entropy(),
            ready: VecDeque::new(),
        }
    }

    fn roll(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.rng.gen_bool(probability.min(1.0))
    }

    fn corrupt(&mut self, data: Bytes) -> Bytes {
        if data.is_empty() {
            return data;
        }
        let index = self.rng.gen_range(0..data.len());
        let mut mutated = BytesMut::from(&data[..]);
        mutated[index] ^= 0xFF;
        mutated.freeze()
    }

    /// Buffers currently queued whose delivery time has passed. Leaves
    /// later ones queued; call again once more time has elapsed.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<Bytes> {
        let mut due = Vec::new();
        let mut remaining = VecDeque::new();
        for (ready_at, payload) in self.ready.drain(..) {
            if ready_at <= now {
                due.push(payload);
            } else {
                remaining.push_back((ready_at, payload));
            }
        }
        self.ready = remaining;

        if self.config.reorder_probability > 0.0 && due.len() >= 2 && self.roll(self.config.reorder_probability) {
            let last = due.len() - 1;
            due.swap(0, last);
        }
        due
    }

    /// Convenience for tests with no delay configured: drain everything
    /// ready at the current clock reading.
    pub fn drain(&mut self) -> Vec<Bytes> {
        let now = self.clock.now();
        self.drain_ready(now)
    }
}

impl UnreliableCarrier for MockCarrier {
    fn send(&mut self, data: Bytes) -> Result<(), CarrierError> {
        if self.roll(self.config.loss_probability) {
            return Ok(());
        }
        let payload = if self.roll(self.config.corruption_probability) {
            self.corrupt(data)
        } else {
            data
        };
        let ready_at = self.clock.now() + self.config.delay;
        self.ready.push_back((ready_at, payload.clone()));
        if self.roll(self.config.duplication_probability) {
            self.ready.push_back((ready_at, payload));
        }
        Ok(())
    }
}

/// Build two [`MockCarrier`]s that share a clock, one per endpoint. The
/// caller is responsible for pumping: drain one side and feed the result
/// into the peer [`crate::channel::Channel::receive`].
pub fn connect(config_a: MockCarrierConfig, config_b: MockCarrierConfig, clock: Clock) -> (MockCarrier, MockCarrier) {
    (
        MockCarrier::new(config_a, clock.clone()),
        MockCarrier::new(config_b, clock),
    )
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_carrier_delivers_everything_unchanged() {
        let (clock, _mock) = Clock::mock();
        let mut carrier = MockCarrier::new(MockCarrierConfig::default(), clock);
        carrier.send(Bytes::from_static(b"hello")).unwrap();
        carrier.send(Bytes::from_static(b"world")).unwrap();
        let drained = carrier.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(&drained[0][..], b"hello");
        assert_eq!(&drained[1][..], b"world");
    }

    #[test]
    fn always_drop_carrier_delivers_nothing() {
        let (clock, _mock) = Clock::mock();
        let mut carrier = MockCarrier::new(MockCarrierConfig::always_drop(), clock);
        carrier.send(Bytes::from_static(b"hello")).unwrap();
        assert!(carrier.drain().is_empty());
    }

    #[test]
    fn delayed_buffers_wait_for_the_clock() {
        let (clock, mock) = Clock::mock();
        let config = MockCarrierConfig {
            delay: Duration::from_millis(50),
            ..Default::default()
        };
        let mut carrier = MockCarrier::new(config, clock.clone());
        carrier.send(Bytes::from_static(b"hello")).unwrap();
        assert!(carrier.drain_ready(clock.now()).is_empty());
        mock.increment(Duration::from_millis(50));
        assert_eq!(carrier.drain_ready(clock.now()).len(), 1);
    }

    #[test]
    fn corruption_flips_a_byte_without_dropping_the_buffer() {
        let (clock, _mock) = Clock::mock();
        let config = MockCarrierConfig {
            corruption_probability: 1.0,
            ..Default::default()
        };
        let mut carrier = MockCarrier::new(config, clock);
        carrier.send(Bytes::from_static(b"hello")).unwrap();
        let drained = carrier.drain();
        assert_eq!(drained.len(), 1);
        assert_ne!(&drained[0][..], b"hello");
        assert_eq!(drained[0].len(), 5);
    }

    #[test]
    fn connect_wires_two_independent_links() {
        let (clock, _mock) = Clock::mock();
        let (mut a, mut b) = connect(MockCarrierConfig::default(), MockCarrierConfig::default(), clock);
        a.send(Bytes::from_static(b"from a")).unwrap();
        b.send(Bytes::from_static(b"from b")).unwrap();
        assert_eq!(&a.drain()[0][..], b"from a");
        assert_eq!(&b.drain()[0][..], b"from b");
    }
}
