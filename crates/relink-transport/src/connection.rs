//! # Connection state machine
//!
//! ```text
//!   Connecting ──SYN received──▶ Open ──begin_close()──▶ Closing ──FIN received──▶ Closed
//!       │                                                      │
//!   timeout (1006)                                        timeout (1006)
//!       └──────────────────────────────────────────────────────┘
//! ```
//!
//! Pure state: this module owns no carrier and sends nothing itself. The
//! façade asks it to arm/poll timers and feeds it SYN/FIN arrivals; it
//! reports back whether a transition happened so the façade can decide
//! what to send or emit.

use quanta::Instant;
use std::time::Duration;
use tracing::info;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Standard clean-close code.
pub const CLOSE_CODE_NORMAL: u16 = 1000;
/// Standard abnormal-close code (timeout, never cleanly closed).
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;

pub struct Connection {
    state: ConnectionState,
    connecting_deadline: Option<Instant>,
    closing_deadline: Option<Instant>,
}

impl Connection {
    /// Start in `Connecting` with the handshake deadline armed.
    pub fn new(now: Instant, connection_timeout: Duration) -> Self {
        Connection {
            state: ConnectionState::Connecting,
            connecting_deadline: Some(now + connection_timeout),
            closing_deadline: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// A SYN arrived. Returns `true` if this caused `Connecting -> Open`.
    pub fn on_syn_received(&mut self) -> bool {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
            self.connecting_deadline = None;
            info!("connection open");
            true
        } else {
            false
        }
    }

    /// A FIN arrived. Returns `true` if this caused a transition to
    /// `Closed` (from `Open` or `Closing`).
    pub fn on_fin_received(&mut self) -> bool {
        match self.state {
            ConnectionState::Open | ConnectionState::Closing => {
                self.state = ConnectionState::Closed;
                self.closing_deadline = None;
                info!("connection closed by peer fin");
                true
            }
            _ => false,
        }
    }

    /// Caller requested a graceful close. Returns `true` if this caused
    /// `Open -> Closing`.
    pub fn begin_close(&mut self) -> bool {
        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closing;
            info!("connection closing");
            true
        } else {
            false
        }
    }

    pub fn arm_closing_timer(&mut self, now: Instant, timeout: Duration) {
        self.closing_deadline = Some(now + timeout);
    }

    /// Check the handshake deadline. Returns `true` if it just fired
    /// (forcing `Connecting -> Closed`, abnormal).
    pub fn poll_connecting_timeout(&mut self, now: Instant) -> bool {
        if self.state == ConnectionState::Connecting {
            if let Some(deadline) = self.connecting_deadline {
                if now >= deadline {
                    self.state = ConnectionState::Closed;
                    self.connecting_deadline = None;
                    info!("connection handshake timed out");
                    return true;
                }
            }
        }
        false
    }

    /// Check the closing deadline. Returns `true` if it just fired
    /// (forcing `Closing -> Closed`, abnormal).
    pub fn poll_closing_timeout(&mut self, now: Instant) -> bool {
        if self.state == ConnectionState::Closing {
            if let Some(deadline) = self.closing_deadline {
                if now >= deadline {
                    self.state = ConnectionState::Closed;
                    self.closing_deadline = None;
                    info!("connection close handshake timed out");
                    return true;
                }
            }
        }
        false
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
