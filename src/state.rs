//! Shared link-layer state between the sender and receiver threads.
//!
//! Three values cross the thread boundary: `SENDING`, `ack_received`, and
//! `end_of_program`. All three are plain atomics rather than a mutex-guarded
//! struct — no lock is ever taken in the PPM timing path. `SENDING` uses
//! release-store on the writer side (the sender, before any LED write) and
//! acquire-load on the reader side (the receiver, before any decision that
//! could lead to delivering a frame), so the receiver is guaranteed to
//! observe `SENDING == true` no later than one ADC sample after the sender
//! asserts it.
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Shared flags mutated by both the sender and the receiver thread.
///
/// Owned behind an `Arc` and handed to both sides; see [`crate::link::Link`].
#[derive(Debug, Default)]
pub struct LinkState {
    sending: AtomicBool,
    ack_received: AtomicU16,
    end_of_program: AtomicBool,
}

impl LinkState {
    /// Creates a fresh state with nothing in flight.
    pub fn new() -> Self {
        Self {
            sending: AtomicBool::new(false),
            ack_received: AtomicU16::new(0),
            end_of_program: AtomicBool::new(false),
        }
    }

    /// True while the local node is actively driving the LED with a frame.
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Sets the sending flag. Must be stored `true` before any LED write in
    /// the transmit path, and cleared only after the LED has returned low.
    pub fn set_sending(&self, sending: bool) {
        self.sending.store(sending, Ordering::Release);
    }

    /// Current ack bitmap: bit `i` is set if node `i` acked the in-flight
    /// send.
    pub fn ack_received(&self) -> u16 {
        self.ack_received.load(Ordering::Acquire)
    }

    /// Resets the ack bitmap. Called at the start of every `send`.
    pub fn clear_ack(&self) {
        self.ack_received.store(0, Ordering::Release);
    }

    /// ORs in the bit for `from`, called by the receive loop when it
    /// decodes an "ack" payload addressed to us.
    pub fn record_ack(&self, from: u8) {
        let _ = self.ack_received.fetch_or(1u16 << (from & 0xF), Ordering::AcqRel);
    }

    /// True once [`LinkState::request_stop`] has been called; the receive
    /// loop polls this at its outer waits and returns.
    pub fn is_stopping(&self) -> bool {
        self.end_of_program.load(Ordering::Acquire)
    }

    /// Signals the receive loop to return at its next poll.
    pub fn request_stop(&self) {
        self.end_of_program.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sending_flag_round_trips() {
        let state = LinkState::new();
        assert!(!state.is_sending());
        state.set_sending(true);
        assert!(state.is_sending());
        state.set_sending(false);
        assert!(!state.is_sending());
    }

    #[test]
    fn ack_bitmap_accumulates_distinct_bits() {
        let state = LinkState::new();
        state.record_ack(3);
        state.record_ack(4);
        assert_eq!(state.ack_received(), (1 << 3) | (1 << 4));
        state.clear_ack();
        assert_eq!(state.ack_received(), 0);
    }

    #[test]
    fn stop_flag_latches() {
        let state = LinkState::new();
        assert!(!state.is_stopping());
        state.request_stop();
        assert!(state.is_stopping());
    }
}
