//! The link layer: send/ack coordination (§4.I) and the always-on receive
//! loop (§4.H), tying together the beacon, modulator, carrier sensor, and
//! frame codec into the public `Link` type.
//!
//! `Link<M>` owns one `M` (a [`Medium`]) for the sending side and hands a
//! cheap [`Clone`] of it to a spawned receiver thread — the same "own the
//! peripheral handle by value, clone it for each consumer" idiom the
//! teacher uses for its generic TX/RX/PTT pin types, rather than wrapping
//! the medium in a lock. The two threads instead coordinate purely through
//! [`LinkState`]'s atomics, matching the concurrency model's requirement
//! that no mutex sits in the timing path.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::beacon::{self, BeaconResult};
use crate::calibration::{self, Calibration};
use crate::carrier;
use crate::consts::{
    ACK_PAYLOAD, BEACON_DETECT_TIMEOUT_US, BROADCAST_ACK_WAIT_US, MAX_MSG_SIZE, POSTAMBLE,
    PPM_SLOT_US, PREAMBLE, SAMPLE_PERIOD_US, UNICAST_ACK_WAIT_US,
};
use crate::error::{LinkError, SetupError};
use crate::frame::{self, AckBitmap, NodeAddr};
use crate::hal::{AdcSample, Clock, LedOutput, Medium, RngSource, ThreadRngSource};
use crate::modulation;
use crate::state::LinkState;

/// Caller-supplied, immutable-after-construction configuration.
///
/// Deliberately a plain value rather than a global: the original's `MY_ID`
/// define becomes a field threaded through `Link::new`, never a process-wide
/// singleton.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// This node's own address.
    pub my_id: NodeAddr,
}

/// Which named phase the receive loop is in — replaces the original's
/// `goto restart_receive` with an explicit, logged state progression. Every
/// failure transition re-enters [`ReceiveState::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiveState {
    Idle,
    BeaconHigh,
    BeaconLow,
    Preamble,
    Header,
    Payload,
    Postamble,
    AckDispatch,
}

/// A half-duplex optical link to the rest of the network.
///
/// `M` is the caller's concrete medium (LED + ADC + clock); see
/// [`crate::hal::Medium`]. Calibration runs once, synchronously, inside
/// [`Link::new`].
#[derive(Debug)]
pub struct Link<M: Medium + Clone + Send + 'static> {
    medium: M,
    config: LinkConfig,
    calibration: Calibration,
    state: Arc<LinkState>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl<M: Medium + Clone + Send + 'static> Link<M> {
    /// Calibrates the idle-noise threshold against `medium` (LED assumed
    /// off) and returns a link ready to send and to spawn a receiver on.
    pub fn new(mut medium: M, config: LinkConfig) -> Result<Self, SetupError> {
        let calibration = calibration::calibrate(&mut medium)?;
        log::info!(
            "calibration complete: mean={:.4} stddev={:.4} high_cutoff={:.4}",
            calibration.mean,
            calibration.stddev,
            calibration.high_cutoff
        );
        Ok(Self {
            medium,
            config,
            calibration,
            state: Arc::new(LinkState::new()),
            receiver: Mutex::new(None),
        })
    }

    /// The idle-noise calibration computed at construction.
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Sends `payload` to `to`, waiting for acks per §4.I's rules if
    /// `ack_requested`. Blocks the calling thread for the whole send,
    /// including carrier sense, backoff, transmission, and any ack wait.
    pub fn send(
        &mut self,
        payload: &[u8],
        to: NodeAddr,
        ack_requested: bool,
    ) -> Result<AckBitmap, LinkError> {
        if payload.len() >= MAX_MSG_SIZE {
            return Err(LinkError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_MSG_SIZE - 1,
            });
        }

        self.state.clear_ack();
        self.transmit_once(to, ack_requested, payload)?;

        if !ack_requested {
            return Ok(AckBitmap::empty());
        }

        let wait_us = if to.is_broadcast() {
            BROADCAST_ACK_WAIT_US
        } else {
            UNICAST_ACK_WAIT_US
        };
        Ok(self.wait_for_ack(wait_us, to.is_broadcast()))
    }

    /// Carrier-senses, then drives the beacon and the PPM-encoded frame.
    /// Does not touch `ack_received`; does not wait for any reply.
    fn transmit_once(&mut self, to: NodeAddr, ack_requested: bool, payload: &[u8]) -> Result<(), LinkError> {
        let mut rng = ThreadRngSource;
        carrier::sense_and_wait_idle(&mut self.medium, &mut rng, self.calibration.high_cutoff);

        let frame = frame::encode(to, self.config.my_id, ack_requested, payload)?;
        let timeline = modulation::build_timeline(frame.as_slice());

        self.state.set_sending(true);
        beacon::produce(&mut self.medium);
        modulation::transmit(&mut self.medium, &timeline);
        self.state.set_sending(false);
        Ok(())
    }

    fn wait_for_ack(&mut self, wait_us: u32, unconditional: bool) -> AckBitmap {
        let start = self.medium.now_us();
        loop {
            let elapsed = self.medium.now_us().wrapping_sub(start);
            if elapsed >= wait_us {
                break;
            }
            if !unconditional && self.state.ack_received() != 0 {
                break;
            }
            self.medium.delay_us(SAMPLE_PERIOD_US);
        }
        AckBitmap::from_raw(self.state.ack_received())
    }

    /// Spawns the always-on receive loop on a new thread. `on_message` is
    /// invoked from that thread for every payload addressed to us (unicast
    /// or broadcast) that isn't itself an ack frame.
    pub fn start_receiver<F>(&self, on_message: F)
    where
        F: Fn(NodeAddr, NodeAddr, &[u8]) + Send + 'static,
    {
        let mut medium = self.medium.clone();
        let state = Arc::clone(&self.state);
        let high_cutoff = self.calibration.high_cutoff;
        let my_id = self.config.my_id;

        let handle = thread::spawn(move || {
            receive_loop(&mut medium, &state, high_cutoff, my_id, on_message);
        });
        *self.receiver.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(handle);
    }

    /// Signals the receive loop to stop and joins its thread. A no-op if no
    /// receiver has been started.
    pub fn stop(&self) {
        self.state.request_stop();
        if let Some(handle) = self
            .receiver
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .take()
        {
            let _ = handle.join();
        }
    }
}

/// Re-entrant, ack-free send used by the receive loop to reply with an
/// "ack" frame. Does not carrier-sense (the channel was just occupied by
/// the frame being acked) and never touches `ack_received`, so it is legal
/// to call from the receive thread while the real sender is blocked in its
/// own ack wait — see the concurrency model's re-entrancy note.
fn send_unacked<M: Medium>(medium: &mut M, state: &LinkState, from: NodeAddr, to: NodeAddr, payload: &[u8]) {
    let Ok(frame) = frame::encode(to, from, false, payload) else {
        log::debug!("dropped oversized ack payload, should be unreachable");
        return;
    };
    let timeline = modulation::build_timeline(frame.as_slice());
    state.set_sending(true);
    beacon::produce(medium);
    modulation::transmit(medium, &timeline);
    state.set_sending(false);
}

/// The always-on receiver: implements §4.H's ten steps as an explicit state
/// progression rather than the original's `goto restart_receive`.
fn receive_loop<M: Medium, F: Fn(NodeAddr, NodeAddr, &[u8])>(
    medium: &mut M,
    state: &LinkState,
    high_cutoff: f32,
    my_id: NodeAddr,
    on_message: F,
) {
    let mut rng = ThreadRngSource;

    'receive: loop {
        if state.is_stopping() {
            return;
        }
        let mut phase = ReceiveState::Idle;
        log::trace!("receive phase -> {phase:?}");

        // Step 1: jitter the phase so a retrying receiver doesn't lock step
        // with another one.
        let jitter = rng.gen_range_u32(0, PPM_SLOT_US);
        medium.delay_us(jitter);

        // Step 2: wait for signal-high, honoring the SENDING guard (our own
        // transmission must never be decoded as an incoming frame).
        loop {
            if state.is_stopping() {
                return;
            }
            if state.is_sending() {
                while state.is_sending() {
                    if state.is_stopping() {
                        return;
                    }
                    medium.delay_us(SAMPLE_PERIOD_US);
                }
                continue 'receive;
            }
            if medium.read_voltage() >= high_cutoff {
                break;
            }
            medium.delay_us(SAMPLE_PERIOD_US);
        }

        // Step 3: validate the alignment beacon.
        phase = ReceiveState::BeaconHigh;
        log::trace!("receive phase -> {phase:?}");
        match beacon::detect(medium, high_cutoff, BEACON_DETECT_TIMEOUT_US) {
            BeaconResult::NoSignal => {
                log::trace!("beacon validation failed, restarting");
                continue 'receive;
            }
            BeaconResult::Detected { .. } => {}
        }
        phase = ReceiveState::BeaconLow;
        log::trace!("receive phase -> {phase:?}");

        // Step 4: hidden-terminal mitigation. Held high through the
        // postamble check below regardless of outcome.
        medium.set_led(true);

        // Step 5: preamble.
        phase = ReceiveState::Preamble;
        log::trace!("receive phase -> {phase:?}");
        let preamble = modulation::receive_symbol_byte(medium, high_cutoff);
        if preamble != PREAMBLE {
            medium.set_led(false);
            log::debug!("preamble mismatch: {:#04x}", preamble);
            continue 'receive;
        }

        // Step 6: address byte.
        phase = ReceiveState::Header;
        log::trace!("receive phase -> {phase:?}");
        let address_byte = modulation::receive_symbol_byte(medium, high_cutoff);
        let (to, from) = frame::decode_address_byte(address_byte);

        // Step 7: length/ack byte.
        let length_byte = modulation::receive_symbol_byte(medium, high_cutoff);
        let (ack_requested, length) = frame::decode_length_byte(length_byte);
        if length as usize >= MAX_MSG_SIZE {
            medium.set_led(false);
            log::debug!("length {length} out of range, aborting before payload read");
            continue 'receive;
        }

        // Step 8: payload.
        phase = ReceiveState::Payload;
        log::trace!("receive phase -> {phase:?}");
        let mut payload = [0u8; MAX_MSG_SIZE];
        for slot in payload.iter_mut().take(length as usize) {
            *slot = modulation::receive_symbol_byte(medium, high_cutoff);
        }

        // Step 9: postamble. LED drops here regardless of the outcome.
        phase = ReceiveState::Postamble;
        log::trace!("receive phase -> {phase:?}");
        let postamble = modulation::receive_symbol_byte(medium, high_cutoff);
        medium.set_led(false);
        if postamble != POSTAMBLE {
            log::debug!("postamble mismatch: {:#04x}", postamble);
            continue 'receive;
        }

        // Step 10: dispatch.
        phase = ReceiveState::AckDispatch;
        log::trace!("receive phase -> {phase:?}");
        let payload = &payload[..length as usize];

        if from == my_id {
            log::trace!("dropped self-addressed echo (from == my_id)");
            continue 'receive;
        }

        if to == my_id || to.is_broadcast() {
            if payload == ACK_PAYLOAD {
                state.record_ack(from.get());
            } else {
                if ack_requested {
                    medium.delay_us(2 * SAMPLE_PERIOD_US);
                    send_unacked(medium, state, my_id, from, ACK_PAYLOAD);
                }
                on_message(from, to, payload);
            }
        } else {
            log::trace!("snooped frame {from} -> {to}, not ours");
        }
    }
}
