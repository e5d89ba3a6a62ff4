//! PPM symbol modulation and demodulation.
//!
//! A byte becomes [`SYMBOLS_PER_BYTE`] symbols, each one bit wide (this crate
//! only implements the `PPM_BITS == 1` case). Each symbol occupies
//! [`PPM_SLOT_COUNT`] equal slots, with exactly one slot pulsed high; which
//! slot carries the bit. [`build_timeline`] turns a frame's bytes into that
//! flat slot sequence and [`transmit`] drives it out the LED one slot at a
//! time. On the receive side there is no PLL tracking the edge — the
//! receiver has already locked to the symbol boundary via [`crate::beacon`],
//! so [`receive_symbol_byte`] just oversamples each slot, takes a majority
//! vote, and picks the slot with the most "high" votes (ties go to the
//! lowest slot index, matching the sender's own bit-to-slot mapping).

use crate::consts::{
    DEMOD_TAIL_MARGIN_US, MAX_FRAME_TIMELINE_LEN, PPM_PERIOD_US, PPM_SLOT_COUNT, PPM_SLOT_US,
    SAMPLE_PERIOD_US, SYMBOLS_PER_BYTE,
};
use crate::hal::{AdcSample, Clock, LedOutput};

/// A flattened, stack-resident PPM slot sequence for one frame.
///
/// One `bool` per slot, in transmission order: byte-major, then symbol, then
/// slot. `true` means the LED is driven high for that slot's duration.
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    slots: [bool; MAX_FRAME_TIMELINE_LEN],
    len: usize,
}

impl Timeline {
    /// The slot sequence, in transmission order.
    pub fn as_slice(&self) -> &[bool] {
        &self.slots[..self.len]
    }
}

/// Expands a frame's bytes into their PPM slot timeline.
///
/// Bits are taken LSB-first per byte, one bit per symbol; the bit's value
/// selects which of the [`PPM_SLOT_COUNT`] slots is pulsed (valid only for
/// the `PPM_BITS == 1`, two-slot case this crate implements). `0x01`
/// therefore produces a pulse in slot 1 of the first symbol and slot 0 of
/// every symbol after it.
pub fn build_timeline(frame: &[u8]) -> Timeline {
    let mut slots = [false; MAX_FRAME_TIMELINE_LEN];
    let mut n = 0usize;

    for &byte in frame {
        for symbol_index in 0..SYMBOLS_PER_BYTE {
            let bit = (byte >> symbol_index) & 1;
            for slot in 0..PPM_SLOT_COUNT {
                slots[n] = slot as u8 == bit;
                n += 1;
            }
        }
    }

    Timeline { slots, len: n }
}

/// Drives a precomputed timeline out the LED and returns it to low
/// afterward.
///
/// Rather than sleeping a fixed `PPM_SLOT_US` per slot (which would let
/// per-call scheduling overhead accumulate into clock drift over a long
/// frame), this references every edge back to a single `start = now_us()`
/// taken once: the slot index is recomputed from elapsed time on every
/// spin, so an oversleeping `delay_us` call costs at most that one slot,
/// never compounds, and the last slot's edge lands at its correct
/// absolute time regardless of how many slots preceded it.
///
/// Callers are responsible for setting the shared "sending" flag before
/// this runs and clearing it after — see [`crate::link`].
pub fn transmit<M: Clock + LedOutput>(medium: &mut M, timeline: &Timeline) {
    let slots = timeline.as_slice();
    let total_us = slots.len() as u32 * PPM_SLOT_US;
    let start = medium.now_us();
    let mut current_slot = usize::MAX;

    loop {
        let elapsed = medium.now_us().wrapping_sub(start);
        if elapsed >= total_us {
            break;
        }
        let slot = (elapsed / PPM_SLOT_US) as usize;
        if slot != current_slot {
            medium.set_led(slots[slot]);
            current_slot = slot;
        }
        medium.delay_us(SAMPLE_PERIOD_US);
    }
    medium.set_led(false);
}

/// Picks the slot with the most votes, breaking ties toward the lowest
/// index — the same rule the sender implicitly uses (a tie can only occur
/// under noise, since exactly one slot is ever driven high).
pub(crate) fn argmax_tie_low(votes: &[u32; PPM_SLOT_COUNT]) -> usize {
    let mut best = 0usize;
    for (slot, &count) in votes.iter().enumerate().skip(1) {
        if count > votes[best] {
            best = slot;
        }
    }
    best
}

/// Demodulates one byte's worth of symbols from the channel.
///
/// Assumes the caller has already aligned to the start of the first
/// symbol (via [`crate::beacon::detect`]), then samples continuously
/// across the whole byte window, bucketing each reading into a slot by
/// its own elapsed time (`elapsed / PPM_SLOT_US`) rather than assuming a
/// fixed sample count per slot — the same drift-free, elapsed-time
/// referencing [`transmit`] uses on the sending side, so a slow ADC read
/// or an oversleeping `delay_us` shifts which bucket the *next* sample
/// falls in without ever corrupting slots already voted on. The window
/// is shortened by [`DEMOD_TAIL_MARGIN_US`] so the last few samples,
/// which would otherwise straddle the symbol's trailing edge, are never
/// taken. Symbols are assembled LSB-first, mirroring [`build_timeline`].
pub fn receive_symbol_byte<M: Clock + AdcSample>(medium: &mut M, high_cutoff: f32) -> u8 {
    let byte_window_us = SYMBOLS_PER_BYTE as u32 * PPM_PERIOD_US - DEMOD_TAIL_MARGIN_US;
    let mut votes = [[0u32; PPM_SLOT_COUNT]; SYMBOLS_PER_BYTE];

    let start = medium.now_us();
    loop {
        let elapsed = medium.now_us().wrapping_sub(start);
        if elapsed >= byte_window_us {
            break;
        }
        let symbol_index = (elapsed / PPM_PERIOD_US) as usize;
        let slot = ((elapsed % PPM_PERIOD_US) / PPM_SLOT_US) as usize;
        if symbol_index < SYMBOLS_PER_BYTE && medium.read_voltage() >= high_cutoff {
            votes[symbol_index][slot] += 1;
        }
        medium.delay_us(SAMPLE_PERIOD_US);
    }

    // Realign to the byte boundary so the next call starts exactly where
    // this one's nominal window ended, regardless of how the last spin's
    // overshoot landed.
    let elapsed = medium.now_us().wrapping_sub(start);
    let remaining = (SYMBOLS_PER_BYTE as u32 * PPM_PERIOD_US).saturating_sub(elapsed);
    if remaining > 0 {
        medium.delay_us(remaining);
    }

    let mut byte = 0u8;
    for (symbol_index, symbol_votes) in votes.iter().enumerate() {
        let bit = argmax_tie_low(symbol_votes) as u8;
        byte |= bit << symbol_index;
    }
    byte
}
