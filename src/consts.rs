//! Protocol-wide constants for the PPM visible-light link.
//!
//! These values define symbol/slot timing, frame layout limits, and the
//! derived periods used for carrier sensing and ACK wait windows. They are
//! fixed at compile time, mirroring the `#define`-based configuration of the
//! original implementation this protocol is drawn from: every timing budget
//! downstream (carrier sense window, backoff range, ACK wait) is computed
//! from just a handful of primitives (`SAMPLE_PERIOD_US`, `PPM_BITS`,
//! `MAX_MSG_SIZE`), so changing one constant here reflows consistently
//! through the rest.
//!
//! ## Key Concepts
//!
//! - **Sampling**: the ADC is assumed to deliver a fresh reading at least
//!   every [`SAMPLE_PERIOD_US`].
//! - **PPM symbols**: each symbol period is divided into [`PPM_SLOT_COUNT`]
//!   slots; exactly one carries the LED pulse. `PPM_BITS = 1` is the
//!   Manchester-equivalent special case used throughout this crate.
//! - **Frame layout**: preamble, address, length/ack byte, payload,
//!   postamble — see [`crate::frame`].
//! - **Derived periods**: [`PACKET_PERIOD_US`] bounds a full frame
//!   transmission and sizes the ACK wait windows and backoff range.

/// Worst-case time for one ADC sample to become available.
pub const SAMPLE_PERIOD_US: u32 = 25;

/// Number of bits encoded per PPM symbol. `1` is the Manchester-equivalent
/// special case this crate implements; the slot math below generalizes to
/// other values but only `1` is exercised.
pub const PPM_BITS: u32 = 1;

/// Number of time-slots per PPM symbol period (`2^PPM_BITS`).
pub const PPM_SLOT_COUNT: usize = 1 << PPM_BITS;

/// Duration of a single PPM slot.
pub const PPM_SLOT_US: u32 = SAMPLE_PERIOD_US * 20;

/// Duration of one full PPM symbol period (`PPM_SLOT_US * PPM_SLOT_COUNT`).
pub const PPM_PERIOD_US: u32 = PPM_SLOT_US * PPM_SLOT_COUNT as u32;

/// Number of PPM symbols needed to carry one byte (`8 / PPM_BITS`).
pub const SYMBOLS_PER_BYTE: usize = 8 / PPM_BITS as usize;

/// Preamble byte: alternating bit pattern, chosen for transition density so
/// the alignment beacon's lock carries cleanly into symbol decoding.
pub const PREAMBLE: u8 = 0x55;

/// Postamble byte: doubles as the only integrity check this link performs.
pub const POSTAMBLE: u8 = 0x24;

/// Maximum payload length in bytes. The length field is the low 7 bits of
/// its header byte (the top bit carries `ack_requested`), so this can never
/// exceed 128; the protocol further restricts it to 60.
pub const MAX_MSG_SIZE: usize = 60;

/// Address reserved for "every node on the channel".
pub const BROADCAST_ADDRESS: u8 = 15;

/// Highest valid unicast/broadcast node address (4-bit address space).
pub const MAX_ADDRESS: u8 = 15;

/// Total on-wire frame length budget: preamble + header + postamble + the
/// largest possible payload.
pub const MAX_FRAME_LEN: usize = MAX_MSG_SIZE + 4;

/// Length of the precomputed PPM signal timeline for the largest possible
/// frame (one `bool` per slot across every symbol of every byte).
pub const MAX_FRAME_TIMELINE_LEN: usize = MAX_FRAME_LEN * SYMBOLS_PER_BYTE * PPM_SLOT_COUNT;

/// Worst-case duration of one full frame transmission, used to size the
/// carrier-sense window, the backoff range, and the ACK wait windows.
pub const PACKET_PERIOD_US: u32 = (SYMBOLS_PER_BYTE as u32) * PPM_PERIOD_US * (MAX_FRAME_LEN as u32);

/// Duration of the full alignment beacon (high half + low half combined);
/// also the slow-sensing channel-idle check duration.
pub const BEACON_PERIOD_US: u32 = 4 * PPM_PERIOD_US;

/// Duration of one half of the alignment beacon (LED held high, or held
/// low) — half of [`BEACON_PERIOD_US`].
pub const BEACON_HALF_PERIOD_US: u32 = BEACON_PERIOD_US / 2;

/// Duration of the pre-transmission channel-idle check.
pub const SLOW_SENSING_PERIOD_US: u32 = BEACON_PERIOD_US;

/// Floor of the randomized backoff delay after a contended channel.
pub const RANDOM_BACKOFF_LOW_US: u32 = PACKET_PERIOD_US;

/// Width of the randomized backoff delay range added on top of the floor.
pub const RANDOM_BACKOFF_RANGE_US: u32 = 4 * PACKET_PERIOD_US;

/// Unicast ACK wait window: returns as soon as any ack bit is set, or this
/// elapses first.
pub const UNICAST_ACK_WAIT_US: u32 = 2 * PACKET_PERIOD_US;

/// Broadcast ACK wait window: always waited out in full, to collect acks
/// from multiple peers even under collisions.
pub const BROADCAST_ACK_WAIT_US: u32 = 20 * PACKET_PERIOD_US;

/// Grace period tolerated at the edges of each beacon half before requiring
/// the signal to have settled to its expected level.
pub const BEACON_GRACE_US: u32 = 5 * SAMPLE_PERIOD_US;

/// Lead-in ignored at the start of the beacon's low half (lets the LED
/// finish falling before samples are judged).
pub const BEACON_LOW_LEAD_IN_US: u32 = 2 * SAMPLE_PERIOD_US;

/// Margin before the end of a symbol window reserved for decoding and
/// clock-skew absorption.
pub const DEMOD_TAIL_MARGIN_US: u32 = 3 * SAMPLE_PERIOD_US;

/// Target sampling interval used while calibrating the idle-noise cutoff.
pub const CALIBRATION_SAMPLE_INTERVAL_US: u32 = 1_000;

/// Total duration of the idle-noise calibration window (~2 seconds).
pub const CALIBRATION_WINDOW_US: u32 = 2_000_000;

/// Number of standard deviations above the idle mean used to set the
/// high/low decision threshold.
pub const CALIBRATION_SIGMA_MULTIPLIER: f32 = 4.0;

/// The literal ACK payload sent back by a receiver that was asked for one.
pub const ACK_PAYLOAD: &[u8] = b"ack";

/// Upper bound on how long the receive loop keeps re-scanning false beacon
/// starts before giving up on this attempt and returning to the jitter/wait
/// phase. Not part of the original timing budget (the original receive loop
/// has no such bound, relying on the outer wait-for-high check instead); set
/// to one packet period so a noisy channel can't wedge the beacon validator.
pub const BEACON_DETECT_TIMEOUT_US: u32 = PACKET_PERIOD_US;
