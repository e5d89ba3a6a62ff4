//! Error types for the link layer.
//!
//! Setup and usage failures (§7 of the design: bad calibration, oversized
//! payloads, out-of-range addresses) are returned, never panicked on — a
//! library cannot unilaterally `exit()` its host process the way the
//! original program's `ASSERT` macro did. Transient medium errors (failed
//! beacon, bad postamble, a length field out of range) are not represented
//! here at all: per the design they are silent and recoverable, surfaced
//! only indirectly through an empty ack bitmap or a message that never
//! arrives.

/// Failures that can occur while bringing the link up.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    /// The idle-noise calibration window produced zero ADC samples.
    #[error("calibration collected no samples")]
    NoSamples,

    /// The calibration window produced a variance that isn't a finite,
    /// non-negative number (e.g. a single-sample window, or a stub ADC
    /// returning NaN).
    #[error("calibration variance was not finite")]
    NonFiniteVariance,
}

/// Failures that can occur while using an already-initialized link.
#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    /// The caller tried to send a payload at or above [`crate::consts::MAX_MSG_SIZE`].
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// An address outside the 4-bit address space (`0..=15`) was supplied.
    #[error("address {0} is outside the 4-bit address space (0..=15)")]
    InvalidAddress(u8),
}
