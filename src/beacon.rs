//! Alignment beacon: the half-high/half-low pulse a sender drives before a
//! frame's preamble so a receiver can lock its sample clock before symbol
//! decoding starts.
//!
//! The beacon is two [`BEACON_HALF_PERIOD_US`]-long halves: LED held high,
//! then LED held low. [`detect`] treats a sustained high region followed by a
//! sustained low region as a lock; anything that breaks the pattern partway
//! through (noise, another node's own transmission) is a false start and
//! detection resumes scanning rather than failing outright.

use crate::consts::{
    BEACON_GRACE_US, BEACON_HALF_PERIOD_US, BEACON_LOW_LEAD_IN_US, SAMPLE_PERIOD_US,
};
use crate::hal::{average4, AdcSample, Clock, LedOutput};

/// Outcome of a beacon detection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconResult {
    /// A full high-then-low beacon was observed; `locked_at` is the
    /// timestamp of the falling-to-rising boundary, i.e. the moment the
    /// following preamble symbol begins.
    Detected {
        /// Timestamp (per [`Clock::now_us`]) the preamble begins at.
        locked_at: u32,
    },
    /// No valid beacon was observed before the timeout elapsed.
    NoSignal,
}

/// Drives the beacon pattern: LED high for half a beacon period, then low
/// for half a beacon period.
pub fn produce<M: Clock + LedOutput>(medium: &mut M) {
    medium.set_led(true);
    medium.delay_us(BEACON_HALF_PERIOD_US);
    medium.set_led(false);
    medium.delay_us(BEACON_HALF_PERIOD_US);
}

/// Scans for a beacon, returning as soon as one locks or `timeout_us`
/// elapses since the call started.
///
/// A candidate high region that drops low before
/// `BEACON_HALF_PERIOD_US - BEACON_GRACE_US` has elapsed is a false start:
/// the scan resumes from wherever it left off rather than restarting the
/// whole timeout budget.
///
/// The high-hold check deliberately stops `BEACON_GRACE_US` short of a full
/// half-period, tolerating an LED that starts falling a little early; the
/// low check then waits out that same grace period plus
/// `BEACON_LOW_LEAD_IN_US` before it starts sampling, so it never begins
/// while the signal is still mid-transition. Both of those shave time off
/// the nominal two-half-period duration, so a final `BEACON_GRACE_US` delay
/// after the low check re-aligns `locked_at` back to the true frame
/// boundary — without it every lock would land a fixed `BEACON_GRACE_US`
/// before the real preamble starts, corrupting however much of the first
/// symbol falls inside that gap.
pub fn detect<M: Clock + AdcSample>(
    medium: &mut M,
    high_cutoff: f32,
    timeout_us: u32,
) -> BeaconResult {
    let detect_start = medium.now_us();

    loop {
        if medium.now_us().wrapping_sub(detect_start) >= timeout_us {
            return BeaconResult::NoSignal;
        }

        if medium.read_voltage() < high_cutoff {
            medium.delay_us(SAMPLE_PERIOD_US);
            continue;
        }

        if !hold_level(medium, high_cutoff, true, BEACON_HALF_PERIOD_US - BEACON_GRACE_US) {
            continue;
        }

        // Clears the uncertain transition zone: the high-hold above could
        // have stopped up to BEACON_GRACE_US before the real edge, so wait
        // that long again plus the lead-in before trusting a "low" sample.
        medium.delay_us(BEACON_GRACE_US + BEACON_LOW_LEAD_IN_US);

        let low_window = BEACON_HALF_PERIOD_US
            .saturating_sub(BEACON_LOW_LEAD_IN_US)
            .saturating_sub(BEACON_GRACE_US);
        if !hold_level(medium, high_cutoff, false, low_window) {
            continue;
        }

        medium.delay_us(BEACON_GRACE_US);
        return BeaconResult::Detected {
            locked_at: medium.now_us(),
        };
    }
}

/// Samples for up to `window_us`, returning `true` only if every sample
/// matched `expect_high` throughout.
fn hold_level<M: Clock + AdcSample>(
    medium: &mut M,
    high_cutoff: f32,
    expect_high: bool,
    window_us: u32,
) -> bool {
    let start = medium.now_us();
    loop {
        let elapsed = medium.now_us().wrapping_sub(start);
        if elapsed >= window_us {
            return true;
        }
        let is_high = average4(medium) >= high_cutoff;
        if is_high != expect_high {
            return false;
        }
        medium.delay_us(SAMPLE_PERIOD_US);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct RecordingMedium {
        time: Cell<u32>,
        events: Vec<(u32, bool)>,
    }

    impl Clock for RecordingMedium {
        fn now_us(&self) -> u32 {
            self.time.get()
        }
        fn delay_us(&self, us: u32) {
            self.time.set(self.time.get().wrapping_add(us));
        }
    }

    impl LedOutput for RecordingMedium {
        fn set_led(&mut self, high: bool) {
            let now = self.time.get();
            self.events.push((now, high));
        }
    }

    #[test]
    fn produce_drives_high_then_low_for_one_half_period_each() {
        let mut medium = RecordingMedium {
            time: Cell::new(0),
            events: Vec::new(),
        };
        produce(&mut medium);
        assert_eq!(
            medium.events,
            vec![(0, true), (BEACON_HALF_PERIOD_US, false)]
        );
        assert_eq!(medium.time.get(), 2 * BEACON_HALF_PERIOD_US);
    }

    struct ScriptedMedium {
        time: Cell<u32>,
        high_until: u32,
        low_until: u32,
    }

    impl Clock for ScriptedMedium {
        fn now_us(&self) -> u32 {
            self.time.get()
        }
        fn delay_us(&self, us: u32) {
            self.time.set(self.time.get().wrapping_add(us));
        }
    }

    impl AdcSample for ScriptedMedium {
        fn read_voltage(&mut self) -> f32 {
            let now = self.time.get();
            if now < self.high_until {
                10.0
            } else if now < self.low_until {
                0.0
            } else {
                10.0
            }
        }
    }

    #[test]
    fn detect_locks_onto_a_clean_beacon() {
        let mut medium = ScriptedMedium {
            time: Cell::new(0),
            high_until: BEACON_HALF_PERIOD_US,
            low_until: 2 * BEACON_HALF_PERIOD_US,
        };
        let result = detect(&mut medium, 5.0, 4 * BEACON_HALF_PERIOD_US);
        assert!(matches!(result, BeaconResult::Detected { .. }));
    }

    #[test]
    fn detect_locked_at_lands_on_the_true_frame_boundary() {
        // For an idealized, instant-transition beacon, `locked_at` must land
        // exactly on the boundary where the following preamble symbol
        // begins, not somewhere inside the grace/lead-in slack — otherwise
        // every subsequent symbol read starts offset from the real data.
        let mut medium = ScriptedMedium {
            time: Cell::new(0),
            high_until: BEACON_HALF_PERIOD_US,
            low_until: 2 * BEACON_HALF_PERIOD_US,
        };
        let result = detect(&mut medium, 5.0, 4 * BEACON_HALF_PERIOD_US);
        assert_eq!(
            result,
            BeaconResult::Detected {
                locked_at: 2 * BEACON_HALF_PERIOD_US
            }
        );
    }

    #[test]
    fn detect_times_out_with_no_signal() {
        let mut medium = ScriptedMedium {
            time: Cell::new(0),
            high_until: 0,
            low_until: 0,
        };
        let result = detect(&mut medium, 5.0, 3 * BEACON_HALF_PERIOD_US);
        assert_eq!(result, BeaconResult::NoSignal);
    }
}
