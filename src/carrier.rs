//! Carrier sensing and randomized backoff: the slow-sensing CSMA-CA core
//! that gates every transmission.
//!
//! [`sense_and_wait_idle`] blocks until it has observed a full
//! [`SLOW_SENSING_PERIOD_US`] window with no 4-sample average above
//! `high_cutoff`. Any busy average during a window aborts that window and
//! sleeps a randomized backoff before trying again — there is no RTS/CTS,
//! just repeated slow sensing.

use crate::consts::{
    RANDOM_BACKOFF_LOW_US, RANDOM_BACKOFF_RANGE_US, SAMPLE_PERIOD_US, SLOW_SENSING_PERIOD_US,
};
use crate::hal::{average4, AdcSample, Clock, RngSource};

/// Waits for one full clean sensing window, backing off and retrying
/// whenever the channel is found busy.
pub fn sense_and_wait_idle<M: Clock + AdcSample, R: RngSource>(
    medium: &mut M,
    rng: &mut R,
    high_cutoff: f32,
) {
    while !channel_idle_for(medium, high_cutoff, SLOW_SENSING_PERIOD_US) {
        let backoff = RANDOM_BACKOFF_LOW_US + rng.gen_range_u32(0, RANDOM_BACKOFF_RANGE_US);
        medium.delay_us(backoff);
    }
}

/// True if every 4-sample average stayed at or below `high_cutoff` for the
/// full `window_us`; returns `false` as soon as one average exceeds it.
fn channel_idle_for<M: Clock + AdcSample>(medium: &mut M, high_cutoff: f32, window_us: u32) -> bool {
    let start = medium.now_us();
    loop {
        let elapsed = medium.now_us().wrapping_sub(start);
        if elapsed >= window_us {
            return true;
        }
        if average4(medium) > high_cutoff {
            return false;
        }
        medium.delay_us(SAMPLE_PERIOD_US);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct ScriptedMedium {
        time: Cell<u32>,
        busy_until: u32,
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
            if self.time.get() < self.busy_until {
                10.0
            } else {
                0.0
            }
        }
    }

    struct FixedRng(u32);
    impl RngSource for FixedRng {
        fn gen_range_u32(&mut self, low: u32, high: u32) -> u32 {
            self.0.clamp(low, high.saturating_sub(1))
        }
    }

    #[test]
    fn idle_channel_proceeds_without_any_backoff() {
        let mut medium = ScriptedMedium {
            time: Cell::new(0),
            busy_until: 0,
        };
        let mut rng = FixedRng(0);
        sense_and_wait_idle(&mut medium, &mut rng, 5.0);
        assert_eq!(medium.time.get(), SLOW_SENSING_PERIOD_US);
    }

    #[test]
    fn busy_channel_backs_off_then_succeeds() {
        // Busy for just over one sensing window; sensing must restart, back
        // off, and then succeed once it samples past `busy_until`.
        let busy_until = SLOW_SENSING_PERIOD_US + 1;
        let mut medium = ScriptedMedium {
            time: Cell::new(0),
            busy_until,
        };
        let mut rng = FixedRng(RANDOM_BACKOFF_RANGE_US / 2);
        sense_and_wait_idle(&mut medium, &mut rng, 5.0);
        assert!(medium.time.get() >= busy_until + SLOW_SENSING_PERIOD_US);
        assert!(medium.time.get() >= RANDOM_BACKOFF_LOW_US);
    }
}
