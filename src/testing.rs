//! An in-memory loopback [`Medium`] for tests and the `demos/cli.rs` binary.
//!
//! Grounded in the teacher's own `std`-only test fixture: a `Pin` wrapping
//! `Arc<Mutex<VecDeque<bool>>>` standing in for a shared RF wire. Here the
//! "wire" is a set of per-node LED flags on a shared [`LoopbackBus`], and
//! the clock is real wall-clock time compressed by a configurable
//! `time_scale` so that protocol timings that would otherwise take whole
//! seconds (an ack wait, a calibration window) complete in milliseconds —
//! every `delay_us` and `now_us` call is scaled by the same factor, so
//! relative timing ratios the protocol depends on are preserved exactly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::hal::{AdcSample, Clock, LedOutput, RngSource};

const HIGH_VOLTAGE: f32 = 3.3;
const LOW_VOLTAGE: f32 = 0.0;
const NOISE_AMPLITUDE: f32 = 0.02;

/// The number of distinct node addresses a [`LoopbackBus`] can host (the
/// link layer's whole 4-bit address space, `0..=15`).
const BUS_NODES: usize = 16;

struct BusInner {
    start: Instant,
    leds: [AtomicBool; BUS_NODES],
}

/// A shared optical channel joining however many [`LoopbackMedium`]
/// endpoints are created from it. Cheap to clone; all clones and all
/// endpoints derived from them refer to the same underlying bus.
#[derive(Clone)]
pub struct LoopbackBus(std::sync::Arc<BusInner>);

impl std::fmt::Debug for LoopbackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackBus").finish_non_exhaustive()
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackBus {
    /// Creates a fresh bus with every node's LED off.
    pub fn new() -> Self {
        LoopbackBus(std::sync::Arc::new(BusInner {
            start: Instant::now(),
            leds: Default::default(),
        }))
    }

    /// Returns a medium handle for `node_id`, compressing real time by
    /// `time_scale` (every microsecond of protocol time becomes
    /// `1 / time_scale` microseconds of real sleep). `node_id` must be
    /// `< 16`.
    pub fn endpoint(&self, node_id: u8, time_scale: u32) -> LoopbackMedium {
        assert!((node_id as usize) < BUS_NODES, "loopback node id out of range");
        assert!(time_scale >= 1, "time_scale must be at least 1");
        LoopbackMedium {
            bus: self.clone(),
            node_id,
            time_scale,
        }
    }
}

/// One node's view of a [`LoopbackBus`]: implements [`Clock`], [`LedOutput`],
/// and [`AdcSample`], so it satisfies [`crate::hal::Medium`].
#[derive(Clone, Debug)]
pub struct LoopbackMedium {
    bus: LoopbackBus,
    node_id: u8,
    time_scale: u32,
}

impl Clock for LoopbackMedium {
    fn now_us(&self) -> u32 {
        let real_us = self.bus.0.start.elapsed().as_micros() as u64;
        (real_us.saturating_mul(self.time_scale as u64) & u32::MAX as u64) as u32
    }

    fn delay_us(&self, us: u32) {
        let real_us = (us as u64 / self.time_scale as u64).max(1);
        std::thread::sleep(std::time::Duration::from_micros(real_us));
    }
}

impl LedOutput for LoopbackMedium {
    fn set_led(&mut self, high: bool) {
        self.bus.0.leds[self.node_id as usize].store(high, Ordering::Release);
    }
}

impl AdcSample for LoopbackMedium {
    fn read_voltage(&mut self) -> f32 {
        let any_high = self
            .bus
            .0
            .leds
            .iter()
            .any(|led| led.load(Ordering::Acquire));
        let base = if any_high { HIGH_VOLTAGE } else { LOW_VOLTAGE };
        base + jitter()
    }
}

fn jitter() -> f32 {
    use rand::Rng;
    rand::thread_rng().gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE)
}

/// A [`RngSource`] that always returns the same value, clamped to the
/// requested range — useful for deterministic backoff in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedRng(pub u32);

impl RngSource for FixedRng {
    fn gen_range_u32(&mut self, low: u32, high: u32) -> u32 {
        self.0.clamp(low, high.saturating_sub(1).max(low))
    }
}
