//! # vlc-modem
//!
//! A software PPM modem and link layer for a half-duplex visible-light data
//! link: an LED transmitter, a photodiode/ADC receiver, and a carrier-sense
//! MAC with randomized backoff and acknowledgements layered on top.
//!
//! This crate implements a single-bit-per-symbol pulse-position modulation
//! (the `PPM_BITS == 1`, Manchester-equivalent case) over a shared optical
//! channel: every node's transmit LED and receive photodiode sit on the same
//! medium, so collisions are avoided the same way a low-power radio would —
//! slow carrier sensing before transmitting, an alignment beacon so a
//! receiver can lock its sample clock before decoding symbols, and a
//! hidden-terminal mitigation where the receiver asserts its own LED for the
//! duration of an incoming frame.
//!
//! ## Crate layout
//!
//! - [`consts`] — protocol timing and frame-layout constants.
//! - [`hal`] — the `Clock`/`LedOutput`/`AdcSample`/`RngSource` traits a
//!   concrete medium implements; nothing in this crate implements them for
//!   real hardware, that's a platform integration's job.
//! - [`frame`] — the on-wire byte layout: [`frame::NodeAddr`],
//!   [`frame::AckBitmap`], encode/decode.
//! - [`calibration`] — idle-noise sampling that derives the high/low
//!   decision threshold used everywhere else.
//! - [`modulation`] — PPM symbol encode/decode.
//! - [`beacon`] — the alignment beacon sender and detector.
//! - [`carrier`] — slow carrier sensing and randomized backoff.
//! - [`state`] — the atomics shared between the sending and receiving
//!   threads.
//! - [`link`] — [`link::Link`], the public send/receive API tying all of the
//!   above together.
//! - [`testing`] — an in-memory loopback medium used by this crate's own
//!   tests and by the `vlc-cli` demo binary; not behind `cfg(test)` since
//!   the demo binary is a separate crate target that needs it too.
//!
//! ## Usage
//!
//! ```rust
//! use vlc_modem::frame::NodeAddr;
//! use vlc_modem::link::{Link, LinkConfig};
//! use vlc_modem::testing::LoopbackBus;
//!
//! let bus = LoopbackBus::new();
//! let my_id = NodeAddr::new(2).unwrap();
//! let link = Link::new(bus.endpoint(my_id.get(), 20_000), LinkConfig { my_id })
//!     .expect("calibration against an idle channel");
//!
//! link.start_receiver(|from, to, payload| {
//!     println!("{from} -> {to}: {payload:?}");
//! });
//! link.stop();
//! ```
//!
//! ## Logging
//!
//! Diagnostic and transient-medium-error messages go through the [`log`]
//! facade (`log::trace!`/`debug!`/`info!`), gated behind the `log` feature
//! (on by default). Install any `log`-compatible logger — `env_logger` is
//! what this crate's own demo binary and dev-dependencies use — to see them.
//!
//! ## Status
//!
//! This crate targets a single, fixed slow-PPM modulation scheme over one
//! shared optical channel. There is no forward error correction beyond the
//! postamble check, no encryption, and no dynamic modulation negotiation —
//! see each module's Non-goals for specifics.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]

pub mod beacon;
pub mod calibration;
pub mod carrier;
pub mod consts;
pub mod error;
pub mod frame;
pub mod hal;
pub mod link;
pub mod modulation;
pub mod state;
pub mod testing;

pub use error::{LinkError, SetupError};
pub use frame::{AckBitmap, NodeAddr};
pub use hal::{AdcSample, Clock, LedOutput, Medium, RngSource};
pub use link::{Link, LinkConfig};
