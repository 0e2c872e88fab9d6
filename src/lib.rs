//! # sx1278-aprs
//!
//! A portable, no_std Rust APRS transmitter for SX1278 (SX1276/77/78) radios,
//! written for high-altitude balloon payloads.
//!
//! The crate turns position and status samples into AX.25 UI frames and keys them
//! out as Bell-202 style AFSK on a narrowband FM carrier, using:
//! - `embedded-hal` traits for SPI, digital I/O and microsecond timing
//! - a bit-level HDLC encoder (CRC-16/CCITT, bit stuffing, NRZI)
//! - two interchangeable tone strategies: DIO2 pin toggling or fast carrier hopping
//! - a geofence that picks the regional APRS frequency from the current position
//! - a persistent, deduplicating position trail for status packets
//!
//! ## Crate features
//! | Feature            | Description |
//! |--------------------|-------------|
//! | `std`              | Disables `#![no_std]` support |
//! | `critical-section` | Emits each frame inside `critical_section::with` so interrupts cannot stretch tone timing |
//! | `defmt-0-3`        | Uses `defmt` logging |
//! | `log`              | Uses `log` logging |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sx1278_aprs::{config::{AprsConfig, RadioConfig}, driver::Transmitter, geofence};
//!
//! let mut tx = Transmitter::new(spi, Some(dio2), delay, RadioConfig::default(), AprsConfig::default());
//! let freq = geofence::classify(lat_hundredths, lon_hundredths);
//! tx.send_position(freq, "4903.50N", "07201.75W", "hello")?;
//! ```
//!
//! ## Integration Notes
//!
//! - Tone timing is open loop: the mark/space half periods in [`config::ToneTiming`]
//!   must be calibrated per board, since MCU oscillators drift.
//! - A transmission runs to completion once started. Nothing here is cancellable.
//! - The link is transmit-only; there is no receive path.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

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
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "critical-section")]
pub use critical_section;

pub use heapless;

#[macro_use]
mod fmt;

pub mod ax25;
pub mod cache;
pub mod config;
pub mod consts;
pub(crate) mod crc;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod geofence;
pub mod modulator;
pub mod radio;
pub mod telemetry;

pub use error::Error;
