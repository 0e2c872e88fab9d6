//! Error types shared by the radio driver and the packet assembler.
//!
//! The link is open loop, so the only failures that can be represented are
//! requests that are invalid before a frame starts, and bus errors reported by
//! the HAL while the chip is being set up. Once the first flag is on air, pin
//! and bus errors are ignored: a frame is either completed or the whole MCU is
//! reset from outside.

use thiserror::Error;

/// Errors returned by this crate.
///
/// `E` is the error type of the SPI device driving the radio.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error<E> {
    /// The power request cannot be produced by the selected PA path.
    ///
    /// Valid ranges are 2..=15 dBm without PA boost and 5..=20 dBm with it.
    #[error("transmit power {dbm} dBm is out of range (PA boost: {boost})")]
    PowerOutOfRange {
        /// Requested power in dBm.
        dbm: u8,
        /// Whether the PA_BOOST path was requested.
        boost: bool,
    },
    /// The frame could not be assembled.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// DIO2 modulation was selected but no DIO2 pin was supplied.
    #[error("DIO2 modulation selected without a DIO2 pin")]
    MissingDio2,
    /// The SPI device reported an error while the radio was being configured.
    #[error("radio bus error: {0:?}")]
    Bus(E),
}

/// Reasons an AX.25 frame is rejected before transmission.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameError {
    /// A callsign is empty, longer than six characters or not printable ASCII.
    #[error("callsign must be 1 to 6 printable ASCII characters")]
    InvalidCallsign,
    /// SSIDs are four bits wide.
    #[error("SSID {0} is out of range 0..=15")]
    InvalidSsid(u8),
    /// Position strings must be exactly 8 (latitude) and 9 (longitude) bytes.
    #[error("formatted coordinate has the wrong length")]
    InvalidCoordinate,
    /// The comment does not fit in the information field.
    #[error("comment of {0} bytes does not fit the information field")]
    CommentTooLong(usize),
}

/// Result type returned by radio and transmitter operations.
pub type Result<T, E> = core::result::Result<T, Error<E>>;
