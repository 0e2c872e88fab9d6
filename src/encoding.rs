//! HDLC bitstream encoding for AX.25 frames.
//!
//! This module turns bytes into the on-air symbol sequence: every bit goes
//! through the running frame check sequence, then through bit stuffing and
//! NRZI before it is handed to a [`SymbolSink`], which realizes it as a tone.
//!
//! ## Purpose
//!
//! A receiver finds frame boundaries by looking for the flag `0x7E`
//! (`01111110`). To keep that pattern unique, a zero is stuffed after any five
//! consecutive ones in frame data. NRZI then maps a zero to a change of tone and
//! a one to no change, so the receiver never has to know the absolute tone.
//!
//! ## State
//!
//! [`FrameEncoder`] owns all per-frame state:
//!
//! - the CRC-16/CCITT accumulator, reset per frame with [`FrameEncoder::reset_crc`]
//! - the run counter of consecutive ones
//! - the current tone polarity, which is only ever flipped, never reset mid-frame
//!
//! One encoder is built per transmission and dropped afterwards.
//!
//! ## Limitations
//!
//! - Flags are never stuffed, so passing `is_flag = true` for frame data will
//!   produce an undecodable frame.

use crate::consts::{AX25_FLAG, AX25_MAX_ONES, CRC_CCITT_INIT};
use crate::crc::crc_ccitt_update_bit;

/// Consumer of encoded symbols.
///
/// Each call carries the polarity of one output bit. `true` is the mark tone,
/// `false` the space tone.
pub trait SymbolSink {
    /// Emits one bit period at the given polarity.
    fn emit(&mut self, polarity: bool);
}

impl<S: SymbolSink + ?Sized> SymbolSink for &mut S {
    fn emit(&mut self, polarity: bool) {
        (**self).emit(polarity);
    }
}

/// Bit stuffing, NRZI and FCS state for one frame.
#[derive(Debug)]
pub struct FrameEncoder<S> {
    sink: S,
    crc: u16,
    ones: u8,
    polarity: bool,
}

impl<S: SymbolSink> FrameEncoder<S> {
    /// Creates an encoder on top of `sink`, starting on the mark tone.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            crc: CRC_CCITT_INIT,
            ones: 0,
            polarity: true,
        }
    }

    /// Resets the frame check accumulator. Call after the opening flags.
    pub fn reset_crc(&mut self) {
        self.crc = CRC_CCITT_INIT;
    }

    /// Current value of the frame check accumulator.
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Polarity of the last emitted symbol.
    pub fn polarity(&self) -> bool {
        self.polarity
    }

    /// Emits one byte, least significant bit first.
    ///
    /// Flags bypass bit stuffing. Every bit, flag or not, is fed to the CRC; the
    /// accumulator is reset after the opening flags so only frame content counts.
    pub fn emit_byte(&mut self, value: u8, is_flag: bool) {
        let mut byte = value;
        for _ in 0..8 {
            let bit = byte & 0x01 != 0;
            self.crc = crc_ccitt_update_bit(self.crc, bit);

            if bit {
                self.sink.emit(self.polarity);
                self.ones += 1;

                if self.ones >= AX25_MAX_ONES && !is_flag {
                    // Stuffed zero
                    self.polarity = !self.polarity;
                    self.sink.emit(self.polarity);
                    self.ones = 0;
                }
            } else {
                self.polarity = !self.polarity;
                self.sink.emit(self.polarity);
                self.ones = 0;
            }

            byte >>= 1;
        }
    }

    /// Emits `count` flags.
    pub fn emit_flag(&mut self, count: u8) {
        for _ in 0..count {
            self.emit_byte(AX25_FLAG, true);
        }
    }

    /// Emits a buffer of frame data. Zero bytes are sent like any other.
    pub fn emit_string(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.emit_byte(byte, false);
        }
    }

    /// Emits the complemented accumulator, low byte first.
    pub fn emit_crc(&mut self) {
        let crc = self.crc;
        self.emit_byte(!(crc as u8), false);
        self.emit_byte(!((crc >> 8) as u8), false);
    }

    /// Returns the sink.
    pub fn into_inner(self) -> S {
        self.sink
    }
}

/// Emits a complete frame: `lead_in` flags, `body` with its FCS, then
/// `trailing` flags. Returns the sink.
pub fn encode_frame<S: SymbolSink>(sink: S, lead_in: u8, body: &[u8], trailing: u8) -> S {
    let mut encoder = FrameEncoder::new(sink);
    encoder.emit_flag(lead_in);
    encoder.reset_crc();
    encoder.emit_string(body);
    encoder.emit_crc();
    encoder.emit_flag(trailing);
    encoder.into_inner()
}
