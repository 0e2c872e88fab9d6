//! Tone generation for Bell-202 style AFSK.
//!
//! [`Modulator`] turns each symbol polarity from the frame encoder into a timed
//! square wave: one cycle at the mark half period for `true`, two cycles at the
//! space half period for `false`. Both take one bit period (about 833 µs).
//!
//! The square wave itself is produced by a [`ToneOutput`] strategy:
//!
//! - [`DioToggle`] drives the SX1278 DIO2 pin, which the chip's FSK modulator
//!   turns into a frequency shift set by the deviation register.
//! - [`FastHop`] rewrites the carrier registers between two hop frequencies.
//!
//! Timing is open loop busy waiting. Anything that stretches a delay, such as
//! an interrupt, distorts the tone; enable the `critical-section` feature to
//! emit frames with interrupts masked.

mod dio;
mod hop;

pub use dio::DioToggle;
pub use hop::FastHop;

use crate::config::ToneTiming;
use crate::encoding::SymbolSink;

/// One square-wave cycle generator.
pub trait ToneOutput {
    /// Outputs one full cycle: high for `half_period_us`, then low for the same.
    fn cycle(&mut self, half_period_us: u32);
}

impl<T: ToneOutput + ?Sized> ToneOutput for &mut T {
    fn cycle(&mut self, half_period_us: u32) {
        (**self).cycle(half_period_us);
    }
}

/// Maps symbol polarities to mark and space tones.
#[derive(Debug)]
pub struct Modulator<T> {
    output: T,
    timing: ToneTiming,
}

impl<T: ToneOutput> Modulator<T> {
    /// Creates a modulator over `output`.
    pub fn new(output: T, timing: ToneTiming) -> Self {
        Self { output, timing }
    }

    /// Tone timing in use.
    pub fn timing(&self) -> ToneTiming {
        self.timing
    }

    /// Returns the tone output.
    pub fn into_inner(self) -> T {
        self.output
    }
}

impl<T: ToneOutput> SymbolSink for Modulator<T> {
    fn emit(&mut self, polarity: bool) {
        if polarity {
            self.output.cycle(self.timing.mark_half_period_us);
        } else {
            self.output.cycle(self.timing.space_half_period_us);
            self.output.cycle(self.timing.space_half_period_us);
        }
    }
}
