//! Position report comment with flight telemetry.
//!
//! Rendered as
//!
//! ```text
//! CCC/SSS/A=AAAAAA/F<flight>N<counter>T<temp>E<mcu>Y<solar>S<sats>_<extra>
//! ```
//!
//! where `CCC/SSS` is course in degrees and speed in knots (the APRS
//! course/speed extension), `A=` the altitude in feet, and the remaining
//! fields are free-form telemetry decoded by the ground software. The `_`
//! separator is always present, also when `extra` is empty.

use core::fmt::{self, Write};

use heapless::String;

use crate::consts::APRS_MAX_POSITION_COMMENT_LEN;
use crate::error::FrameError;

const FEET_PER_METRE: f64 = 3.28084;

/// One telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry<'a> {
    /// Course over ground, degrees.
    pub course_deg: u16,
    /// Speed over ground, knots.
    pub speed_knots: u16,
    /// GNSS altitude, metres.
    pub altitude_m: f32,
    /// Flight number.
    pub flight: u16,
    /// Packet counter.
    pub counter: u16,
    /// Temperature, °C.
    pub temperature_c: i16,
    /// MCU supply voltage, hundredths of a volt.
    pub mcu_voltage: u16,
    /// Solar panel voltage, hundredths of a volt.
    pub solar_voltage: u16,
    /// Satellites used in the fix.
    pub satellites: u8,
    /// Free text appended after `_`, may be empty.
    pub extra: &'a str,
}

impl Telemetry<'_> {
    /// Altitude in whole feet, truncated.
    pub fn altitude_ft(&self) -> i32 {
        (f64::from(self.altitude_m) * FEET_PER_METRE) as i32
    }

    /// Renders the comment, rejecting it if it would not fit a position report.
    pub fn comment(&self) -> Result<String<APRS_MAX_POSITION_COMMENT_LEN>, FrameError> {
        let mut out = String::new();
        if write!(out, "{self}").is_err() {
            let mut counter = LengthCounter(0);
            let _ = write!(counter, "{self}");
            return Err(FrameError::CommentTooLong(counter.0));
        }
        Ok(out)
    }
}

impl fmt::Display for Telemetry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03}/{:03}/A={:06}/F{}N{}T{}E{}Y{}S{}_{}",
            self.course_deg,
            self.speed_knots,
            self.altitude_ft(),
            self.flight,
            self.counter,
            self.temperature_c,
            self.mcu_voltage,
            self.solar_voltage,
            self.satellites,
            self.extra
        )
    }
}

struct LengthCounter(usize);

impl Write for LengthCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}
