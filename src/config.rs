//! Board and station configuration.
//!
//! [`RadioConfig`] carries everything the register programmer and tone
//! generator need to know about a particular board: crystal, frequency
//! correction, output power, deviation, modulation strategy and the calibrated
//! tone timing. [`AprsConfig`] carries the station identity used in every frame.
//!
//! The `Default` impls reproduce the reference board (32 MHz crystal, DIO2
//! modulation, 17 dBm, 3 kHz deviation) and a placeholder `N0CALL` identity.

use crate::ax25::Address;
use crate::consts::{
    AFSK_MARK_HZ, AFSK_SPACE_HZ, APRS_DESTINATION_CALLSIGN, APRS_DIGIPEATER_CALLSIGN,
    APRS_DIGIPEATER_SSID, APRS_FLAGS_AT_BEGINNING, APRS_FLAGS_AT_END, APRS_POSITION_SSID,
    APRS_SYMBOL, APRS_SYMBOL_OVERLAY, DIO2_MARK_DELAY_US, DIO2_SPACE_DELAY_US,
    FHOP_MARK_DELAY_US, FHOP_SPACE_DELAY_US, SX1278_CRYSTAL_HZ, SX1278_DEVIATION_HZ,
    SX1278_DIO2_CORRECTION_HZ, SX1278_FHOP_CORRECTION_HZ, SX1278_TEMP_OFFSET,
    SX1278_TX_POWER_DBM,
};

/// How the AFSK tones are put on the carrier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ModulationMode {
    /// The chip's FSK modulator is driven directly through the DIO2 pin.
    #[default]
    Dio2,
    /// The carrier is rewritten between two hop frequencies.
    /// The deviation register is set to zero.
    FastHop,
}

/// Half periods of the two tones, in microseconds.
///
/// A mark symbol is one full cycle at `mark_half_period_us`, a space symbol two
/// cycles at `space_half_period_us`, so both last one bit period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ToneTiming {
    /// Delay between edges of the mark tone.
    pub mark_half_period_us: u32,
    /// Delay between edges of the space tone.
    pub space_half_period_us: u32,
}

impl ToneTiming {
    /// Timing calibrated on the reference board for `mode`.
    ///
    /// These are shorter than the nominal values to make up for the time spent
    /// toggling the pin or writing the register.
    pub const fn calibrated(mode: ModulationMode) -> Self {
        match mode {
            ModulationMode::Dio2 => Self {
                mark_half_period_us: DIO2_MARK_DELAY_US,
                space_half_period_us: DIO2_SPACE_DELAY_US,
            },
            ModulationMode::FastHop => Self {
                mark_half_period_us: FHOP_MARK_DELAY_US,
                space_half_period_us: FHOP_SPACE_DELAY_US,
            },
        }
    }

    /// Ideal half periods for the given tones, with no allowance for overhead.
    pub fn nominal(mark_hz: u32, space_hz: u32) -> Self {
        Self {
            mark_half_period_us: half_period_us(mark_hz),
            space_half_period_us: half_period_us(space_hz),
        }
    }
}

impl Default for ToneTiming {
    fn default() -> Self {
        Self::calibrated(ModulationMode::default())
    }
}

/// Half period of a square wave at `tone_hz`, rounded to the nearest microsecond.
pub fn half_period_us(tone_hz: u32) -> u32 {
    if tone_hz == 0 {
        return 0;
    }
    libm::round(1_000_000.0 / (2.0 * f64::from(tone_hz))) as u32
}

/// Radio chip and modulation settings for one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RadioConfig {
    /// Reference crystal frequency.
    pub crystal_hz: u32,
    /// Added to every requested frequency before conversion to a register value.
    pub frequency_correction_hz: i32,
    /// Transmit power used by [`crate::driver::Transmitter`].
    pub power_dbm: u8,
    /// FSK deviation used by [`crate::driver::Transmitter`].
    pub deviation_hz: u32,
    /// Tone strategy.
    pub modulation: ModulationMode,
    /// Added to the raw internal temperature reading.
    pub temperature_offset: i16,
    /// Tone half periods.
    pub timing: ToneTiming,
}

impl RadioConfig {
    /// Reference board settings for `mode`, including its correction and calibrated timing.
    pub const fn for_mode(mode: ModulationMode) -> Self {
        let frequency_correction_hz = match mode {
            ModulationMode::Dio2 => SX1278_DIO2_CORRECTION_HZ,
            ModulationMode::FastHop => SX1278_FHOP_CORRECTION_HZ,
        };
        Self {
            crystal_hz: SX1278_CRYSTAL_HZ,
            frequency_correction_hz,
            power_dbm: SX1278_TX_POWER_DBM,
            deviation_hz: SX1278_DEVIATION_HZ,
            modulation: mode,
            temperature_offset: SX1278_TEMP_OFFSET,
            timing: ToneTiming::calibrated(mode),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::for_mode(ModulationMode::default())
    }
}

const fn address(callsign: &str, ssid: u8) -> Address {
    match Address::new(callsign, ssid) {
        Ok(address) => address,
        Err(_) => panic!("invalid built-in address"),
    }
}

/// Station identity and framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct AprsConfig {
    /// Our callsign. The SSID is the one used for position reports.
    pub source: Address,
    /// Destination address, conventionally the software identifier.
    pub destination: Address,
    /// Optional digipeater path.
    pub digipeater: Option<Address>,
    /// Symbol table identifier placed between latitude and longitude.
    pub symbol_table: u8,
    /// Symbol code placed after the longitude.
    pub symbol: u8,
    /// Flags sent before the frame while the transmitter settles.
    pub lead_in_flags: u8,
    /// Flags sent after the FCS.
    pub trailing_flags: u8,
}

impl AprsConfig {
    /// Placeholder callsign used by `Default`. Replace it with a licensed one.
    pub const DEFAULT_SOURCE: Address = address("N0CALL", APRS_POSITION_SSID);

    /// Default configuration with `source` as our callsign.
    pub fn with_source(source: Address) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }
}

impl Default for AprsConfig {
    fn default() -> Self {
        Self {
            source: Self::DEFAULT_SOURCE,
            destination: address(APRS_DESTINATION_CALLSIGN, 0),
            digipeater: Some(address(APRS_DIGIPEATER_CALLSIGN, APRS_DIGIPEATER_SSID)),
            symbol_table: APRS_SYMBOL_OVERLAY,
            symbol: APRS_SYMBOL,
            lead_in_flags: APRS_FLAGS_AT_BEGINNING,
            trailing_flags: APRS_FLAGS_AT_END,
        }
    }
}

/// Nominal Bell-202 timing derived from [`AFSK_MARK_HZ`] and [`AFSK_SPACE_HZ`].
pub fn nominal_timing() -> ToneTiming {
    ToneTiming::nominal(AFSK_MARK_HZ, AFSK_SPACE_HZ)
}
