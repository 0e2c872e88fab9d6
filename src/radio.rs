//! SX1278 register programming for direct (continuous) FSK transmission.
//!
//! This module converts physical-unit requests (carrier in Hz, deviation in Hz,
//! power in dBm) into the chip's fixed-point register values and writes them
//! over an [`embedded_hal::spi::SpiDevice`].
//!
//! ## Register math
//!
//! The synthesizer step is `F_xosc / 2^19`, about 61 Hz with a 32 MHz crystal:
//!
//! ```text
//! Frf  = ((f + correction) << 19) / F_xosc     (24 bits, MSB/MID/LSB)
//! Fdev = deviation / (F_xosc >> 19)            (14 bits)
//! ```
//!
//! In fast-hop mode the deviation register is zeroed and the tone is produced
//! by rewriting the carrier between two values. [`Sx1278::set_tx_deviation`]
//! returns both register values as a [`HopPair`]. Usually they differ only in
//! `RegFrfLsb`; when the pair straddles a byte boundary the upper bytes are
//! rewritten too. The chip applies a new carrier when `RegFrfLsb` is written,
//! so the upper bytes are written first.
//!
//! ## Bus errors
//!
//! Every register access during setup returns [`Error::Bus`] on failure. The
//! chip has no status register checked here, so a radio that is absent but
//! acknowledges SPI transfers produces a silently broken transmission.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

use crate::config::{ModulationMode, RadioConfig};
use crate::error::{Error, Result};

/// Register addresses.
pub mod reg {
    /// Operating mode.
    pub const OP_MODE: u8 = 0x01;
    /// Frequency deviation, bits 13-8.
    pub const FDEV_MSB: u8 = 0x04;
    /// Frequency deviation, bits 7-0.
    pub const FDEV_LSB: u8 = 0x05;
    /// Carrier frequency, bits 23-16.
    pub const FRF_MSB: u8 = 0x06;
    /// Carrier frequency, bits 15-8.
    pub const FRF_MID: u8 = 0x07;
    /// Carrier frequency, bits 7-0.
    pub const FRF_LSB: u8 = 0x08;
    /// PA selection and output power.
    pub const PA_CONFIG: u8 = 0x09;
    /// Packet mode, IO home and beacon control.
    pub const PACKET_CONFIG2: u8 = 0x31;
    /// Image calibration and temperature monitor control.
    pub const IMAGE_CAL: u8 = 0x3b;
    /// Internal temperature reading.
    pub const TEMP: u8 = 0x3c;
    /// Fast frequency hopping control.
    pub const PLL_HOP: u8 = 0x44;
    /// High power PA_BOOST settings.
    pub const PA_DAC: u8 = 0x4d;
}

const WRITE_FLAG: u8 = 0x80;
const READ_MASK: u8 = 0x7f;

/// FSK mode, FSK modulation, low frequency range, transmitter on.
const OP_MODE_FSK_TX_LF: u8 = 0x0b;
/// FSK mode, sleep.
const OP_MODE_SLEEP: u8 = 0x08;
/// Continuous mode, IO home and beacon off.
const PACKET_CONFIG2_CONTINUOUS: u8 = 0x00;
/// Fast hop on, default PLL settings.
const PLL_HOP_FAST: u8 = 0xad;
const PA_DAC_BOOST: u8 = 0x87;
const PA_DAC_DEFAULT: u8 = 0x84;
/// PA_BOOST output with maximum Pmax; the low nibble is the output power.
const PA_CONFIG_BOOST: u8 = 0xf0;
const IMAGE_CAL_TEMP_ON: u8 = 0x82;
const IMAGE_CAL_TEMP_OFF: u8 = 0x83;
const TEMP_SETTLE_US: u32 = 140;

/// Highest power reachable without PA boost.
const MAX_POWER_NO_BOOST_DBM: u8 = 15;

/// The two carrier register values toggled in fast-hop mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct HopPair {
    /// Carrier register for `f - deviation / 2`.
    pub low: u32,
    /// Carrier register for `f + deviation / 2`.
    pub high: u32,
}

impl HopPair {
    /// Highest carrier register that differs between the two tones.
    ///
    /// Each tone change rewrites this register and the ones below it, down to
    /// [`reg::FRF_LSB`].
    pub fn first_register(&self) -> u8 {
        let diff = self.low ^ self.high;
        if diff >> 16 != 0 {
            reg::FRF_MSB
        } else if diff >> 8 != 0 {
            reg::FRF_MID
        } else {
            reg::FRF_LSB
        }
    }
}

/// SX1278 transmitter over SPI.
#[derive(Debug)]
pub struct Sx1278<SPI> {
    spi: SPI,
    config: RadioConfig,
    temperature: Option<i16>,
}

impl<SPI: SpiDevice> Sx1278<SPI> {
    /// Wraps an SPI device. Nothing is written until the first request.
    pub fn new(spi: SPI, config: RadioConfig) -> Self {
        Self {
            spi,
            config,
            temperature: None,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Returns the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Writes one register.
    pub fn write_register(&mut self, address: u8, value: u8) -> Result<(), SPI::Error> {
        self.spi
            .write(&[address | WRITE_FLAG, value])
            .map_err(Error::Bus)
    }

    /// Reads one register.
    pub fn read_register(&mut self, address: u8) -> Result<u8, SPI::Error> {
        let mut buf = [address & READ_MASK, 0];
        self.spi.transfer_in_place(&mut buf).map_err(Error::Bus)?;
        Ok(buf[1])
    }

    /// Carrier register value for `freq_hz`, correction applied.
    pub fn frequency_register(&self, freq_hz: u32) -> u32 {
        let corrected = (i64::from(freq_hz) + i64::from(self.config.frequency_correction_hz)).max(0);
        ((corrected << 19) / i64::from(self.config.crystal_hz.max(1))) as u32
    }

    /// Tunes the carrier and returns the register value written.
    pub fn set_tx_frequency(&mut self, freq_hz: u32) -> Result<u32, SPI::Error> {
        let frf = self.frequency_register(freq_hz);
        self.write_register(reg::FRF_MSB, (frf >> 16) as u8)?;
        self.write_register(reg::FRF_MID, (frf >> 8) as u8)?;
        self.write_register(reg::FRF_LSB, frf as u8)?;
        Ok(frf)
    }

    /// Programs the deviation for the configured modulation.
    ///
    /// With DIO2 modulation the FSK deviation register is set and `None` is
    /// returned. With fast hop the deviation register is cleared and the carrier
    /// registers for `freq_hz ± deviation_hz / 2` are returned.
    pub fn set_tx_deviation(
        &mut self,
        freq_hz: u32,
        deviation_hz: u32,
    ) -> Result<Option<HopPair>, SPI::Error> {
        match self.config.modulation {
            ModulationMode::Dio2 => {
                let step = (self.config.crystal_hz >> 19).max(1);
                let fdev = deviation_hz / step;
                self.write_register(reg::FDEV_MSB, ((fdev >> 8) & 0x3f) as u8)?;
                self.write_register(reg::FDEV_LSB, fdev as u8)?;
                Ok(None)
            }
            ModulationMode::FastHop => {
                self.write_register(reg::FDEV_MSB, 0)?;
                self.write_register(reg::FDEV_LSB, 0)?;
                let pair = HopPair {
                    low: self.frequency_register(freq_hz.saturating_sub(deviation_hz / 2)),
                    high: self.frequency_register(freq_hz.saturating_add(deviation_hz / 2)),
                };
                if pair.first_register() != reg::FRF_LSB {
                    debug!(
                        "hop pair {}..{} straddles a byte boundary, hopping from register {}",
                        pair.low,
                        pair.high,
                        pair.first_register()
                    );
                }
                Ok(Some(pair))
            }
        }
    }

    /// Sets the PA output power. Nothing is written if the request is invalid.
    pub fn set_tx_power(&mut self, power_dbm: u8, boost: bool) -> Result<(), SPI::Error> {
        check_power::<SPI::Error>(power_dbm, boost)?;
        let (dac, out) = if boost {
            (PA_DAC_BOOST, power_dbm - 5)
        } else {
            (PA_DAC_DEFAULT, power_dbm - 2)
        };
        self.write_register(reg::PA_DAC, dac)?;
        self.write_register(reg::PA_CONFIG, PA_CONFIG_BOOST | out)
    }

    /// Reads the internal temperature sensor, in °C.
    ///
    /// The chip must be in FSK mode. The reading is relative and uncalibrated;
    /// [`RadioConfig::temperature_offset`] shifts it.
    pub fn measure_internal_temperature<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<i16, SPI::Error> {
        self.write_register(reg::IMAGE_CAL, IMAGE_CAL_TEMP_ON)?;
        delay.delay_us(TEMP_SETTLE_US);
        self.write_register(reg::IMAGE_CAL, IMAGE_CAL_TEMP_OFF)?;
        let raw = self.read_register(reg::TEMP)?;
        let temperature = i16::from((255 - raw) as i8) + self.config.temperature_offset;
        debug!("internal temperature {} C", temperature);
        self.temperature = Some(temperature);
        Ok(temperature)
    }

    /// Last temperature read by [`Sx1278::measure_internal_temperature`].
    pub fn internal_temperature(&self) -> Option<i16> {
        self.temperature
    }

    /// Puts the chip in continuous FSK transmit mode on `freq_hz`.
    ///
    /// PA boost is used above 15 dBm. The power request is validated before
    /// any register is touched. Returns the hop pair in fast-hop mode.
    pub fn enable_direct_tx<D: DelayNs>(
        &mut self,
        freq_hz: u32,
        power_dbm: u8,
        deviation_hz: u32,
        delay: &mut D,
    ) -> Result<Option<HopPair>, SPI::Error> {
        let boost = power_dbm > MAX_POWER_NO_BOOST_DBM;
        check_power::<SPI::Error>(power_dbm, boost)?;

        let frf = self.set_tx_frequency(freq_hz)?;
        self.write_register(reg::PACKET_CONFIG2, PACKET_CONFIG2_CONTINUOUS)?;
        self.write_register(reg::OP_MODE, OP_MODE_FSK_TX_LF)?;
        if self.config.modulation == ModulationMode::FastHop {
            self.write_register(reg::PLL_HOP, PLL_HOP_FAST)?;
        }
        let _ = self.measure_internal_temperature(delay)?;
        self.set_tx_power(power_dbm, boost)?;
        let hop = self.set_tx_deviation(freq_hz, deviation_hz)?;

        debug!(
            "tx enabled: {} Hz (frf {}), {} dBm, {} Hz deviation",
            freq_hz,
            frf,
            power_dbm,
            deviation_hz
        );
        Ok(hop)
    }

    /// Puts the chip to sleep.
    pub fn sleep(&mut self) -> Result<(), SPI::Error> {
        self.write_register(reg::OP_MODE, OP_MODE_SLEEP)
    }

    /// Rewrites the carrier from register `first` down to the LSB, which
    /// commits the change. Used mid-frame, so bus errors are ignored.
    pub(crate) fn hop_to(&mut self, frf: u32, first: u8) {
        for address in first..=reg::FRF_LSB {
            let shift = 8 * u32::from(reg::FRF_LSB - address);
            let _ = self.write_register(address, (frf >> shift) as u8);
        }
    }
}

/// Rejects power requests the selected PA path cannot produce.
pub(crate) fn check_power<E>(power_dbm: u8, boost: bool) -> Result<(), E> {
    let valid = if boost {
        (5..=20).contains(&power_dbm)
    } else {
        (2..=MAX_POWER_NO_BOOST_DBM).contains(&power_dbm)
    };
    if valid {
        Ok(())
    } else {
        warn!("rejected power {} dBm (boost: {})", power_dbm, boost);
        Err(Error::PowerOutOfRange {
            dbm: power_dbm,
            boost,
        })
    }
}
