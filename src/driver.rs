//! APRS transmitter for SX1278 radios.
//!
//! This module provides the [`Transmitter`] struct, which sequences a complete
//! on-air APRS transmission: it tunes and keys the radio, clocks the frame out
//! through the HDLC encoder and the selected tone strategy, then puts the radio
//! back to sleep.
//!
//! A transmission runs to completion inside one call. Tone timing is produced
//! with busy waits on the supplied [`DelayNs`], so the call blocks for the
//! whole frame (the default 100 lead-in flags alone take about 670 ms).
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! # use embedded_hal_mock::eh1::spi::Mock as Spi;
//! use sx1278_aprs::config::{AprsConfig, RadioConfig};
//! use sx1278_aprs::driver::{Transmitter, TxMode};
//!
//! # let spi = Spi::new(&[]);
//! # let dio2 = Pin::new(&[PinTransaction::set(PinState::Low)]);
//! let mut tx = Transmitter::new(
//!     spi,
//!     Some(dio2),
//!     NoopDelay::new(),
//!     RadioConfig::default(),
//!     AprsConfig::default(),
//! );
//! assert_eq!(tx.mode, TxMode::Idle);
//! // tx.send_position(144_800_000, "4903.50N", "07201.75W", "hello")?;
//! # let (mut spi, dio2, _, _) = tx.release();
//! # spi.done();
//! # if let Some(mut pin) = dio2 {
//! #     pin.done();
//! # }
//! ```
//!
//! ## Design Notes
//!
//! - Requests are validated (frame layout, power range, DIO2 pin presence)
//!   before the CPU clock is raised or any register is written.
//! - Once the lead-in starts, pin and SPI errors are ignored.
//! - With the `critical-section` feature, the frame is emitted inside
//!   [`critical_section::with`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use crate::ax25::{Frame, Payload};
use crate::config::{AprsConfig, ModulationMode, RadioConfig};
use crate::consts::APRS_IMAGE_SSID;
use crate::encoding::encode_frame;
use crate::error::{Error, Result};
use crate::modulator::{DioToggle, FastHop, Modulator};
use crate::radio::{HopPair, Sx1278, check_power};

/// Operational state of the [`Transmitter`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TxMode {
    /// The radio has been put to sleep after a transmission.
    Sleep,
    /// Nothing has been sent yet; the radio is in whatever state it powered up in.
    #[default]
    Idle,
    /// A frame is being keyed.
    Tx,
}

/// Hook for running the MCU faster while a frame is keyed.
///
/// Busy-wait tone timing is more accurate at a higher core clock. The default
/// `()` implementation does nothing.
pub trait CpuClock {
    /// Switches to the clock used while transmitting.
    fn radio_speed(&mut self);
    /// Switches back to the power-saving clock.
    fn normal_speed(&mut self);
}

impl CpuClock for () {
    fn radio_speed(&mut self) {}
    fn normal_speed(&mut self) {}
}

/// Sequences APRS transmissions on an SX1278.
///
/// ## Type Parameters
///
/// - `SPI`: the radio's [`SpiDevice`]
/// - `DIO`: the [`OutputPin`] wired to DIO2, needed for [`ModulationMode::Dio2`]
/// - `D`: a microsecond [`DelayNs`] used for tone timing
/// - `C`: an optional [`CpuClock`] hook
#[derive(Debug)]
pub struct Transmitter<SPI, DIO, D, C = ()> {
    radio: Sx1278<SPI>,
    dio2: Option<DIO>,
    delay: D,
    clock: C,
    aprs: AprsConfig,
    /// Current mode.
    pub mode: TxMode,
    /// Frames keyed to completion.
    pub tx_good: u16,
}

impl<SPI, DIO, D> Transmitter<SPI, DIO, D>
where
    SPI: SpiDevice,
    DIO: OutputPin,
    D: DelayNs,
{
    /// Creates a transmitter without a clock hook.
    pub fn new(
        spi: SPI,
        dio2: Option<DIO>,
        delay: D,
        radio: RadioConfig,
        aprs: AprsConfig,
    ) -> Self {
        Self::with_clock(spi, dio2, delay, (), radio, aprs)
    }
}

impl<SPI, DIO, D, C> Transmitter<SPI, DIO, D, C>
where
    SPI: SpiDevice,
    DIO: OutputPin,
    D: DelayNs,
    C: CpuClock,
{
    /// Creates a transmitter that raises the CPU clock around each frame.
    ///
    /// DIO2 is driven low until the first frame.
    pub fn with_clock(
        spi: SPI,
        mut dio2: Option<DIO>,
        delay: D,
        clock: C,
        radio: RadioConfig,
        aprs: AprsConfig,
    ) -> Self {
        if let Some(pin) = dio2.as_mut() {
            let _ = pin.set_low();
        }
        Self {
            radio: Sx1278::new(spi, radio),
            dio2,
            delay,
            clock,
            aprs,
            mode: TxMode::Idle,
            tx_good: 0,
        }
    }

    /// The radio.
    pub fn radio(&self) -> &Sx1278<SPI> {
        &self.radio
    }

    /// The radio, for register access between transmissions.
    pub fn radio_mut(&mut self) -> &mut Sx1278<SPI> {
        &mut self.radio
    }

    /// Station identity and framing.
    pub fn aprs_config(&self) -> &AprsConfig {
        &self.aprs
    }

    /// Radio temperature measured during the last transmission.
    pub fn internal_temperature(&self) -> Option<i16> {
        self.radio.internal_temperature()
    }

    /// Returns the peripherals.
    pub fn release(self) -> (SPI, Option<DIO>, D, C) {
        (self.radio.release(), self.dio2, self.delay, self.clock)
    }

    /// Sends an uncompressed position report from the configured source.
    ///
    /// `latitude` and `longitude` are preformatted (`4903.50N`, `07201.75W`).
    pub fn send_position(
        &mut self,
        freq_hz: u32,
        latitude: &str,
        longitude: &str,
        comment: &str,
    ) -> Result<(), SPI::Error> {
        let frame = Frame {
            destination: self.aprs.destination,
            source: self.aprs.source,
            digipeater: self.aprs.digipeater,
            payload: Payload::Position {
                latitude,
                symbol_table: self.aprs.symbol_table,
                longitude,
                symbol: self.aprs.symbol,
                comment: comment.as_bytes(),
            },
        };
        self.send(freq_hz, &frame)
    }

    /// Sends a status report.
    ///
    /// Image and trail packets are told apart by their source SSID; image
    /// packets also carry their sequence number in the destination SSID.
    pub fn send_status(
        &mut self,
        freq_hz: u32,
        source_ssid: u8,
        destination_ssid: u8,
        comment: &[u8],
    ) -> Result<(), SPI::Error> {
        let frame = Frame {
            destination: self.aprs.destination.with_ssid(destination_ssid)?,
            source: self.aprs.source.with_ssid(source_ssid)?,
            digipeater: self.aprs.digipeater,
            payload: Payload::Status { comment },
        };
        self.send(freq_hz, &frame)
    }

    /// Sends one image packet as a status report from the image SSID.
    ///
    /// The packet counter travels in the destination SSID, which is four bits
    /// wide, so it wraps every 16 packets.
    pub fn send_image(
        &mut self,
        freq_hz: u32,
        counter: u8,
        data: &[u8],
    ) -> Result<(), SPI::Error> {
        self.send_status(freq_hz, APRS_IMAGE_SSID, counter & 0x0f, data)
    }

    /// Keys `frame` on `freq_hz`.
    ///
    /// The radio is left asleep afterwards, also when setup fails part way.
    pub fn send(&mut self, freq_hz: u32, frame: &Frame<'_>) -> Result<(), SPI::Error> {
        let body = frame.encode()?;
        let config = *self.radio.config();
        if config.modulation == ModulationMode::Dio2 && self.dio2.is_none() {
            warn!("DIO2 modulation without a DIO2 pin");
            return Err(Error::MissingDio2);
        }
        let boost = config.power_dbm > 15;
        check_power::<SPI::Error>(config.power_dbm, boost)?;

        self.clock.radio_speed();
        self.mode = TxMode::Tx;
        info!("sending {} byte frame on {} Hz", body.len(), freq_hz);

        let hop = match self.radio.enable_direct_tx(
            freq_hz,
            config.power_dbm,
            config.deviation_hz,
            &mut self.delay,
        ) {
            Ok(hop) => hop,
            Err(err) => {
                let _ = self.radio.sleep();
                self.finish();
                return Err(err);
            }
        };

        #[cfg(feature = "critical-section")]
        critical_section::with(|_| self.key_frame(&body, hop));
        #[cfg(not(feature = "critical-section"))]
        self.key_frame(&body, hop);

        let slept = self.radio.sleep();
        self.finish();
        self.tx_good = self.tx_good.wrapping_add(1);
        slept
    }

    fn finish(&mut self) {
        self.mode = TxMode::Sleep;
        self.clock.normal_speed();
    }

    fn key_frame(&mut self, body: &[u8], hop: Option<HopPair>) {
        let timing = self.radio.config().timing;
        let (lead_in, trailing) = (self.aprs.lead_in_flags, self.aprs.trailing_flags);
        match (hop, self.dio2.as_mut()) {
            (Some(pair), _) => {
                let output = FastHop::new(&mut self.radio, &mut self.delay, pair);
                let _ = encode_frame(Modulator::new(output, timing), lead_in, body, trailing);
            }
            (None, Some(pin)) => {
                let output = DioToggle::new(pin, &mut self.delay);
                let _ = encode_frame(Modulator::new(output, timing), lead_in, body, trailing);
            }
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ax25::Address;
    use crate::cache::TrailCache;
    use crate::consts::{APRS_CACHE_SSID, APRS_FREQUENCY_BRAZIL, CACHE_LENGTH};
    use crate::encoding::testing::{Recorder, deframe, nrzi_decode};
    use crate::error::FrameError;
    use crate::modulator::testing::RecordingDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    type TestTransmitter<C = ()> = Transmitter<SpiMock<u8>, PinMock, RecordingDelay, C>;

    fn write(address: u8, value: u8) -> [SpiTransaction<u8>; 3] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![address | 0x80, value]),
            SpiTransaction::transaction_end(),
        ]
    }

    fn setup(hop: bool) -> Vec<SpiTransaction<u8>> {
        setup_at(0x24302f, hop)
    }

    fn setup_at(frf: u32, hop: bool) -> Vec<SpiTransaction<u8>> {
        let mut spi = Vec::new();
        for (address, value) in [
            (0x06, (frf >> 16) as u8),
            (0x07, (frf >> 8) as u8),
            (0x08, frf as u8),
            (0x31, 0x00),
            (0x01, 0x0b),
        ] {
            spi.extend(write(address, value));
        }
        if hop {
            spi.extend(write(0x44, 0xad));
        }
        spi.extend(write(0x3b, 0x82));
        spi.extend(write(0x3b, 0x83));
        spi.extend([
            SpiTransaction::transaction_start(),
            SpiTransaction::transfer_in_place(vec![0x3c, 0], vec![0x3c, 0xe0]),
            SpiTransaction::transaction_end(),
        ]);
        spi.extend(write(0x4d, 0x87));
        spi.extend(write(0x09, 0xfc));
        let fdev = if hop { 0 } else { 49 };
        spi.extend(write(0x04, 0));
        spi.extend(write(0x05, fdev));
        spi
    }

    fn aprs() -> AprsConfig {
        AprsConfig {
            source: Address::new("TEST", 0).unwrap(),
            digipeater: None,
            lead_in_flags: 1,
            trailing_flags: 1,
            ..AprsConfig::default()
        }
    }

    fn test_frame() -> Frame<'static> {
        let aprs = aprs();
        Frame {
            destination: aprs.destination,
            source: aprs.source,
            digipeater: None,
            payload: Payload::Position {
                latitude: "4903.50N",
                symbol_table: b'/',
                longitude: "07201.75W",
                symbol: b'O',
                comment: b"hello",
            },
        }
    }

    /// Symbol polarities the frame must produce.
    fn trace(frame: &Frame<'_>) -> Vec<bool> {
        let body = frame.encode().unwrap();
        encode_frame(Recorder::default(), 1, &body, 1).0
    }

    /// DIO2 toggles for a trace, after the initial drive low.
    fn dio2_toggles(trace: &[bool]) -> Vec<PinTransaction> {
        let mut pin = vec![PinTransaction::set(PinState::Low)];
        for _ in 0..cycles(trace) {
            pin.push(PinTransaction::set(PinState::High));
            pin.push(PinTransaction::set(PinState::Low));
        }
        pin
    }

    fn status_frame<'a>(source_ssid: u8, destination_ssid: u8, comment: &'a [u8]) -> Frame<'a> {
        let aprs = aprs();
        Frame {
            destination: aprs.destination.with_ssid(destination_ssid).unwrap(),
            source: aprs.source.with_ssid(source_ssid).unwrap(),
            digipeater: None,
            payload: Payload::Status { comment },
        }
    }

    /// Sends a status report over DIO2 and checks every pin edge.
    fn send_status_over_dio2<E: core::fmt::Debug + PartialEq>(
        expected: &Frame<'_>,
        send: impl FnOnce(&mut TestTransmitter) -> Result<(), E>,
    ) {
        let trace = trace(expected);
        let mut spi = setup(false);
        spi.extend(write(0x01, 0x08));

        let mut tx: TestTransmitter = Transmitter::new(
            SpiMock::new(&spi),
            Some(PinMock::new(&dio2_toggles(&trace))),
            RecordingDelay::default(),
            RadioConfig::default(),
            aprs(),
        );
        assert_eq!(send(&mut tx), Ok(()));
        assert_eq!(tx.tx_good, 1);

        let (mut spi, pin, delay, _) = tx.release();
        spi.done();
        pin.unwrap().done();
        assert_eq!(delay.0.len(), 1 + 2 * cycles(&trace));
    }

    fn cycles(trace: &[bool]) -> usize {
        trace.iter().map(|&p| if p { 1 } else { 2 }).sum()
    }

    #[derive(Debug, Default)]
    struct ClockLog(Vec<&'static str>);

    impl CpuClock for ClockLog {
        fn radio_speed(&mut self) {
            self.0.push("radio");
        }

        fn normal_speed(&mut self) {
            self.0.push("normal");
        }
    }

    #[test]
    fn test_trace_decodes_to_reference_frame() {
        let frame = test_frame();
        let frames = deframe(&nrzi_decode(&trace(&frame), true));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_slice(), frame.to_bytes().unwrap().as_slice());
    }

    #[test]
    fn test_new_drives_dio2_low() {
        let pin = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let tx: TestTransmitter = Transmitter::new(
            SpiMock::new(&[]),
            Some(pin),
            RecordingDelay::default(),
            RadioConfig::default(),
            aprs(),
        );
        assert_eq!(tx.mode, TxMode::Idle);
        assert_eq!(tx.tx_good, 0);
        let (mut spi, pin, _, _) = tx.release();
        spi.done();
        pin.unwrap().done();
    }

    #[test]
    fn test_send_position_over_dio2() {
        let frame = test_frame();
        let trace = trace(&frame);

        let pin = dio2_toggles(&trace);
        let mut spi = setup(false);
        spi.extend(write(0x01, 0x08));

        let mut tx = Transmitter::with_clock(
            SpiMock::new(&spi),
            Some(PinMock::new(&pin)),
            RecordingDelay::default(),
            ClockLog::default(),
            RadioConfig::default(),
            aprs(),
        );
        assert_eq!(
            tx.send_position(144_800_000, "4903.50N", "07201.75W", "hello"),
            Ok(())
        );
        assert_eq!(tx.mode, TxMode::Sleep);
        assert_eq!(tx.tx_good, 1);
        assert_eq!(tx.internal_temperature(), Some(46));

        let (mut spi, pin, delay, clock) = tx.release();
        spi.done();
        pin.unwrap().done();
        assert_eq!(clock.0, vec!["radio", "normal"]);
        assert_eq!(delay.0[0], 140);
        assert_eq!(delay.0.len(), 1 + 2 * cycles(&trace));
        assert!(delay.0[1..].iter().all(|&us| us == 412 || us == 206));
    }

    #[test]
    fn test_send_over_fast_hop() {
        let frame = test_frame();
        let trace = trace(&frame);

        let mut spi = setup(true);
        for _ in 0..cycles(&trace) {
            spi.extend(write(0x08, 0x17));
            spi.extend(write(0x08, 0x48));
        }
        spi.extend(write(0x01, 0x08));

        let config = RadioConfig {
            frequency_correction_hz: -47_078,
            ..RadioConfig::for_mode(ModulationMode::FastHop)
        };
        let mut tx: TestTransmitter =
            Transmitter::new(SpiMock::new(&spi), None, RecordingDelay::default(), config, aprs());
        assert_eq!(tx.send(144_800_000, &frame), Ok(()));
        assert_eq!(tx.tx_good, 1);

        let (mut spi, _, delay, _) = tx.release();
        spi.done();
        assert!(delay.0[1..].iter().all(|&us| us == 390 || us == 195));
    }

    #[test]
    fn test_rejects_before_touching_the_radio() {
        let mut tx = Transmitter::with_clock(
            SpiMock::new(&[]),
            None::<PinMock>,
            RecordingDelay::default(),
            ClockLog::default(),
            RadioConfig::default(),
            aprs(),
        );
        assert_eq!(
            tx.send_position(144_800_000, "4903.50N", "07201.75W", ""),
            Err(Error::MissingDio2)
        );
        assert_eq!(
            tx.send_position(144_800_000, "4903.5N", "07201.75W", ""),
            Err(Error::Frame(FrameError::InvalidCoordinate))
        );
        assert_eq!(
            tx.send_status(144_800_000, 16, 0, b""),
            Err(Error::Frame(FrameError::InvalidSsid(16)))
        );
        assert_eq!(tx.mode, TxMode::Idle);
        assert_eq!(tx.tx_good, 0);

        let (mut spi, _, delay, clock) = tx.release();
        spi.done();
        assert!(delay.0.is_empty());
        assert!(clock.0.is_empty());
    }

    #[test]
    fn test_rejects_invalid_power() {
        let config = RadioConfig {
            power_dbm: 25,
            ..RadioConfig::default()
        };
        let pin = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut tx: TestTransmitter =
            Transmitter::new(SpiMock::new(&[]), Some(pin), RecordingDelay::default(), config, aprs());
        assert_eq!(
            tx.send(144_800_000, &test_frame()),
            Err(Error::PowerOutOfRange {
                dbm: 25,
                boost: true
            })
        );
        let (mut spi, pin, _, _) = tx.release();
        spi.done();
        pin.unwrap().done();
    }

    #[test]
    fn test_status_addresses() {
        let tx: TestTransmitter = Transmitter::new(
            SpiMock::new(&[]),
            None,
            RecordingDelay::default(),
            RadioConfig::for_mode(ModulationMode::FastHop),
            aprs(),
        );
        let aprs = tx.aprs_config();
        let frame = Frame {
            destination: aprs.destination.with_ssid(5).unwrap(),
            source: aprs.source.with_ssid(APRS_IMAGE_SSID).unwrap(),
            digipeater: aprs.digipeater,
            payload: Payload::Status { comment: b"" },
        };
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes[6], 0x6a);
        assert_eq!(bytes[13], 0x6f);
        assert_eq!(aprs.source.with_ssid(APRS_CACHE_SSID).unwrap().ssid(), 9);
        let (mut spi, _, _, _) = tx.release();
        spi.done();
    }

    #[test]
    fn test_fast_hop_across_byte_boundary() {
        let frame = test_frame();
        let trace = trace(&frame);

        let mut spi = setup_at(0x2460e8, true);
        for _ in 0..cycles(&trace) {
            for (address, value) in [(0x07, 0x60), (0x08, 0xd0), (0x07, 0x61), (0x08, 0x01)] {
                spi.extend(write(address, value));
            }
        }
        spi.extend(write(0x01, 0x08));

        let mut tx: TestTransmitter = Transmitter::new(
            SpiMock::new(&spi),
            None,
            RecordingDelay::default(),
            RadioConfig::for_mode(ModulationMode::FastHop),
            aprs(),
        );
        assert_eq!(tx.send(APRS_FREQUENCY_BRAZIL, &frame), Ok(()));
        assert_eq!(tx.tx_good, 1);

        let (mut spi, _, _, _) = tx.release();
        spi.done();
    }

    #[test]
    fn test_image_counter_wraps_into_destination_ssid() {
        let expected = status_frame(APRS_IMAGE_SSID, 0, b"img packet 16");
        send_status_over_dio2(&expected, |tx| {
            tx.send_image(144_800_000, 16, b"img packet 16")
        });

        let expected = status_frame(APRS_IMAGE_SSID, 13, b"img packet 45");
        send_status_over_dio2(&expected, |tx| {
            tx.send_image(144_800_000, 45, b"img packet 45")
        });
    }

    #[test]
    fn test_send_full_trail() {
        let mut cache = TrailCache::<CACHE_LENGTH>::new();
        for i in 0..300u16 {
            let _ = cache.push(b'!' + (i % 90) as u8);
        }
        let payload = cache.payload();
        assert_eq!(payload.len(), CACHE_LENGTH + 3);

        let expected = status_frame(APRS_CACHE_SSID, 0, &payload);
        send_status_over_dio2(&expected, |tx| {
            tx.send_status(144_800_000, APRS_CACHE_SSID, 0, &payload)
        });
    }
}
