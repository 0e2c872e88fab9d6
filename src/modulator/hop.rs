use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

use super::ToneOutput;
use crate::radio::{HopPair, Sx1278};

/// Produces the tone by switching the carrier between two hop frequencies.
///
/// The chip must be in fast-hop mode with zero deviation. Only the carrier
/// bytes that differ between the pair are rewritten, normally just
/// `RegFrfLsb`. A pair straddling a byte boundary also rewrites `RegFrfMid`,
/// which doubles the bus traffic per transition.
#[derive(Debug)]
pub struct FastHop<'a, SPI, D> {
    radio: &'a mut Sx1278<SPI>,
    delay: &'a mut D,
    pair: HopPair,
    first: u8,
}

impl<'a, SPI: SpiDevice, D: DelayNs> FastHop<'a, SPI, D> {
    /// Borrows the radio and delay for the duration of a frame.
    pub fn new(radio: &'a mut Sx1278<SPI>, delay: &'a mut D, pair: HopPair) -> Self {
        Self {
            radio,
            delay,
            pair,
            first: pair.first_register(),
        }
    }
}

impl<SPI: SpiDevice, D: DelayNs> ToneOutput for FastHop<'_, SPI, D> {
    fn cycle(&mut self, half_period_us: u32) {
        self.radio.hop_to(self.pair.low, self.first);
        self.delay.delay_us(half_period_us);
        self.radio.hop_to(self.pair.high, self.first);
        self.delay.delay_us(half_period_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RadioConfig;
    use crate::modulator::testing::RecordingDelay;
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    fn writes(registers: &[(u8, u8)]) -> Vec<SpiTransaction<u8>> {
        let mut expectations = Vec::new();
        for &(address, value) in registers {
            expectations.extend([
                SpiTransaction::transaction_start(),
                SpiTransaction::write_vec(vec![address | 0x80, value]),
                SpiTransaction::transaction_end(),
            ]);
        }
        expectations
    }

    #[test]
    fn test_cycle_writes_low_then_high_lsb() {
        let expectations = writes(&[(0x08, 0x17), (0x08, 0x48)]);
        let mut radio = Sx1278::new(SpiMock::new(&expectations), RadioConfig::default());
        let mut delay = RecordingDelay::default();
        {
            let pair = HopPair {
                low: 0x243017,
                high: 0x243048,
            };
            let mut output = FastHop::new(&mut radio, &mut delay, pair);
            output.cycle(390);
        }
        assert_eq!(delay.0, vec![390, 390]);
        radio.release().done();
    }

    #[test]
    fn test_cycle_across_byte_boundary_rewrites_mid_first() {
        let expectations = writes(&[(0x07, 0x60), (0x08, 0xd0), (0x07, 0x61), (0x08, 0x01)]);
        let mut radio = Sx1278::new(SpiMock::new(&expectations), RadioConfig::default());
        let mut delay = RecordingDelay::default();
        {
            let pair = HopPair {
                low: 0x2460d0,
                high: 0x246101,
            };
            let mut output = FastHop::new(&mut radio, &mut delay, pair);
            output.cycle(195);
        }
        assert_eq!(delay.0, vec![195, 195]);
        radio.release().done();
    }
}
