use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::ToneOutput;

/// Toggles the SX1278 DIO2 pin, which feeds the chip's FSK modulator in
/// continuous mode.
///
/// Pin errors are ignored: the frame is already on air.
#[derive(Debug)]
pub struct DioToggle<'a, P, D> {
    pin: &'a mut P,
    delay: &'a mut D,
}

impl<'a, P: OutputPin, D: DelayNs> DioToggle<'a, P, D> {
    /// Borrows the pin and delay for the duration of a frame.
    pub fn new(pin: &'a mut P, delay: &'a mut D) -> Self {
        Self { pin, delay }
    }
}

impl<P: OutputPin, D: DelayNs> ToneOutput for DioToggle<'_, P, D> {
    fn cycle(&mut self, half_period_us: u32) {
        let _ = self.pin.set_high();
        self.delay.delay_us(half_period_us);
        let _ = self.pin.set_low();
        self.delay.delay_us(half_period_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulator::testing::RecordingDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn test_cycle_drives_pin_high_then_low() {
        let mut pin = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut delay = RecordingDelay::default();
        {
            let mut output = DioToggle::new(&mut pin, &mut delay);
            output.cycle(412);
            output.cycle(206);
        }
        assert_eq!(delay.0, vec![412, 412, 206, 206]);
        pin.done();
    }
}
