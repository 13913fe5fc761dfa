//! Hardware capability traits
//!
//! The pipeline only talks to hardware through these traits, so every
//! component can be driven from host tests with fake implementations.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal::spi::SpiDevice;

/// Free-running tick counter shared by the rotor tracker and the acquisition task.
pub trait Timer {
    /// Current counter value [tick]
    fn now(&self) -> u32;

    /// Restart counting from zero
    fn reset(&self);
}

impl<T: Timer + ?Sized> Timer for &T {
    fn now(&self) -> u32 {
        (**self).now()
    }

    fn reset(&self) {
        (**self).reset()
    }
}

/// Periodic alarm driving the sampling trigger.
pub trait AlarmTimer {
    /// Program the alarm period [tick] and restart the count
    fn set_alarm_ticks(&mut self, ticks: u32);

    /// Clear the pending alarm and arm the next one
    fn rearm(&mut self);
}

/// Motor drive output.
pub trait PwmOutput {
    /// Set duty cycle in percent (0.0 - 100.0)
    fn set_duty_percent(&mut self, duty: f32);
}

/// Half-duplex serial bus to the analog converter.
pub trait SerialBus {
    type Error: core::fmt::Debug;

    /// Clock in one 16-bit frame, bytes in wire order (MSB first)
    fn read_frame(&mut self, frame: &mut [u8; 2]) -> Result<(), Self::Error>;
}

impl<T: SpiDevice> SerialBus for T {
    type Error = T::Error;

    fn read_frame(&mut self, frame: &mut [u8; 2]) -> Result<(), Self::Error> {
        self.read(frame)
    }
}

/// Output that ignores every write, for optional scope/debug pins
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Test doubles for the capability traits

    use core::cell::Cell;

    use super::*;

    /// Manually advanced counter
    #[derive(Default)]
    pub struct FakeTimer {
        pub ticks: Cell<u32>,
        pub resets: Cell<u32>,
    }

    impl FakeTimer {
        pub fn set(&self, ticks: u32) {
            self.ticks.set(ticks);
        }

        pub fn advance(&self, ticks: u32) {
            self.ticks.set(self.ticks.get().wrapping_add(ticks));
        }
    }

    impl Timer for FakeTimer {
        fn now(&self) -> u32 {
            self.ticks.get()
        }

        fn reset(&self) {
            self.ticks.set(0);
            self.resets.set(self.resets.get() + 1);
        }
    }

    #[derive(Default)]
    pub struct FakeAlarm {
        pub ticks: u32,
        pub rearms: u32,
    }

    impl AlarmTimer for FakeAlarm {
        fn set_alarm_ticks(&mut self, ticks: u32) {
            self.ticks = ticks;
        }

        fn rearm(&mut self) {
            self.rearms += 1;
        }
    }

    #[derive(Default)]
    pub struct FakePwm {
        pub duty: Option<f32>,
        pub writes: u32,
    }

    impl PwmOutput for FakePwm {
        fn set_duty_percent(&mut self, duty: f32) {
            self.duty = Some(duty);
            self.writes += 1;
        }
    }

    /// Records the last level written
    #[derive(Default)]
    pub struct FakePin {
        pub high: bool,
        pub writes: u32,
    }

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    /// Returns a fixed frame, or fails every transfer
    pub struct FakeBus {
        pub frame: Option<[u8; 2]>,
    }

    impl SerialBus for FakeBus {
        type Error = ();

        fn read_frame(&mut self, frame: &mut [u8; 2]) -> Result<(), ()> {
            *frame = self.frame.ok_or(())?;
            Ok(())
        }
    }
}
