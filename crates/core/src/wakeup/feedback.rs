// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::{Delay, PinControl};
use crate::{Pin, SimResult};

/// LED used to show which switch woke the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub pin: Pin,
    pub active_high: bool,
    pub half_period_ms: u64,
}

impl Indicator {
    /// Configure the LED pin as an output, initially off.
    pub fn configure<P: PinControl + ?Sized>(&self, pins: &mut P) -> SimResult<()> {
        pins.configure_output(self.pin, !self.active_high)
    }

    /// Blocking: `pulses` on/off pairs, each half held for `half_period_ms`.
    pub fn blink<P>(&self, platform: &mut P, pulses: u8) -> SimResult<()>
    where
        P: PinControl + Delay + ?Sized,
    {
        for _ in 0..pulses {
            platform.toggle(self.pin)?;
            platform.delay_ms(self.half_period_ms);
            platform.toggle(self.pin)?;
            platform.delay_ms(self.half_period_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Pull, Sense};

    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<String>,
        level: bool,
    }

    impl PinControl for Recorder {
        fn configure_input(&mut self, _pin: Pin, _pull: Pull, _sense: Sense) -> SimResult<()> {
            Ok(())
        }

        fn configure_output(&mut self, pin: Pin, high: bool) -> SimResult<()> {
            self.level = high;
            self.events.push(format!("out {} {}", pin, high));
            Ok(())
        }

        fn toggle(&mut self, _pin: Pin) -> SimResult<()> {
            self.level = !self.level;
            self.events.push(format!("level {}", self.level));
            Ok(())
        }
    }

    impl Delay for Recorder {
        fn delay_ms(&mut self, ms: u64) {
            self.events.push(format!("wait {}", ms));
        }
    }

    fn led() -> Indicator {
        Indicator {
            pin: Pin::new(2, 9),
            active_high: true,
            half_period_ms: 200,
        }
    }

    #[test]
    fn test_blink_sequence() {
        let mut rec = Recorder::default();
        led().configure(&mut rec).unwrap();
        led().blink(&mut rec, 2).unwrap();
        assert_eq!(
            rec.events,
            vec![
                "out P2.09 false",
                "level true",
                "wait 200",
                "level false",
                "wait 200",
                "level true",
                "wait 200",
                "level false",
                "wait 200",
            ]
        );
        assert!(!rec.level);
    }

    #[test]
    fn test_zero_pulses_is_silent() {
        let mut rec = Recorder::default();
        led().blink(&mut rec, 0).unwrap();
        assert!(rec.events.is_empty());
    }
}
