// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::{Platform, Pull, Sense};
use crate::{Pin, SimResult, SimulationError, WakeSource};
use sysoff_config::{BoardProfile, WakeupStrategy};

/// Arranges for the device to leave system off. Implementations print their
/// own diagnostics and the "Entering system off" announcement.
pub trait WakePrepare: std::fmt::Debug + Send {
    fn prepare(&self, platform: &mut dyn Platform) -> SimResult<()>;
}

/// Level-low sense on every switch pin. The first pin that fails to configure
/// ends the setup for this boot; pins after it stay unarmed.
#[derive(Debug, Clone)]
pub struct GpioWakeup {
    pub switches: Vec<(WakeSource, Pin)>,
}

impl WakePrepare for GpioWakeup {
    fn prepare(&self, platform: &mut dyn Platform) -> SimResult<()> {
        let mut result = Ok(());
        for (source, pin) in &self.switches {
            if let Err(e) = platform.configure_input(*pin, Pull::Up, Sense::Low) {
                tracing::warn!("Wake pin {} ({}) setup failed: {}", pin, source, e);
                platform.print_line(&format!(
                    "Could not configure {} GPIO ({})",
                    source.label().to_ascii_lowercase(),
                    e.errno()
                ));
                result = Err(e);
                break;
            }
        }
        platform.print_line("Entering system off; press any switch to restart");
        result
    }
}

/// GRTC compare `seconds` after now.
#[derive(Debug, Clone, Copy)]
pub struct TimerWakeup {
    pub seconds: u32,
}

impl WakePrepare for TimerWakeup {
    fn prepare(&self, platform: &mut dyn Platform) -> SimResult<()> {
        match platform.arm_wakeup(self.seconds as u64 * 1_000_000) {
            Ok(()) => {
                platform.print_line(&format!(
                    "Entering system off; wait {} seconds to restart",
                    self.seconds
                ));
                Ok(())
            }
            Err(e) => {
                platform.print_line(&format!(
                    "Unable to prepare GRTC as a wake up source (err = {}).",
                    e.errno()
                ));
                Err(e)
            }
        }
    }
}

/// Pick the wake strategy the profile asks for.
pub fn strategy_from_profile(profile: &BoardProfile) -> SimResult<Box<dyn WakePrepare>> {
    match profile.wakeup {
        WakeupStrategy::Gpio => {
            let mut switches = Vec::with_capacity(profile.switches.len());
            for s in &profile.switches {
                let port = profile.port(&s.port).ok_or_else(|| {
                    SimulationError::Profile(format!(
                        "{} references unknown port '{}'",
                        s.id, s.port
                    ))
                })?;
                switches.push((s.id, Pin::new(port.index, s.pin)));
            }
            Ok(Box::new(GpioWakeup { switches }))
        }
        WakeupStrategy::Timer { seconds } => Ok(Box::new(TimerWakeup { seconds })),
    }
}
