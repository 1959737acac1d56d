// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The system-off demo application: one call to [`SysOffApp::boot`] is one
//! pass from the reset vector to `system_off`.

use crate::hal::Platform;
use crate::power::{strategy_from_profile, WakePrepare};
use crate::retained::{RetainedRecord, RetainedRegion, RetainedState};
use crate::wakeup::feedback::Indicator;
use crate::wakeup::{WakeMap, WakeupEvent, WakeupResolver};
use crate::{Pin, PortDomain, SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use sysoff_config::BoardProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootOutcome {
    /// Reached `system_off` with the final commit done.
    SystemOff,
    /// Stopped before system off; the device idles until power is removed.
    Halted(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct BootReport {
    pub console: Vec<String>,
    pub event: Option<WakeupEvent>,
    pub retained_valid: bool,
    pub record: RetainedRecord,
    pub outcome: BootOutcome,
}

#[derive(Debug)]
pub struct SysOffApp {
    board_name: String,
    resolver: WakeupResolver,
    indicator: Indicator,
    /// Port domains in index order, the order the latch lines are printed.
    latch_report: Vec<PortDomain>,
    wake: Box<dyn WakePrepare>,
}

impl SysOffApp {
    pub fn from_profile(profile: &BoardProfile) -> SimResult<Self> {
        profile
            .validate()
            .map_err(|e| SimulationError::Profile(e.to_string()))?;
        let led_port = profile.port(&profile.led.port).ok_or_else(|| {
            SimulationError::Profile(format!("led references unknown port '{}'", profile.led.port))
        })?;
        let indicator = Indicator {
            pin: Pin::new(led_port.index, profile.led.pin),
            active_high: profile.led.active_high,
            half_period_ms: profile.blink_half_period_ms,
        };

        let resolver = WakeupResolver::new(WakeMap::from_profile(profile)?);
        let mut latch_report: Vec<PortDomain> = resolver.map().domains().collect();
        latch_report.sort();

        Ok(Self {
            board_name: profile.name.clone(),
            resolver,
            indicator,
            latch_report,
            wake: strategy_from_profile(profile)?,
        })
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    /// Run one boot. `state` is the retained record opened for this boot;
    /// it is committed twice on the normal path, once after the boot count
    /// and once right before system off.
    pub fn boot<R: RetainedRegion>(
        &self,
        platform: &mut dyn Platform,
        state: &mut RetainedState<R>,
    ) -> BootReport {
        if !platform.is_ready() {
            tracing::warn!("Console device not ready, stopping");
            return BootReport {
                console: Vec::new(),
                event: None,
                retained_valid: state.validate(),
                record: state.record(),
                outcome: BootOutcome::Halted(SimulationError::ConsoleNotReady.to_string()),
            };
        }

        platform.print_line(&format!("{} system off demo", self.board_name));

        let led_ok = match self.indicator.configure(platform) {
            Ok(()) => true,
            Err(e) => {
                platform.print_line(&format!("Could not configure led0 GPIO ({})", e.errno()));
                false
            }
        };

        let event = self.resolver.resolve(platform);
        for domain in &self.latch_report {
            platform.print_line(&format!(
                "LATCH REGISTER FOR {}: {}",
                domain,
                event.mask(*domain)
            ));
        }
        platform.print_line(&format!("WAKEUP SRC: {}", event.resolution));
        if led_ok {
            if let Err(e) = self.indicator.blink(platform, event.resolution.pulses) {
                tracing::warn!("Blink aborted: {}", e);
            }
        }

        let retained_valid = state.validate();
        if !retained_valid {
            tracing::warn!("Retained record failed integrity check, resetting");
            state.reset();
        }
        state.increment_boots();
        state.accrue_uptime(platform.uptime_ticks());
        state.commit();

        platform.print_line(&format!(
            "Retained data: {}",
            if retained_valid { "valid" } else { "INVALID" }
        ));
        platform.print_line(&format!("Boot count: {}", state.boots()));
        platform.print_line(&format!("Off count: {}", state.off_count()));
        platform.print_line(&format!("Active Ticks: {}", state.uptime_sum()));

        if let Err(e) = self.wake.prepare(platform) {
            tracing::warn!("Wake preparation incomplete: {}", e);
        }

        if let Err(e) = platform.suspend() {
            platform.print_line(&format!("Could not suspend console ({})", e.errno()));
            return BootReport {
                console: Vec::new(),
                event: Some(event),
                retained_valid,
                record: state.record(),
                outcome: BootOutcome::Halted(e.to_string()),
            };
        }

        state.increment_off_count();
        state.accrue_uptime(platform.uptime_ticks());
        state.commit();
        platform.system_off();

        BootReport {
            console: Vec::new(),
            event: Some(event),
            retained_valid,
            record: state.record(),
            outcome: BootOutcome::SystemOff,
        }
    }
}
