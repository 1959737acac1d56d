// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Power-cycle simulator.
//!
//! A [`Device`] owns everything that exists on the physical board: volatile
//! peripherals in [`SimBoard`] and the retention-domain RAM. Each boot opens a
//! fresh [`RetainedState`] over that RAM, so nothing but the retained bytes
//! and the latches carries from one boot to the next.

use crate::app::{BootOutcome, BootReport, SysOffApp};
use crate::board::SimBoard;
use crate::memory::RetainedRam;
use crate::retained::{RetainedRecord, RetainedRegion, RetainedState, RECORD_SIZE};
use crate::snapshot::{DeviceSnapshot, RetainedSnapshot};
use crate::{Peripheral, Pin, SimulationError, WakeSource};
use std::collections::BTreeMap;
use sysoff_config::{BoardProfile, CorruptSpec, CycleExpectation, CycleStep};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PowerCycleError {
    #[error("switch {0} is not wired on this board")]
    UnconfiguredSwitch(WakeSource),
    #[error("corrupt offset {offset} is outside the {size}-byte retained record")]
    CorruptOutOfRange { offset: usize, size: usize },
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Never powered, or power removed.
    Unpowered,
    /// In system off, waiting for a wake event.
    Off,
    /// The last boot stopped before system off.
    Halted,
}

/// What a single step did to the device.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Booted(Box<BootReport>),
    /// The stimulus did not wake the device.
    StayedOff,
    Corrupted { offset: usize, xor: u8 },
    /// The device is not in system off and only reacts to power loss.
    Ignored,
}

#[derive(Debug)]
pub struct Device {
    profile: BoardProfile,
    app: SysOffApp,
    board: SimBoard,
    ram: RetainedRam,
    state: PowerState,
    history: Vec<BootReport>,
}

impl Device {
    pub fn new(profile: BoardProfile) -> Result<Self, PowerCycleError> {
        profile
            .validate()
            .map_err(|e| SimulationError::Profile(e.to_string()))?;
        let size = profile
            .retained_size()
            .map_err(|e| SimulationError::Profile(e.to_string()))?;
        let app = SysOffApp::from_profile(&profile)?;
        let board = SimBoard::from_profile(&profile);
        let ram = RetainedRam::new(size as usize, profile.retained.base);

        Ok(Self {
            profile,
            app,
            board,
            ram,
            state: PowerState::Unpowered,
            history: Vec::new(),
        })
    }

    pub fn profile(&self) -> &BoardProfile {
        &self.profile
    }

    pub fn board(&self) -> &SimBoard {
        &self.board
    }

    /// Fault injection hooks live on the board.
    pub fn board_mut(&mut self) -> &mut SimBoard {
        &mut self.board
    }

    pub fn power_state(&self) -> PowerState {
        self.state
    }

    pub fn history(&self) -> &[BootReport] {
        &self.history
    }

    pub fn last_report(&self) -> Option<&BootReport> {
        self.history.last()
    }

    /// Record as currently stored in retained RAM.
    pub fn retained(&self) -> RetainedRecord {
        RetainedRecord::from_bytes(&self.ram.load())
    }

    /// Apply power. The first call is the first power application, with the
    /// retained RAM zero-filled.
    pub fn power_on(&mut self) -> &BootReport {
        if self.state != PowerState::Unpowered {
            tracing::warn!("power_on while already powered, treating as power loss");
            self.cut_power();
        }
        self.boot()
    }

    fn cut_power(&mut self) {
        self.ram.power_loss();
        self.board.power_loss();
        self.state = PowerState::Unpowered;
    }

    fn boot(&mut self) -> &BootReport {
        self.board.wake_reset();
        let mut retained = RetainedState::open(&mut self.ram);
        let mut report = self.app.boot(&mut self.board, &mut retained);
        report.console = self.board.console.take_lines();

        self.state = match report.outcome {
            BootOutcome::SystemOff => PowerState::Off,
            BootOutcome::Halted(ref reason) => {
                tracing::warn!("Boot halted: {}", reason);
                PowerState::Halted
            }
        };
        tracing::info!(
            "Boot {} done: boots={} off_count={}",
            self.history.len() + 1,
            report.record.boots,
            report.record.off_count
        );
        self.history.push(report);
        &self.history[self.history.len() - 1]
    }

    fn switch_pin(&self, source: WakeSource) -> Result<Pin, PowerCycleError> {
        let switch = self
            .profile
            .switch(source)
            .ok_or(PowerCycleError::UnconfiguredSwitch(source))?;
        let port = self
            .profile
            .port(&switch.port)
            .ok_or(PowerCycleError::UnconfiguredSwitch(source))?;
        Ok(Pin::new(port.index, switch.pin))
    }

    fn booted(&mut self) -> StepOutcome {
        StepOutcome::Booted(Box::new(self.boot().clone()))
    }

    pub fn apply(&mut self, step: &CycleStep) -> Result<StepOutcome, PowerCycleError> {
        tracing::debug!("Step: {:?}", step);
        match step {
            CycleStep::PowerLoss => {
                self.cut_power();
                Ok(self.booted())
            }
            CycleStep::Corrupt(spec) => self.corrupt(spec),
            _ if self.state != PowerState::Off => {
                tracing::warn!("Device is {:?}, ignoring {:?}", self.state, step);
                Ok(StepOutcome::Ignored)
            }
            CycleStep::Press { switch } => {
                let pin = self.switch_pin(*switch)?;
                self.board.press(pin)?;
                if self.board.detect() {
                    Ok(self.booted())
                } else {
                    tracing::info!("{} pressed but no wake sense armed", switch);
                    Ok(StepOutcome::StayedOff)
                }
            }
            CycleStep::Timer => {
                if self.board.grtc.expire() {
                    Ok(self.booted())
                } else {
                    tracing::info!("No GRTC compare armed");
                    Ok(StepOutcome::StayedOff)
                }
            }
            CycleStep::Idle => Ok(StepOutcome::StayedOff),
        }
    }

    fn corrupt(&mut self, spec: &CorruptSpec) -> Result<StepOutcome, PowerCycleError> {
        if spec.offset >= RECORD_SIZE {
            return Err(PowerCycleError::CorruptOutOfRange {
                offset: spec.offset,
                size: RECORD_SIZE,
            });
        }
        self.ram.corrupt(spec.offset, spec.xor)?;
        Ok(StepOutcome::Corrupted {
            offset: spec.offset,
            xor: spec.xor,
        })
    }

    /// Apply every step in order, stopping at the first error.
    pub fn run_steps(&mut self, steps: &[CycleStep]) -> Result<Vec<StepOutcome>, PowerCycleError> {
        steps.iter().map(|step| self.apply(step)).collect()
    }

    /// Compare the device against an expectation block. Returns one message
    /// per mismatch; empty means everything matched.
    pub fn check_expectations(&self, expect: &CycleExpectation) -> Vec<String> {
        let mut failures = Vec::new();
        let record = self.retained();

        if let Some(boots) = expect.boots {
            if record.boots != boots {
                failures.push(format!("boots: expected {}, got {}", boots, record.boots));
            }
        }
        if let Some(off_count) = expect.off_count {
            if record.off_count != off_count {
                failures.push(format!(
                    "off_count: expected {}, got {}",
                    off_count, record.off_count
                ));
            }
        }
        if let Some(expected) = &expect.last_wake_source {
            let actual = self.last_wake_source();
            let matched = actual
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(expected));
            if !matched {
                failures.push(format!(
                    "last_wake_source: expected {}, got {}",
                    expected,
                    actual.as_deref().unwrap_or("none")
                ));
            }
        }
        for needle in &expect.console_contains {
            let found = self
                .history
                .iter()
                .flat_map(|r| r.console.iter())
                .any(|line| line.contains(needle.as_str()));
            if !found {
                failures.push(format!("console never printed '{}'", needle));
            }
        }
        failures
    }

    fn last_wake_source(&self) -> Option<String> {
        self.history
            .iter()
            .rev()
            .find_map(|r| r.event.as_ref())
            .map(|e| e.resolution.label().to_string())
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let record = self.retained();
        let mut latches = BTreeMap::new();
        let mut peripherals = BTreeMap::new();
        for port in self.board.ports() {
            latches.insert(port.id.clone(), port.dev.latch());
            peripherals.insert(port.id.clone(), port.dev.snapshot());
        }
        peripherals.insert("uart".to_string(), self.board.console.snapshot());
        peripherals.insert(
            "grtc".to_string(),
            serde_json::to_value(&self.board.grtc).unwrap_or(serde_json::Value::Null),
        );

        DeviceSnapshot {
            board: self.profile.name.clone(),
            powered_off: self.state == PowerState::Off,
            boots_observed: self.history.len(),
            retained: RetainedSnapshot {
                valid: record.is_valid(),
                record,
            },
            latches,
            led_on: self.board.output_level(self.app.indicator().pin)
                == self.app.indicator().active_high,
            last_wake_source: self.last_wake_source(),
            last_outcome: self.last_report().map(|r| r.outcome.clone()),
            peripherals,
        }
    }
}
