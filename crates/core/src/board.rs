// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host model of the board: GPIO ports, console UART and GRTC wired up from a
//! [`BoardProfile`], exposed to the application through the HAL traits.
//!
//! All register traffic goes through [`Peripheral`] byte accesses so the
//! port models see exactly what firmware would write.

use crate::hal::{
    Console, Delay, LatchPort, PinControl, PowerControl, Pull, Sense, UptimeClock, WakeTimer,
};
use crate::peripherals::gpio::{self, NrfGpioPort};
use crate::peripherals::grtc::Grtc;
use crate::peripherals::uart::{self, ConsoleUart};
use crate::{Peripheral, Pin, PortDomain, SimResult, SimulationError};
use std::collections::HashSet;
use sysoff_config::BoardProfile;

#[derive(Debug)]
pub struct PortEntry {
    pub id: String,
    pub domain: PortDomain,
    pub base: u64,
    pub dev: NrfGpioPort,
}

#[derive(Debug)]
pub struct SimBoard {
    pub name: String,
    ports: Vec<PortEntry>,
    pub console: ConsoleUart,
    pub grtc: Grtc,
    tick_hz: u64,
    /// Time since the current boot started.
    uptime_us: u64,
    off: bool,
    faults: HashSet<Pin>,
}

impl SimBoard {
    pub fn from_profile(profile: &BoardProfile) -> Self {
        let ports = profile
            .ports
            .iter()
            .map(|p| PortEntry {
                id: p.id.clone(),
                domain: PortDomain(p.index),
                base: p.base_address,
                dev: NrfGpioPort::new(),
            })
            .collect();

        Self {
            name: profile.name.clone(),
            ports,
            console: ConsoleUart::new(),
            grtc: Grtc::new(),
            tick_hz: profile.tick_hz,
            uptime_us: 0,
            off: false,
            faults: HashSet::new(),
        }
    }

    pub fn ports(&self) -> &[PortEntry] {
        &self.ports
    }

    pub fn port(&self, domain: PortDomain) -> Option<&NrfGpioPort> {
        self.ports
            .iter()
            .find(|p| p.domain == domain)
            .map(|p| &p.dev)
    }

    fn port_mut(&mut self, domain: PortDomain) -> SimResult<&mut NrfGpioPort> {
        self.ports
            .iter_mut()
            .find(|p| p.domain == domain)
            .map(|p| &mut p.dev)
            .ok_or(SimulationError::UnknownPort(domain))
    }

    pub fn is_off(&self) -> bool {
        self.off
    }

    /// Output level currently driven on `pin`.
    pub fn output_level(&self, pin: Pin) -> bool {
        self.port(pin.port)
            .is_some_and(|dev| dev.out() & pin.mask() != 0)
    }

    /// Make the next configuration of `pin` fail, as a driver error would.
    pub fn inject_pin_fault(&mut self, pin: Pin) {
        self.faults.insert(pin);
    }

    /// Press and release an active-low switch.
    pub fn press(&mut self, pin: Pin) -> SimResult<()> {
        let dev = self.port_mut(pin.port)?;
        dev.press(pin.pin);
        dev.release(pin.pin);
        tracing::debug!("Switch at {} pressed, latch {:#010x}", pin, dev.latch());
        Ok(())
    }

    /// True when any port holds a latched sense event, which is what pulls
    /// the chip out of system off.
    pub fn detect(&self) -> bool {
        self.ports.iter().any(|p| p.dev.latch() != 0)
    }

    /// Reset taken on wake from system off. GPIO configuration is lost,
    /// LATCH and the GRTC counter are kept.
    pub fn wake_reset(&mut self) {
        for p in &mut self.ports {
            p.dev.wake_reset();
        }
        self.uptime_us = 0;
        self.off = false;
    }

    /// Cold power loss: nothing on the board survives.
    pub fn power_loss(&mut self) {
        for p in &mut self.ports {
            p.dev = NrfGpioPort::new();
        }
        self.grtc.power_loss();
        self.uptime_us = 0;
        self.off = false;
    }

    fn advance_us(&mut self, us: u64) {
        self.uptime_us = self.uptime_us.saturating_add(us);
        self.grtc.advance_us(us);
    }

    fn check_pin(&self, pin: Pin) -> SimResult<()> {
        if pin.pin >= 32 {
            return Err(SimulationError::PinOutOfRange(pin.pin));
        }
        if self.faults.contains(&pin) {
            return Err(SimulationError::PinFault(pin));
        }
        Ok(())
    }
}

impl Console for SimBoard {
    fn is_ready(&self) -> bool {
        self.console.is_ready()
    }

    fn print_line(&mut self, line: &str) {
        let mut sent = 0u64;
        for byte in line.bytes().chain(std::iter::once(b'\n')) {
            if let Err(e) = self.console.write(uart::TXD, byte) {
                tracing::warn!("Console write failed: {}", e);
                break;
            }
            sent += 1;
        }
        // 8N1 framing: ten bit times per byte.
        let us = sent * 10 * 1_000_000 / self.console.baud() as u64;
        self.advance_us(us);
    }

    fn suspend(&mut self) -> SimResult<()> {
        self.console.suspend()
    }
}

impl LatchPort for SimBoard {
    fn read_latch(&mut self, domain: PortDomain) -> SimResult<u32> {
        self.port_mut(domain)?.read_u32(gpio::LATCH)
    }

    fn clear_latch(&mut self, domain: PortDomain) -> SimResult<()> {
        let dev = self.port_mut(domain)?;
        let value = dev.read_u32(gpio::LATCH)?;
        dev.write_u32(gpio::LATCH, value)
    }
}

impl PinControl for SimBoard {
    fn configure_input(&mut self, pin: Pin, pull: Pull, sense: Sense) -> SimResult<()> {
        self.check_pin(pin)?;
        let pull = match pull {
            Pull::Disabled => 0,
            Pull::Down => gpio::PULL_DOWN,
            Pull::Up => gpio::PULL_UP,
        };
        let sense = match sense {
            Sense::Disabled => 0,
            Sense::High => gpio::SENSE_HIGH,
            Sense::Low => gpio::SENSE_LOW,
        };
        let cnf = (pull << gpio::PIN_CNF_PULL_SHIFT) | (sense << gpio::PIN_CNF_SENSE_SHIFT);
        tracing::debug!("{} PIN_CNF <= {:#010x}", pin, cnf);
        self.port_mut(pin.port)?
            .write_u32(gpio::PIN_CNF + pin.pin as u64 * 4, cnf)
    }

    fn configure_output(&mut self, pin: Pin, high: bool) -> SimResult<()> {
        self.check_pin(pin)?;
        let dev = self.port_mut(pin.port)?;
        let level_reg = if high { gpio::OUTSET } else { gpio::OUTCLR };
        dev.write_u32(level_reg, pin.mask())?;
        dev.write_u32(
            gpio::PIN_CNF + pin.pin as u64 * 4,
            gpio::PIN_CNF_DIR_OUTPUT | gpio::PIN_CNF_INPUT_DISCONNECT,
        )
    }

    fn toggle(&mut self, pin: Pin) -> SimResult<()> {
        let dev = self.port_mut(pin.port)?;
        let out = dev.read_u32(gpio::OUT)?;
        let reg = if out & pin.mask() != 0 {
            gpio::OUTCLR
        } else {
            gpio::OUTSET
        };
        dev.write_u32(reg, pin.mask())
    }
}

impl Delay for SimBoard {
    fn delay_ms(&mut self, ms: u64) {
        self.advance_us(ms.saturating_mul(1_000));
    }
}

impl UptimeClock for SimBoard {
    fn uptime_ticks(&self) -> u64 {
        (self.uptime_us as u128 * self.tick_hz as u128 / 1_000_000) as u64
    }
}

impl WakeTimer for SimBoard {
    fn arm_wakeup(&mut self, after_us: u64) -> SimResult<()> {
        self.grtc.arm(after_us)
    }
}

impl PowerControl for SimBoard {
    fn system_off(&mut self) {
        tracing::info!("{} entered system off", self.name);
        self.off = true;
    }
}
