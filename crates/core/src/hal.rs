// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Capabilities the application needs from the device. The simulator's
//! [`SimBoard`](crate::board::SimBoard) implements all of them; tests use
//! small fakes.

use crate::{Pin, PortDomain, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pull {
    Disabled,
    Down,
    Up,
}

/// Pin level that raises DETECT and sets the pin's LATCH bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Disabled,
    High,
    Low,
}

pub trait Console {
    fn is_ready(&self) -> bool {
        true
    }
    fn print_line(&mut self, line: &str);
    fn suspend(&mut self) -> SimResult<()>;
}

/// Sticky per-port latch of pins that met their sense condition.
pub trait LatchPort {
    fn read_latch(&mut self, domain: PortDomain) -> SimResult<u32>;
    /// Acknowledge every bit currently set in the domain's latch.
    fn clear_latch(&mut self, domain: PortDomain) -> SimResult<()>;
}

pub trait PinControl {
    fn configure_input(&mut self, pin: Pin, pull: Pull, sense: Sense) -> SimResult<()>;
    fn configure_output(&mut self, pin: Pin, high: bool) -> SimResult<()>;
    fn toggle(&mut self, pin: Pin) -> SimResult<()>;
}

pub trait Delay {
    fn delay_ms(&mut self, ms: u64);
}

/// Monotonic time since this boot started, in kernel ticks.
pub trait UptimeClock {
    fn uptime_ticks(&self) -> u64;
}

pub trait WakeTimer {
    fn arm_wakeup(&mut self, after_us: u64) -> SimResult<()>;
}

pub trait PowerControl {
    /// Enter system off. On hardware this never returns; callers must not do
    /// any further work after calling it.
    fn system_off(&mut self);
}

/// Everything the boot sequence touches, as one object-safe bundle.
pub trait Platform:
    Console + LatchPort + PinControl + Delay + UptimeClock + WakeTimer + PowerControl
{
}

impl<T> Platform for T where
    T: Console + LatchPort + PinControl + Delay + UptimeClock + WakeTimer + PowerControl
{
}
