// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod app;
pub mod board;
pub mod device;
pub mod hal;
pub mod memory;
pub mod peripherals;
pub mod power;
pub mod retained;
pub mod snapshot;
pub mod wakeup;

use std::fmt;

pub use sysoff_config::WakeSource;

/// A GPIO port acting as an independent wake domain ("P0", "P1", ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct PortDomain(pub u8);

impl fmt::Display for PortDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A single pin on a port, e.g. P1.13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Pin {
    pub port: PortDomain,
    pub pin: u8,
}

impl Pin {
    pub fn new(port: u8, pin: u8) -> Self {
        Self {
            port: PortDomain(port),
            pin,
        }
    }

    /// Zero for a pin past 31.
    pub fn mask(&self) -> u32 {
        1u32.checked_shl(self.pin as u32).unwrap_or(0)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.port, self.pin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("port {0} is not mapped")]
    UnknownPort(PortDomain),
    #[error("pin {0} is out of range")]
    PinOutOfRange(u8),
    #[error("pin {0} rejected its configuration")]
    PinFault(Pin),
    #[error("console device not ready")]
    ConsoleNotReady,
    #[error("console refused to suspend")]
    SuspendFailed,
    #[error("wakeup timer unavailable")]
    TimerUnavailable,
    #[error("invalid board profile: {0}")]
    Profile(String),
}

impl SimulationError {
    /// Negative errno reported on the console, the way the device firmware
    /// prints driver return codes.
    pub fn errno(&self) -> i32 {
        match self {
            Self::MemoryViolation(_) => -14, // EFAULT
            Self::UnknownPort(_) | Self::ConsoleNotReady => -19, // ENODEV
            Self::PinOutOfRange(_) | Self::Profile(_) => -22, // EINVAL
            Self::PinFault(_) => -5,          // EIO
            Self::SuspendFailed => -16,       // EBUSY
            Self::TimerUnavailable => -134,   // ENOTSUP
        }
    }
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait representing a memory-mapped peripheral
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> SimResult<u8>;
    fn write(&mut self, offset: u64, value: u8) -> SimResult<()>;
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn read_u32(&self, offset: u64) -> SimResult<u32> {
        let b0 = self.read(offset)? as u32;
        let b1 = self.read(offset + 1)? as u32;
        let b2 = self.read(offset + 2)? as u32;
        let b3 = self.read(offset + 3)? as u32;
        // Little Endian
        Ok(b0 | (b1 << 8) | (b2 << 16) | (b3 << 24))
    }

    fn write_u32(&mut self, offset: u64, value: u32) -> SimResult<()> {
        self.write(offset, (value & 0xFF) as u8)?;
        self.write(offset + 1, ((value >> 8) & 0xFF) as u8)?;
        self.write(offset + 2, ((value >> 16) & 0xFF) as u8)?;
        self.write(offset + 3, ((value >> 24) & 0xFF) as u8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_display_and_mask() {
        let pin = Pin::new(1, 9);
        assert_eq!(pin.to_string(), "P1.09");
        assert_eq!(pin.mask(), 1 << 9);
        assert_eq!(PortDomain(0).to_string(), "P0");
    }

    #[test]
    fn test_errno_codes() {
        assert_eq!(SimulationError::PinFault(Pin::new(0, 4)).errno(), -5);
        assert_eq!(SimulationError::ConsoleNotReady.errno(), -19);
    }
}
