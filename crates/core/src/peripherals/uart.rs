// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimResult, SimulationError};

pub const TASKS_STARTTX: u64 = 0x008;
pub const EVENTS_TXDRDY: u64 = 0x11C;
pub const TXD: u64 = 0x51C;

/// Console UART. Bytes written to TXD are collected into lines; once the
/// port is suspended further output is dropped.
#[derive(Debug, serde::Serialize)]
pub struct ConsoleUart {
    #[serde(skip)]
    partial: Vec<u8>,
    lines: Vec<String>,
    ready: bool,
    suspended: bool,
    refuse_suspend: bool,
    baud: u32,
}

impl Default for ConsoleUart {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleUart {
    pub fn new() -> Self {
        Self {
            partial: Vec::new(),
            lines: Vec::new(),
            ready: true,
            suspended: false,
            refuse_suspend: false,
            baud: 115_200,
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn set_refuse_suspend(&mut self, refuse: bool) {
        self.refuse_suspend = refuse;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Lines transmitted since the last reset.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn suspend(&mut self) -> SimResult<()> {
        if self.refuse_suspend {
            return Err(SimulationError::SuspendFailed);
        }
        self.flush_partial();
        self.suspended = true;
        Ok(())
    }

    /// Power-on or wake reset: the port resumes, captured lines are handed
    /// back to the caller.
    pub fn take_lines(&mut self) -> Vec<String> {
        self.flush_partial();
        self.suspended = false;
        std::mem::take(&mut self.lines)
    }

    fn flush_partial(&mut self) {
        if !self.partial.is_empty() {
            let line = String::from_utf8_lossy(&self.partial).into_owned();
            self.lines.push(line);
            self.partial.clear();
        }
    }

    fn push_tx(&mut self, value: u8) {
        if self.suspended {
            tracing::warn!("Console suspended; dropping byte {:#04x}", value);
            return;
        }

        if value == b'\n' {
            let line = String::from_utf8_lossy(&self.partial).into_owned();
            self.lines.push(line);
            self.partial.clear();
        } else {
            self.partial.push(value);
        }
    }
}

impl crate::Peripheral for ConsoleUart {
    fn read(&self, offset: u64) -> SimResult<u8> {
        if offset == EVENTS_TXDRDY {
            return Ok(1);
        }
        Ok(0)
    }

    fn write(&mut self, offset: u64, value: u8) -> SimResult<()> {
        if offset == TXD {
            self.push_tx(value);
        }
        Ok(())
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Peripheral;

    fn send(uart: &mut ConsoleUart, text: &str) {
        for b in text.bytes() {
            uart.write(TXD, b).unwrap();
        }
    }

    #[test]
    fn test_lines_are_collected() {
        let mut uart = ConsoleUart::new();
        send(&mut uart, "Boot count: 1\nOff count: 0\nActive");
        assert_eq!(uart.lines(), ["Boot count: 1", "Off count: 0"]);

        // An unterminated line is kept until the port is reset.
        assert_eq!(
            uart.take_lines(),
            vec![
                "Boot count: 1".to_string(),
                "Off count: 0".to_string(),
                "Active".to_string()
            ]
        );
        assert!(uart.lines().is_empty());
    }

    #[test]
    fn test_other_offsets_do_not_transmit() {
        let mut uart = ConsoleUart::new();
        uart.write(TASKS_STARTTX, b'X').unwrap();
        assert!(uart.lines().is_empty());
        assert_eq!(uart.read(EVENTS_TXDRDY).unwrap(), 1);
    }

    #[test]
    fn test_suspend_drops_output() {
        let mut uart = ConsoleUart::new();
        send(&mut uart, "before\n");
        uart.suspend().unwrap();
        send(&mut uart, "after\n");
        assert_eq!(uart.take_lines(), vec!["before".to_string()]);
        assert!(!uart.is_suspended());
    }

    #[test]
    fn test_refused_suspend() {
        let mut uart = ConsoleUart::new();
        uart.set_refuse_suspend(true);
        assert_eq!(uart.suspend(), Err(SimulationError::SuspendFailed));
        assert!(!uart.is_suspended());
    }
}
