// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;

pub const OUT: u64 = 0x000;
pub const OUTSET: u64 = 0x004;
pub const OUTCLR: u64 = 0x008;
pub const IN: u64 = 0x00C;
pub const DIR: u64 = 0x010;
pub const DIRSET: u64 = 0x014;
pub const DIRCLR: u64 = 0x018;
pub const LATCH: u64 = 0x020;
pub const PIN_CNF: u64 = 0x080;

pub const PIN_CNF_DIR_OUTPUT: u32 = 1 << 0;
pub const PIN_CNF_INPUT_DISCONNECT: u32 = 1 << 1;
pub const PIN_CNF_PULL_SHIFT: u32 = 2;
pub const PIN_CNF_SENSE_SHIFT: u32 = 16;
pub const PULL_DOWN: u32 = 1;
pub const PULL_UP: u32 = 3;
pub const SENSE_HIGH: u32 = 2;
pub const SENSE_LOW: u32 = 3;

const PIN_CNF_RESET: u32 = PIN_CNF_INPUT_DISCONNECT;

/// nRF GPIO port (P0/P1/P2 on nRF54L) with sticky LATCH.
#[derive(Debug, serde::Serialize)]
pub struct NrfGpioPort {
    out: u32,   // 0x000
    dir: u32,   // 0x010
    latch: u32, // 0x020: rw1c
    pin_cnf: [u32; 32],
    /// Level driven onto each pin from outside the chip.
    levels: u32,
}

impl Default for NrfGpioPort {
    fn default() -> Self {
        Self::new()
    }
}

impl NrfGpioPort {
    pub fn new() -> Self {
        Self {
            out: 0,
            dir: 0,
            latch: 0,
            pin_cnf: [PIN_CNF_RESET; 32],
            // Switches idle high through their pull-ups.
            levels: u32::MAX,
        }
    }

    /// Reset taken on wake from system off: configuration goes back to reset
    /// values, LATCH and the external pin levels survive.
    pub fn wake_reset(&mut self) {
        let latch = self.latch;
        let levels = self.levels;
        *self = Self::new();
        self.latch = latch;
        self.levels = levels;
    }

    pub fn latch(&self) -> u32 {
        self.latch
    }

    pub fn out(&self) -> u32 {
        self.out
    }

    pub fn pin_cnf(&self, pin: u8) -> u32 {
        self.pin_cnf[(pin & 31) as usize]
    }

    /// Drive a pin from outside. Inputs whose sense condition becomes true
    /// set their LATCH bit.
    pub fn drive(&mut self, pin: u8, high: bool) {
        let bit = 1u32 << (pin & 31);
        if high {
            self.levels |= bit;
        } else {
            self.levels &= !bit;
        }
        self.update_sense();
    }

    /// Active-low switch pressed.
    pub fn press(&mut self, pin: u8) {
        self.drive(pin, false);
    }

    pub fn release(&mut self, pin: u8) {
        self.drive(pin, true);
    }

    fn input_value(&self) -> u32 {
        (self.levels & !self.dir) | (self.out & self.dir)
    }

    fn update_sense(&mut self) {
        for (n, cnf) in self.pin_cnf.iter().enumerate() {
            let bit = 1u32 << n;
            let level_high = self.levels & bit != 0;
            let met = match (cnf >> PIN_CNF_SENSE_SHIFT) & 0x3 {
                SENSE_HIGH => level_high,
                SENSE_LOW => !level_high,
                _ => false,
            };
            if met {
                self.latch |= bit;
            }
        }
    }

    fn read_reg(&self, offset: u64) -> u32 {
        match offset {
            OUT | OUTSET | OUTCLR => self.out,
            IN => self.input_value(),
            DIR | DIRSET | DIRCLR => self.dir,
            LATCH => self.latch,
            o if (PIN_CNF..PIN_CNF + 32 * 4).contains(&o) => {
                self.pin_cnf[((o - PIN_CNF) / 4) as usize]
            }
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: u64, value: u32) {
        match offset {
            OUT => self.out = value,
            OUTSET => self.out |= value,
            OUTCLR => self.out &= !value,
            DIR => self.dir = value,
            DIRSET => self.dir |= value,
            DIRCLR => self.dir &= !value,
            LATCH => {
                self.latch &= !value;
                // A pin still meeting its sense condition latches again.
                self.update_sense();
            }
            o if (PIN_CNF..PIN_CNF + 32 * 4).contains(&o) => {
                let n = ((o - PIN_CNF) / 4) as usize;
                self.pin_cnf[n] = value & 0x0003_070F;
                let bit = 1u32 << n;
                if value & PIN_CNF_DIR_OUTPUT != 0 {
                    self.dir |= bit;
                } else {
                    self.dir &= !bit;
                }
                self.update_sense();
            }
            _ => {}
        }
    }

    /// Set/clear style registers act only on the bits written in this
    /// byte lane.
    fn is_strobe_register(offset: u64) -> bool {
        matches!(offset, OUTSET | OUTCLR | DIRSET | DIRCLR | LATCH)
    }
}

impl crate::Peripheral for NrfGpioPort {
    fn read(&self, offset: u64) -> SimResult<u8> {
        let reg_offset = offset & !3;
        let byte_offset = (offset % 4) as u32;
        let reg_val = self.read_reg(reg_offset);
        Ok(((reg_val >> (byte_offset * 8)) & 0xFF) as u8)
    }

    fn write(&mut self, offset: u64, value: u8) -> SimResult<()> {
        let reg_offset = offset & !3;
        let byte_offset = (offset % 4) as u32;

        if Self::is_strobe_register(reg_offset) {
            self.write_reg(reg_offset, (value as u32) << (byte_offset * 8));
            return Ok(());
        }

        let mut reg_val = self.read_reg(reg_offset);
        let mask = 0xFF << (byte_offset * 8);
        reg_val &= !mask;
        reg_val |= (value as u32) << (byte_offset * 8);

        self.write_reg(reg_offset, reg_val);
        Ok(())
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
