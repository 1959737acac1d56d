// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::retained::{RetainedRegion, RECORD_SIZE};
use crate::{SimResult, SimulationError};

/// RAM block in the retention domain. Contents survive system off and are
/// lost only on a cold power loss.
#[derive(Debug, Clone)]
pub struct RetainedRam {
    pub data: Vec<u8>,
    pub base_addr: u64,
}

impl RetainedRam {
    /// Power is applied for the first time: the block is zero-filled.
    pub fn new(size: usize, base_addr: u64) -> Self {
        Self {
            data: vec![0; size.max(RECORD_SIZE)],
            base_addr,
        }
    }

    /// XOR one byte of the block, as a stray write or a brown-out would.
    pub fn corrupt(&mut self, offset: usize, xor: u8) -> SimResult<()> {
        let addr = self.base_addr + offset as u64;
        let Some(byte) = self.data.get_mut(offset) else {
            return Err(SimulationError::MemoryViolation(addr));
        };
        *byte ^= xor;
        tracing::debug!("Retained byte {:#x} xor {:#04x}", addr, xor);
        Ok(())
    }

    /// The retention domain lost power.
    pub fn power_loss(&mut self) {
        self.data.fill(0);
    }
}

impl RetainedRegion for RetainedRam {
    fn load(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out.copy_from_slice(&self.data[..RECORD_SIZE]);
        out
    }

    fn store(&mut self, bytes: &[u8; RECORD_SIZE]) {
        self.data[..RECORD_SIZE].copy_from_slice(bytes);
    }
}
