// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimResult, SimulationError};

/// Global real-time counter. Keeps running through system off, 1 MHz
/// SYSCOUNTER with one wake-capable compare channel.
#[derive(Debug, Default, serde::Serialize)]
pub struct Grtc {
    syscounter_us: u64,
    compare_us: Option<u64>,
    unavailable: bool,
}

impl Grtc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn syscounter_us(&self) -> u64 {
        self.syscounter_us
    }

    pub fn compare_us(&self) -> Option<u64> {
        self.compare_us
    }

    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn arm(&mut self, after_us: u64) -> SimResult<()> {
        if self.unavailable {
            return Err(SimulationError::TimerUnavailable);
        }
        let target = self.syscounter_us.saturating_add(after_us);
        tracing::debug!("GRTC compare armed at {} us", target);
        self.compare_us = Some(target);
        Ok(())
    }

    pub fn advance_us(&mut self, us: u64) {
        self.syscounter_us = self.syscounter_us.saturating_add(us);
    }

    /// Run the counter up to the armed compare. Returns false when nothing
    /// was armed.
    pub fn expire(&mut self) -> bool {
        match self.compare_us.take() {
            Some(target) => {
                self.syscounter_us = self.syscounter_us.max(target);
                true
            }
            None => false,
        }
    }

    /// Cold power loss stops the counter and drops the compare.
    pub fn power_loss(&mut self) {
        *self = Self {
            unavailable: self.unavailable,
            ..Self::default()
        };
    }
}
