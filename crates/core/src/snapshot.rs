// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::app::BootOutcome;
use crate::retained::RetainedRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time view of a simulated device, emitted by `sysoff --json`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeviceSnapshot {
    pub board: String,
    pub powered_off: bool,
    pub boots_observed: usize,
    pub retained: RetainedSnapshot,
    /// LATCH value per port id.
    pub latches: BTreeMap<String, u32>,
    pub led_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_wake_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<BootOutcome>,
    pub peripherals: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RetainedSnapshot {
    pub valid: bool,
    pub record: RetainedRecord,
}
