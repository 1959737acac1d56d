// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::WakeSource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_xor() -> u8 {
    0xFF
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CorruptSpec {
    /// Byte offset inside the retained record.
    pub offset: usize,
    #[serde(default = "default_xor")]
    pub xor: u8,
}

/// One event applied to the simulated device between boots.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CycleStep {
    /// Press and release a switch while the device is in system off.
    Press { switch: WakeSource },
    /// Let the GRTC compare expire.
    Timer,
    /// Nothing happens; the device stays off and the step is reported as such.
    Idle,
    /// Flip bits of one retained byte while the device is off.
    Corrupt(CorruptSpec),
    /// Cold power loss of the retention domain.
    PowerLoss,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CycleExpectation {
    #[serde(default)]
    pub boots: Option<u32>,
    #[serde(default)]
    pub off_count: Option<u32>,
    #[serde(default)]
    pub last_wake_source: Option<String>,
    #[serde(default)]
    pub console_contains: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CycleScript {
    pub schema_version: String,
    /// Optional board profile path, relative to the script.
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default)]
    pub steps: Vec<CycleStep>,
    #[serde(default)]
    pub expect: Option<CycleExpectation>,
}

impl CycleScript {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Cycle Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if let Some(board) = &self.board {
            if board.trim().is_empty() {
                anyhow::bail!("Input 'board' path cannot be empty");
            }
        }

        if let Some(expect) = &self.expect {
            if let Some(source) = &expect.last_wake_source {
                if source != "unknown" && source.parse::<WakeSource>().is_err() {
                    anyhow::bail!(
                        "Expectation 'last_wake_source' must be SW0..SW3 or 'unknown', got '{}'",
                        source
                    );
                }
            }
        }

        Ok(())
    }
}

/// Load a power-cycle script from YAML.
pub fn load_cycle_script<P: AsRef<Path>>(path: P) -> Result<CycleScript> {
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read cycle script at {:?}", path.as_ref()))?;
    let script = CycleScript::from_yaml(&contents)?;
    tracing::debug!(
        "Loaded cycle script with {} steps from {:?}",
        script.steps.len(),
        path.as_ref()
    );
    Ok(script)
}
