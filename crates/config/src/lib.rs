// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

mod script;

pub use script::{load_cycle_script, CorruptSpec, CycleExpectation, CycleScript, CycleStep};

/// Smallest retained region able to hold the packed retained record.
pub const MIN_RETAINED_BYTES: u64 = 20;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_blink_half_period_ms() -> u64 {
    200
}

fn default_tick_hz() -> u64 {
    32_768
}

fn default_deep_sleep_secs() -> u32 {
    2
}

/// Logical wake sources wired on the board. The set is closed: a latch mask
/// that maps to none of these resolves to "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WakeSource {
    #[serde(rename = "SW0", alias = "sw0")]
    Sw0,
    #[serde(rename = "SW1", alias = "sw1")]
    Sw1,
    #[serde(rename = "SW2", alias = "sw2")]
    Sw2,
    #[serde(rename = "SW3", alias = "sw3")]
    Sw3,
}

impl WakeSource {
    pub const ALL: [WakeSource; 4] = [Self::Sw0, Self::Sw1, Self::Sw2, Self::Sw3];

    pub fn label(self) -> &'static str {
        match self {
            Self::Sw0 => "SW0",
            Self::Sw1 => "SW1",
            Self::Sw2 => "SW2",
            Self::Sw3 => "SW3",
        }
    }
}

impl fmt::Display for WakeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for WakeSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SW0" => Ok(Self::Sw0),
            "SW1" => Ok(Self::Sw1),
            "SW2" => Ok(Self::Sw2),
            "SW3" => Ok(Self::Sw3),
            _ => Err(format!(
                "unknown wake source '{}'; supported: SW0, SW1, SW2, SW3",
                value
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetainedRegionConfig {
    pub base: u64,
    pub size: String, // e.g. "1KB"
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PortConfig {
    pub id: String,
    pub index: u8,
    pub base_address: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedBinding {
    pub port: String,
    pub pin: u8,
    #[serde(default = "default_true")]
    pub active_high: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SwitchBinding {
    pub id: WakeSource,
    pub port: String,
    pub pin: u8,
    /// Number of LED toggle pairs emitted when this switch woke the device.
    pub pulses: u8,
}

impl SwitchBinding {
    /// Latch bit for this switch; zero for a pin past 31.
    pub fn mask(&self) -> u32 {
        1u32.checked_shl(self.pin as u32).unwrap_or(0)
    }
}

/// How the device arranges to leave system off.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WakeupStrategy {
    /// Level-low sense on every switch pin.
    #[default]
    Gpio,
    /// GRTC compare after a fixed delay.
    Timer {
        #[serde(default = "default_deep_sleep_secs")]
        seconds: u32,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("{context} references unknown port '{port}'")]
    UnknownPort { context: String, port: String },
    #[error("{context} uses pin {pin}, ports only have 32 pins")]
    PinOutOfRange { context: String, pin: u8 },
    #[error("port '{0}' is declared more than once")]
    DuplicatePort(String),
    #[error("port index {0} is used by more than one port")]
    DuplicatePortIndex(u8),
    #[error("switch {0} is declared more than once")]
    DuplicateSwitch(WakeSource),
    #[error("switches on port '{port}' share pin {pin}")]
    DuplicateMask { port: String, pin: u8 },
    #[error("wake domain precedence list is empty")]
    EmptyPrecedence,
    #[error("port '{0}' appears more than once in precedence")]
    DuplicatePrecedence(String),
    #[error("switch {switch} is on port '{port}', which is missing from precedence")]
    SwitchOutsidePrecedence { switch: WakeSource, port: String },
    #[error("invalid retained region size '{0}'")]
    BadSize(String),
    #[error("retained region holds {size} bytes, the record needs {needed}")]
    RetainedTooSmall { size: u64, needed: u64 },
    #[error("tick_hz must be greater than zero")]
    ZeroTickRate,
}

/// Board wiring and behaviour knobs for the system-off demo.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BoardProfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub retained: RetainedRegionConfig,
    pub ports: Vec<PortConfig>,
    pub led: LedBinding,
    pub switches: Vec<SwitchBinding>,
    /// Wake domains, highest precedence first. The first domain with a
    /// non-zero latch decides the wake source.
    pub precedence: Vec<String>,
    #[serde(default = "default_blink_half_period_ms")]
    pub blink_half_period_ms: u64,
    #[serde(default)]
    pub wakeup: WakeupStrategy,
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u64,
}

impl BoardProfile {
    /// nRF54L15-DK wiring: SW0 = P1.13, SW1 = P1.09, SW2 = P1.08, SW3 = P0.04,
    /// LED0 = P2.09.
    pub fn nrf54l15dk() -> Self {
        let port = |id: &str, index: u8, base_address: u64| PortConfig {
            id: id.to_string(),
            index,
            base_address,
        };
        let switch = |id: WakeSource, port: &str, pin: u8, pulses: u8| SwitchBinding {
            id,
            port: port.to_string(),
            pin,
            pulses,
        };

        Self {
            schema_version: default_schema_version(),
            name: "nrf54l15dk".to_string(),
            retained: RetainedRegionConfig {
                base: 0x2003_FC00,
                size: "1KB".to_string(),
            },
            ports: vec![
                port("p0", 0, 0x5010_A000),
                port("p1", 1, 0x500D_8200),
                port("p2", 2, 0x5005_0400),
            ],
            led: LedBinding {
                port: "p2".to_string(),
                pin: 9,
                active_high: true,
            },
            switches: vec![
                switch(WakeSource::Sw0, "p1", 13, 1),
                switch(WakeSource::Sw1, "p1", 9, 2),
                switch(WakeSource::Sw2, "p1", 8, 3),
                switch(WakeSource::Sw3, "p0", 4, 4),
            ],
            precedence: vec!["p1".to_string(), "p0".to_string()],
            blink_half_period_ms: default_blink_half_period_ms(),
            wakeup: WakeupStrategy::Gpio,
            tick_hz: default_tick_hz(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open board profile at {:?}", path.as_ref()))?;
        let profile: Self =
            serde_yaml::from_reader(f).context("Failed to parse Board Profile YAML")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let profile: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Board Profile YAML")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn port(&self, id: &str) -> Option<&PortConfig> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn switch(&self, id: WakeSource) -> Option<&SwitchBinding> {
        self.switches.iter().find(|s| s.id == id)
    }

    pub fn retained_size(&self) -> Result<u64, ProfileError> {
        parse_size(&self.retained.size)
            .map_err(|_| ProfileError::BadSize(self.retained.size.clone()))
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.schema_version != "1.0" {
            return Err(ProfileError::UnsupportedSchema(self.schema_version.clone()));
        }

        let mut seen_ports = HashSet::new();
        let mut seen_indices = HashSet::new();
        for p in &self.ports {
            if !seen_ports.insert(p.id.as_str()) {
                return Err(ProfileError::DuplicatePort(p.id.clone()));
            }
            if !seen_indices.insert(p.index) {
                return Err(ProfileError::DuplicatePortIndex(p.index));
            }
        }

        self.check_pin("led", &self.led.port, self.led.pin)?;

        let mut seen_switches = HashSet::new();
        let mut seen_pins = HashSet::new();
        for s in &self.switches {
            self.check_pin(&s.id.to_string(), &s.port, s.pin)?;
            if !seen_switches.insert(s.id) {
                return Err(ProfileError::DuplicateSwitch(s.id));
            }
            if !seen_pins.insert((s.port.as_str(), s.pin)) {
                return Err(ProfileError::DuplicateMask {
                    port: s.port.clone(),
                    pin: s.pin,
                });
            }
        }

        if self.precedence.is_empty() {
            return Err(ProfileError::EmptyPrecedence);
        }
        let mut seen_domains = HashSet::new();
        for domain in &self.precedence {
            if self.port(domain).is_none() {
                return Err(ProfileError::UnknownPort {
                    context: "precedence".to_string(),
                    port: domain.clone(),
                });
            }
            if !seen_domains.insert(domain.as_str()) {
                return Err(ProfileError::DuplicatePrecedence(domain.clone()));
            }
        }
        // Latches are only read and cleared on precedence domains.
        if let Some(s) = self
            .switches
            .iter()
            .find(|s| !seen_domains.contains(s.port.as_str()))
        {
            return Err(ProfileError::SwitchOutsidePrecedence {
                switch: s.id,
                port: s.port.clone(),
            });
        }

        let size = self.retained_size()?;
        if size < MIN_RETAINED_BYTES {
            return Err(ProfileError::RetainedTooSmall {
                size,
                needed: MIN_RETAINED_BYTES,
            });
        }

        if self.tick_hz == 0 {
            return Err(ProfileError::ZeroTickRate);
        }

        Ok(())
    }

    fn check_pin(&self, context: &str, port: &str, pin: u8) -> Result<(), ProfileError> {
        if self.port(port).is_none() {
            return Err(ProfileError::UnknownPort {
                context: context.to_string(),
                port: port.to_string(),
            });
        }
        if pin >= 32 {
            return Err(ProfileError::PinOutOfRange {
                context: context.to_string(),
                pin,
            });
        }
        Ok(())
    }
}

impl Default for BoardProfile {
    fn default() -> Self {
        Self::nrf54l15dk()
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profile_is_valid() {
        let profile = BoardProfile::nrf54l15dk();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.switch(WakeSource::Sw1).unwrap().mask(), 1 << 9);
        assert_eq!(profile.switch(WakeSource::Sw3).unwrap().port, "p0");
        assert_eq!(profile.precedence, vec!["p1", "p0"]);
    }

    #[test]
    fn test_profile_yaml_defaults() {
        let yaml = r#"
name: "custom"
retained:
  base: 0x20000000
  size: "1KB"
ports:
  - id: "p0"
    index: 0
    base_address: 0x50000000
led:
  port: "p0"
  pin: 17
switches:
  - id: SW0
    port: "p0"
    pin: 11
    pulses: 1
precedence: ["p0"]
"#;
        let profile = BoardProfile::from_yaml(yaml).unwrap();
        assert_eq!(profile.schema_version, "1.0");
        assert_eq!(profile.blink_half_period_ms, 200);
        assert_eq!(profile.wakeup, WakeupStrategy::Gpio);
        assert!(profile.led.active_high);
    }

    #[test]
    fn test_timer_strategy_parses() {
        let yaml = r#"
strategy: timer
"#;
        let strategy: WakeupStrategy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(strategy, WakeupStrategy::Timer { seconds: 2 });
    }

    #[test]
    fn test_unknown_precedence_port() {
        let mut profile = BoardProfile::nrf54l15dk();
        profile.precedence.push("p9".to_string());
        let err = profile.validate().unwrap_err();
        assert!(matches!(err, ProfileError::UnknownPort { .. }));
    }

    #[test]
    fn test_duplicate_mask_rejected() {
        let mut profile = BoardProfile::nrf54l15dk();
        profile.switches[1].pin = 13;
        let err = profile.validate().unwrap_err();
        assert_eq!(
            err,
            ProfileError::DuplicateMask {
                port: "p1".to_string(),
                pin: 13
            }
        );
    }

    #[test]
    fn test_switch_port_missing_from_precedence() {
        let mut profile = BoardProfile::nrf54l15dk();
        profile.precedence = vec!["p1".to_string()];
        assert_eq!(
            profile.validate(),
            Err(ProfileError::SwitchOutsidePrecedence {
                switch: WakeSource::Sw3,
                port: "p0".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_precedence_rejected() {
        let mut profile = BoardProfile::nrf54l15dk();
        profile.precedence = vec!["p1".to_string(), "p0".to_string(), "p1".to_string()];
        assert_eq!(
            profile.validate(),
            Err(ProfileError::DuplicatePrecedence("p1".to_string()))
        );
    }

    #[test]
    fn test_duplicate_port_index_rejected() {
        let mut profile = BoardProfile::nrf54l15dk();
        profile.ports[1].index = profile.ports[0].index;
        assert_eq!(
            profile.validate(),
            Err(ProfileError::DuplicatePortIndex(profile.ports[0].index))
        );
    }

    #[test]
    fn test_pin_out_of_range() {
        let mut profile = BoardProfile::nrf54l15dk();
        profile.led.pin = 40;
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::PinOutOfRange { pin: 40, .. })
        ));
    }

    #[test]
    fn test_bad_schema_version() {
        let mut profile = BoardProfile::nrf54l15dk();
        profile.schema_version = "2.0".to_string();
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_wake_source_from_str() {
        assert_eq!("sw2".parse::<WakeSource>(), Ok(WakeSource::Sw2));
        assert!("SW9".parse::<WakeSource>().is_err());
    }
}
