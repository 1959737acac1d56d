// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Wake source resolution from per-port LATCH registers.
//!
//! Ports are checked in precedence order and the first port with a non-zero
//! latch decides: its mask must equal exactly one known switch bit, anything
//! else is "unknown". Both latches are cleared afterwards whatever the
//! outcome.

pub mod feedback;

use crate::hal::LatchPort;
use crate::{PortDomain, SimResult, SimulationError, WakeSource};
use serde::Serialize;
use std::fmt;
use sysoff_config::BoardProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WakeEntry {
    pub mask: u32,
    pub source: WakeSource,
    pub pulses: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainMap {
    pub domain: PortDomain,
    pub entries: Vec<WakeEntry>,
}

/// Mapping table, domains ordered highest precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeMap {
    domains: Vec<DomainMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub source: Option<WakeSource>,
    pub pulses: u8,
}

impl Resolution {
    pub const UNKNOWN: Resolution = Resolution {
        source: None,
        pulses: 0,
    };

    pub fn label(&self) -> &'static str {
        self.source.map_or("unknown", WakeSource::label)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one boot's resolution step. Never outlives the boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WakeupEvent {
    /// Latch masks as read, in precedence order.
    pub masks: Vec<(PortDomain, u32)>,
    pub resolution: Resolution,
}

impl WakeupEvent {
    pub fn mask(&self, domain: PortDomain) -> u32 {
        self.masks
            .iter()
            .find(|(d, _)| *d == domain)
            .map_or(0, |(_, m)| *m)
    }
}

impl WakeMap {
    pub fn new(domains: Vec<DomainMap>) -> Self {
        Self { domains }
    }

    pub fn from_profile(profile: &BoardProfile) -> SimResult<Self> {
        let mut domains = Vec::with_capacity(profile.precedence.len());
        for port_id in &profile.precedence {
            let port = profile.port(port_id).ok_or_else(|| {
                SimulationError::Profile(format!("precedence names unknown port '{}'", port_id))
            })?;
            let entries = profile
                .switches
                .iter()
                .filter(|s| &s.port == port_id)
                .map(|s| WakeEntry {
                    mask: s.mask(),
                    source: s.id,
                    pulses: s.pulses,
                })
                .collect();
            domains.push(DomainMap {
                domain: PortDomain(port.index),
                entries,
            });
        }
        Ok(Self { domains })
    }

    pub fn domains(&self) -> impl Iterator<Item = PortDomain> + '_ {
        self.domains.iter().map(|d| d.domain)
    }

    /// Pure decision over already-read masks. Domains missing from `masks`
    /// count as zero.
    pub fn decide(&self, masks: &[(PortDomain, u32)]) -> Resolution {
        for map in &self.domains {
            let mask = masks
                .iter()
                .find(|(d, _)| *d == map.domain)
                .map_or(0, |(_, m)| *m);
            if mask == 0 {
                continue;
            }
            return map
                .entries
                .iter()
                .find(|e| e.mask == mask)
                .map_or(Resolution::UNKNOWN, |e| Resolution {
                    source: Some(e.source),
                    pulses: e.pulses,
                });
        }
        Resolution::UNKNOWN
    }
}

#[derive(Debug, Clone)]
pub struct WakeupResolver {
    map: WakeMap,
}

impl WakeupResolver {
    pub fn new(map: WakeMap) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &WakeMap {
        &self.map
    }

    /// Read every domain's latch, decide the source, then clear every latch.
    pub fn resolve<P: LatchPort + ?Sized>(&self, latches: &mut P) -> WakeupEvent {
        let masks: Vec<(PortDomain, u32)> = self
            .map
            .domains()
            .map(|domain| {
                let mask = latches.read_latch(domain).unwrap_or_else(|e| {
                    tracing::warn!("Failed to read {} latch: {}", domain, e);
                    0
                });
                tracing::debug!("{} latch = {:#010x}", domain, mask);
                (domain, mask)
            })
            .collect();

        let resolution = self.map.decide(&masks);

        for domain in self.map.domains() {
            if let Err(e) = latches.clear_latch(domain) {
                tracing::warn!("Failed to clear {} latch: {}", domain, e);
            }
        }

        tracing::info!("Wakeup source: {}", resolution);
        WakeupEvent { masks, resolution }
    }
}
