// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Retained record kept in RAM that survives system off.
//!
//! Layout (little-endian, packed):
//!
//! ```text
//! Offset  Size  Field
//!   0       4   integrity_tag  CRC-32/IEEE over bytes 4..20
//!   4       4   boots
//!   8       4   off_count
//!  12       8   uptime_sum     kernel ticks
//! ```
//!
//! Counters wrap on overflow. Nothing saturates or reports it; a device that
//! lives long enough to wrap `boots` simply starts counting from zero again.

pub mod crc;

use crc::crc32_ieee;
use serde::{Deserialize, Serialize};

pub const RECORD_SIZE: usize = 20;
const TAG_LEN: usize = 4;

const _: () = assert!(RECORD_SIZE as u64 == sysoff_config::MIN_RETAINED_BYTES);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedRecord {
    pub integrity_tag: u32,
    pub boots: u32,
    pub off_count: u32,
    pub uptime_sum: u64,
}

impl RetainedRecord {
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..4].copy_from_slice(&self.integrity_tag.to_le_bytes());
        out[4..8].copy_from_slice(&self.boots.to_le_bytes());
        out[8..12].copy_from_slice(&self.off_count.to_le_bytes());
        out[12..20].copy_from_slice(&self.uptime_sum.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let mut sum = [0u8; 8];
        sum.copy_from_slice(&bytes[12..20]);
        Self {
            integrity_tag: u32_at(0),
            boots: u32_at(4),
            off_count: u32_at(8),
            uptime_sum: u64::from_le_bytes(sum),
        }
    }

    /// Tag over every byte that follows the tag field.
    pub fn compute_tag(&self) -> u32 {
        crc32_ieee(&self.to_bytes()[TAG_LEN..])
    }

    pub fn is_valid(&self) -> bool {
        self.integrity_tag == self.compute_tag()
    }
}

/// Backing storage for the retained record.
pub trait RetainedRegion {
    fn load(&self) -> [u8; RECORD_SIZE];
    fn store(&mut self, bytes: &[u8; RECORD_SIZE]);
}

impl<R: RetainedRegion + ?Sized> RetainedRegion for &mut R {
    fn load(&self) -> [u8; RECORD_SIZE] {
        (**self).load()
    }

    fn store(&mut self, bytes: &[u8; RECORD_SIZE]) {
        (**self).store(bytes)
    }
}

/// Single-writer handle over the retained region for one boot.
///
/// Field mutators only touch the working copy. Nothing reaches the region
/// until [`commit`](Self::commit), so an uncommitted mutation is lost on the
/// next power cycle.
#[derive(Debug)]
pub struct RetainedState<R: RetainedRegion> {
    region: R,
    record: RetainedRecord,
    /// Uptime already folded into `uptime_sum` during this boot. Volatile.
    uptime_mark: u64,
}

impl<R: RetainedRegion> RetainedState<R> {
    pub fn open(region: R) -> Self {
        let record = RetainedRecord::from_bytes(&region.load());
        Self {
            region,
            record,
            uptime_mark: 0,
        }
    }

    /// Recompute the tag over the stored record and compare. Does not modify
    /// the record.
    pub fn validate(&self) -> bool {
        RetainedRecord::from_bytes(&self.region.load()).is_valid()
    }

    /// Zero every counter. The tag is rewritten by the next `commit`.
    pub fn reset(&mut self) {
        self.record = RetainedRecord {
            integrity_tag: self.record.integrity_tag,
            ..RetainedRecord::default()
        };
    }

    pub fn commit(&mut self) {
        self.record.integrity_tag = self.record.compute_tag();
        self.region.store(&self.record.to_bytes());
        tracing::debug!(
            "Retained commit: boots={} off={} uptime={} tag={:#010x}",
            self.record.boots,
            self.record.off_count,
            self.record.uptime_sum,
            self.record.integrity_tag
        );
    }

    pub fn increment_boots(&mut self) {
        self.record.boots = self.record.boots.wrapping_add(1);
    }

    pub fn increment_off_count(&mut self) {
        self.record.off_count = self.record.off_count.wrapping_add(1);
    }

    pub fn add_uptime(&mut self, ticks: u64) {
        self.record.uptime_sum = self.record.uptime_sum.wrapping_add(ticks);
    }

    /// Fold the ticks elapsed since the previous accrual into `uptime_sum`.
    pub fn accrue_uptime(&mut self, now: u64) {
        let elapsed = now.wrapping_sub(self.uptime_mark);
        self.add_uptime(elapsed);
        self.uptime_mark = now;
    }

    pub fn record(&self) -> RetainedRecord {
        self.record
    }

    pub fn boots(&self) -> u32 {
        self.record.boots
    }

    pub fn off_count(&self) -> u32 {
        self.record.off_count
    }

    pub fn uptime_sum(&self) -> u64 {
        self.record.uptime_sum
    }

    pub fn into_region(self) -> R {
        self.region
    }
}
