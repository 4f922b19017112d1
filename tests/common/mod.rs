//! Shared test fixtures
//!
//! A small fixed-width record family used across the test crates.

#![allow(dead_code)]

use stratakv::RecordPolicy;

/// Value marking a slot as deleted
pub const TOMBSTONE_VALUE: u64 = u64::MAX;

/// A key/value record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub key: u64,
    pub value: u64,
}

/// Record family with a deliberately tiny capacity (16) so rotation and
/// overflow paths are easy to hit
pub struct SlotPolicy;

impl RecordPolicy for SlotPolicy {
    type Record = Slot;
    type Key = u64;
    const CAPACITY: usize = 16;

    fn key_of(record: &Slot) -> u64 {
        record.key
    }

    fn tombstone_from(key: u64) -> Slot {
        Slot {
            key,
            value: TOMBSTONE_VALUE,
        }
    }
}

/// Same record shape with room for randomized workloads
pub struct WideSlotPolicy;

impl RecordPolicy for WideSlotPolicy {
    type Record = Slot;
    type Key = u64;
    const CAPACITY: usize = 1024;

    fn key_of(record: &Slot) -> u64 {
        record.key
    }

    fn tombstone_from(key: u64) -> Slot {
        Slot {
            key,
            value: TOMBSTONE_VALUE,
        }
    }
}

pub fn slot(key: u64, value: u64) -> Slot {
    Slot { key, value }
}

/// Flusher that keeps every run it is handed, tagged with its snapshot
pub struct CollectFlusher<P: RecordPolicy> {
    pub runs: Vec<(u64, Vec<P::Record>)>,
}

impl<P: RecordPolicy> CollectFlusher<P> {
    pub fn new() -> Self {
        CollectFlusher { runs: Vec::new() }
    }

    /// Total records across all collected runs
    pub fn records_flushed(&self) -> usize {
        self.runs.iter().map(|(_, run)| run.len()).sum()
    }
}

impl<P: RecordPolicy> stratakv::Flusher<P> for CollectFlusher<P> {
    fn flush(&mut self, snapshot_min: u64, records: &[P::Record]) -> stratakv::Result<()> {
        self.runs.push((snapshot_min, records.to_vec()));
        Ok(())
    }
}
