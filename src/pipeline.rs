//! Write Pipeline Module
//!
//! Coordinates a pair of tables through the freeze/flush/thaw cycle.
//!
//! ## Responsibilities
//! - Enforce capacity and lifecycle discipline on behalf of the tables
//! - Rotate roles between the mutable and immutable buffer
//! - Hand frozen runs to the flusher cooperatively (same thread,
//!   run-to-completion) and record completion
//! - Route deletions through the record policy's tombstone encoding
//!
//! The pipeline is single-threaded and non-suspending: no locks, no atomics,
//! no allocation after construction. While a frozen run is being scanned by
//! the flusher nothing else touches it, because the flush is a plain call on
//! the owning thread.

use crate::config::Config;
use crate::error::{Result, StrataError};
use crate::memtable::{RecordPolicy, TableMemory, TableState};

/// Consumer of frozen runs.
///
/// Receives the used record slice of an immutable table together with the
/// snapshot it was frozen at. Records arrive in ascending key order.
pub trait Flusher<P: RecordPolicy> {
    /// Write one frozen run. An `Err` leaves the run frozen and unflushed;
    /// the pipeline retries it on the next rotation.
    fn flush(&mut self, snapshot_min: u64, records: &[P::Record]) -> Result<()>;
}

/// Two-buffer write pipeline for one record family
///
/// One table accepts inserts while the other holds the previously frozen
/// run. Rotation freezes the mutable side, swaps the roles, and flushes the
/// fresh run; the just-reclaimed side resumes accepting inserts without any
/// reallocation.
pub struct WritePipeline<P: RecordPolicy, F: Flusher<P>> {
    /// Side currently accepting inserts
    mutable: TableMemory<P>,

    /// Side holding the most recently frozen run
    immutable: TableMemory<P>,

    /// Consumer of frozen runs
    flusher: F,

    /// Monotonic snapshot counter; incremented at every rotation
    snapshot: u64,

    /// Record count at which `put` rotates before inserting
    freeze_watermark: usize,
}

impl<P: RecordPolicy, F: Flusher<P>> WritePipeline<P, F> {
    /// Construct a pipeline, allocating both tables up front.
    ///
    /// The immutable side starts in the already-flushed immutable shape so
    /// the first rotation can thaw it without a preceding flush.
    pub fn new(config: Config, flusher: F) -> Result<Self> {
        let freeze_watermark = match config.freeze_watermark {
            0 => P::CAPACITY,
            w if w > P::CAPACITY => {
                return Err(StrataError::Config(format!(
                    "freeze watermark {w} exceeds table capacity {}",
                    P::CAPACITY
                )))
            }
            w => w,
        };

        let mutable = TableMemory::new(TableState::Mutable, config.label)?;
        let immutable = TableMemory::new(
            TableState::Immutable {
                flushed: true,
                snapshot_min: 0,
            },
            config.label,
        )?;

        Ok(WritePipeline {
            mutable,
            immutable,
            flusher,
            snapshot: config.initial_snapshot,
            freeze_watermark,
        })
    }

    /// Insert a record, rotating first if the mutable side has reached the
    /// freeze watermark.
    ///
    /// On a flush error the record is not inserted; the caller may retry.
    pub fn put(&mut self, record: P::Record) -> Result<()> {
        if self.mutable.len() >= self.freeze_watermark {
            self.rotate()?;
        }
        self.mutable.put(record);
        Ok(())
    }

    /// Insert a tombstone for `key`.
    pub fn delete(&mut self, key: P::Key) -> Result<()> {
        self.put(P::tombstone_from(key))
    }

    /// Force a rotation regardless of fill, e.g. at a checkpoint.
    ///
    /// Freezing an empty table is harmless: the run is born flushed and never
    /// reaches the flusher.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.rotate()
    }

    /// Look up the current record for `key` among resident records.
    ///
    /// Verification builds only. Probes the mutable side first (it holds the
    /// most recent writes), then the immutable side. Records already handed
    /// to the flusher are outside the pipeline's reach.
    #[cfg(debug_assertions)]
    pub fn get(&mut self, key: P::Key) -> Option<&P::Record> {
        let hit = self.mutable.get(key);
        if hit.is_some() {
            return hit;
        }
        self.immutable.get(key)
    }

    /// Records resident across both buffers
    pub fn len(&self) -> usize {
        self.mutable.len() + self.immutable.len()
    }

    /// Check if both buffers are empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot number of the most recent rotation
    pub fn snapshot(&self) -> u64 {
        self.snapshot
    }

    /// The side currently accepting inserts
    pub fn table_mutable(&self) -> &TableMemory<P> {
        &self.mutable
    }

    /// The side holding the most recently frozen run
    pub fn table_immutable(&self) -> &TableMemory<P> {
        &self.immutable
    }

    /// The flush consumer
    pub fn flusher(&self) -> &F {
        &self.flusher
    }

    /// Freeze the mutable side and swap roles.
    ///
    /// A previous run whose flush failed is retried before its table is
    /// reclaimed, so no frozen run is ever dropped.
    fn rotate(&mut self) -> Result<()> {
        self.flush_pending()?;
        self.immutable.thaw();

        self.snapshot += 1;
        self.mutable.freeze(self.snapshot);
        std::mem::swap(&mut self.mutable, &mut self.immutable);
        tracing::debug!(
            snapshot = self.snapshot,
            len = self.immutable.len(),
            "pipeline rotated"
        );

        self.flush_pending()
    }

    /// Flush the immutable side if its run has not been written yet.
    fn flush_pending(&mut self) -> Result<()> {
        let TableState::Immutable {
            flushed,
            snapshot_min,
        } = self.immutable.state()
        else {
            unreachable!("immutable side of the pipeline is always immutable");
        };
        if flushed {
            return Ok(());
        }

        self.flusher
            .flush(snapshot_min, self.immutable.values_used())?;
        self.immutable.mark_flushed();
        Ok(())
    }
}
