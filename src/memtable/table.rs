//! TableMemory implementation
//!
//! Fixed-capacity record buffer with a mutable/immutable lifecycle.
//! Storage is reserved once at construction; sorting is deferred to the
//! freeze transition so the insert path stays a bounds check, a store, and
//! one key comparison.

use crate::error::{Result, StrataError};
use crate::search;

use super::{RecordPolicy, TableState};

/// In-memory table for one record family
///
/// Cycles through `Mutable -> Immutable -> flushed -> Mutable` for the whole
/// engine lifetime, reusing the same backing storage. All preconditions are
/// contract assertions: the write pipeline is the gatekeeper of capacity and
/// lifecycle, and violations fail loudly instead of being recovered.
pub struct TableMemory<P: RecordPolicy> {
    /// The only record memory the table owns. Reserved for exactly
    /// `P::CAPACITY` records up front and never resized; the used prefix is
    /// `records[0..len)`.
    records: Vec<P::Record>,

    /// Scratch for the deferred sort: (key, original position) pairs.
    /// Reserved at construction so sorting never allocates.
    sort_scratch: Vec<(P::Key, usize)>,

    /// Conservative sortedness flag. `true` guarantees the used prefix is
    /// non-decreasing by key; `false` guarantees nothing.
    is_sorted: bool,

    /// Lifecycle phase
    state: TableState,

    /// Diagnostic name
    label: &'static str,
}

impl<P: RecordPolicy> TableMemory<P> {
    /// Create a table, reserving the record region and the sort scratch for
    /// `P::CAPACITY` records.
    ///
    /// This is the only allocating operation in the table's lifetime; failure
    /// surfaces as [`StrataError::OutOfMemory`]. `initial` is either
    /// `Mutable` or `Immutable { flushed: true, .. }`; the latter is the
    /// shape a pipeline needs for the buffer that starts on the immutable
    /// side of the pair.
    pub fn new(initial: TableState, label: &'static str) -> Result<Self> {
        if let TableState::Immutable { flushed, .. } = initial {
            assert!(
                flushed,
                "table \"{label}\": initial immutable state must be flushed"
            );
        }

        let mut records = Vec::new();
        records
            .try_reserve_exact(P::CAPACITY)
            .map_err(|_| StrataError::OutOfMemory {
                label,
                records: P::CAPACITY,
            })?;

        let mut sort_scratch = Vec::new();
        sort_scratch
            .try_reserve_exact(P::CAPACITY)
            .map_err(|_| StrataError::OutOfMemory {
                label,
                records: P::CAPACITY,
            })?;

        Ok(TableMemory {
            records,
            sort_scratch,
            is_sorted: true,
            state: initial,
            label,
        })
    }

    /// Return the table to a known empty shape without touching storage.
    ///
    /// The state *tag* is preserved: a mutable table resets to `Mutable`, an
    /// immutable table resets to `Immutable { flushed: true, snapshot_min: 0 }`.
    pub fn reset(&mut self) {
        self.records.clear();
        self.is_sorted = true;
        self.state = match self.state {
            TableState::Mutable => TableState::Mutable,
            TableState::Immutable { .. } => TableState::Immutable {
                flushed: true,
                snapshot_min: 0,
            },
        };
        tracing::trace!(label = self.label, "table reset");
    }

    /// Append a record.
    ///
    /// Requires `Mutable` state and a non-full table. The sortedness flag is
    /// weakened by comparing the previous last key against the new key with
    /// `<=`: duplicate keys do not break sort order, since the caller may
    /// legitimately insert updates to the same key within one buffer.
    pub fn put(&mut self, record: P::Record) {
        assert!(
            matches!(self.state, TableState::Mutable),
            "table \"{}\": put on immutable table",
            self.label
        );
        assert!(
            self.records.len() < P::CAPACITY,
            "table \"{}\": put on full table (capacity {})",
            self.label,
            P::CAPACITY
        );

        if self.is_sorted {
            if let Some(last) = self.records.last() {
                self.is_sorted = P::key_of(last) <= P::key_of(&record);
            }
        }
        self.records.push(record);
    }

    /// Look up the current record for `key`.
    ///
    /// Verification builds only; production lookups are served by an external
    /// cache layer. Sorts lazily if needed (legal even on an immutable table,
    /// as an idempotent canonicalization), then probes with an upper-bound
    /// search so that, among duplicates, the last-inserted record wins.
    ///
    /// Takes `&mut self`; a borrow from [`values_used`](Self::values_used)
    /// cannot be held across this call.
    #[cfg(debug_assertions)]
    pub fn get(&mut self, key: P::Key) -> Option<&P::Record> {
        self.sort_if_needed();

        let upper = search::upper_bound(&self.records, key, P::key_of);
        let last_le = upper.checked_sub(1)?;
        let record = &self.records[last_le];
        (P::key_of(record) == key).then_some(record)
    }

    /// Freeze the table for flushing.
    ///
    /// Canonicalizes sort order and tags the table with the snapshot it was
    /// frozen at. An empty table is born already flushed: there is nothing to
    /// write.
    pub fn freeze(&mut self, snapshot_min: u64) {
        assert!(
            matches!(self.state, TableState::Mutable),
            "table \"{}\": freeze on immutable table",
            self.label
        );

        self.sort_if_needed();
        self.state = TableState::Immutable {
            flushed: self.records.is_empty(),
            snapshot_min,
        };
        tracing::debug!(
            label = self.label,
            len = self.records.len(),
            snapshot_min,
            "table frozen"
        );
    }

    /// Record flush completion. Only the flusher asserts this, and only
    /// [`thaw`](Self::thaw) consumes it.
    pub fn mark_flushed(&mut self) {
        match &mut self.state {
            TableState::Immutable {
                flushed,
                snapshot_min,
            } => {
                assert!(
                    !*flushed,
                    "table \"{}\": flush completion recorded twice",
                    self.label
                );
                *flushed = true;
                tracing::debug!(
                    label = self.label,
                    snapshot_min = *snapshot_min,
                    "run flushed"
                );
            }
            TableState::Mutable => {
                panic!("table \"{}\": mark_flushed on mutable table", self.label)
            }
        }
    }

    /// Return a flushed immutable table to empty mutable service.
    ///
    /// Storage and label are retained; nothing is reallocated across the
    /// whole freeze/flush/thaw cycle.
    pub fn thaw(&mut self) {
        match self.state {
            TableState::Immutable { flushed, .. } => assert!(
                flushed,
                "table \"{}\": thaw before flush completion",
                self.label
            ),
            TableState::Mutable => {
                panic!("table \"{}\": thaw on mutable table", self.label)
            }
        }
        debug_assert!(self.is_sorted);

        self.records.clear();
        self.is_sorted = true;
        self.state = TableState::Mutable;
        tracing::trace!(label = self.label, "table thawed");
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the used prefix is known to be sorted
    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    /// Current lifecycle state
    pub fn state(&self) -> TableState {
        self.state
    }

    /// Diagnostic label
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The used record prefix. Valid until the next mutating call.
    pub fn values_used(&self) -> &[P::Record] {
        &self.records
    }

    /// Smallest key in the table. Requires an immutable, non-empty table.
    pub fn key_min(&self) -> P::Key {
        assert!(
            matches!(self.state, TableState::Immutable { .. }),
            "table \"{}\": key_min on mutable table",
            self.label
        );
        assert!(
            !self.records.is_empty(),
            "table \"{}\": key_min on empty table",
            self.label
        );
        P::key_of(&self.records[0])
    }

    /// Largest key in the table. Requires an immutable, non-empty table.
    pub fn key_max(&self) -> P::Key {
        assert!(
            matches!(self.state, TableState::Immutable { .. }),
            "table \"{}\": key_max on mutable table",
            self.label
        );
        assert!(
            !self.records.is_empty(),
            "table \"{}\": key_max on empty table",
            self.label
        );
        P::key_of(&self.records[self.records.len() - 1])
    }

    /// Sort the used prefix in place if the flag says it may be unsorted.
    ///
    /// The sort primitive is unstable, so ties carry the original position:
    /// insertion order among equal keys decides which record an upper-bound
    /// lookup resolves to. Nothing allocates here; both the pair scratch and
    /// the record region were reserved at construction.
    fn sort_if_needed(&mut self) {
        if self.is_sorted {
            return;
        }

        debug_assert!(self.sort_scratch.is_empty());
        self.sort_scratch.extend(
            self.records
                .iter()
                .enumerate()
                .map(|(position, record)| (P::key_of(record), position)),
        );
        self.sort_scratch.sort_unstable();

        // scratch[rank] now names the source position of the record that
        // belongs at rank. Walk each permutation cycle, swapping records into
        // place and marking finished ranks with a self-reference.
        for start in 0..self.sort_scratch.len() {
            let mut rank = start;
            let mut source = self.sort_scratch[rank].1;
            while source != start {
                self.records.swap(rank, source);
                self.sort_scratch[rank].1 = rank;
                rank = source;
                source = self.sort_scratch[rank].1;
            }
            self.sort_scratch[rank].1 = rank;
        }
        self.sort_scratch.clear();

        self.is_sorted = true;
        debug_assert!(search::is_sorted_by_key(&self.records, P::key_of));
    }
}
