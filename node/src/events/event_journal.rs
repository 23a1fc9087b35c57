// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Journal - Runtime State
//!
//! In-memory image of a journal file: the pending records ordered by
//! `sort_index`, the deduplication ledger, and the high-water mark.
//!
//! # Semantics
//! - The image only changes through [`EventJournal::apply`]
//! - Replay applies the recovered ops, live commits apply the ops they
//!   just wrote. Both paths go through the same function, so a reopened
//!   journal is identical to the one that was closed.

use crate::events::event_log::JournalOp;
use crate::events::ledger::DedupLedger;
use eventsync::StoredEvent;
use std::collections::BTreeMap;
use std::ops::Bound;

const SNAPSHOT_IDS_PER_OP: usize = 4096;

#[derive(Clone, Debug)]
pub struct EventJournal {
    records: BTreeMap<i64, StoredEvent>,
    ledger: DedupLedger,
    /// Highest `sort_index` ever assigned, including removed records.
    high_water: i64,
}

impl EventJournal {
    pub fn new(ledger_capacity: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            ledger: DedupLedger::new(ledger_capacity),
            high_water: 0,
        }
    }

    pub fn apply(&mut self, op: &JournalOp) {
        match op {
            JournalOp::Append(record) => {
                self.high_water = self.high_water.max(record.sort_index);
                self.records.insert(record.sort_index, record.clone());
            }
            JournalOp::Remove { sort_indices } => {
                for index in sort_indices {
                    self.records.remove(index);
                }
            }
            JournalOp::RecordIds(ids) => self.ledger.record_keys(ids.iter().cloned()),
            JournalOp::ResetLedger => self.ledger.reset(),
            JournalOp::HighWater(mark) => self.high_water = self.high_water.max(*mark),
        }
    }

    pub fn apply_all<'a>(&mut self, ops: impl IntoIterator<Item = &'a JournalOp>) {
        for op in ops {
            self.apply(op);
        }
    }

    /// Up to `limit` records with the lowest indices.
    pub fn next_batch(&self, limit: usize) -> Vec<StoredEvent> {
        self.records.values().take(limit).cloned().collect()
    }

    /// Up to `limit` records with an index strictly above `cursor`.
    pub fn batch_after(&self, cursor: i64, limit: usize) -> Vec<StoredEvent> {
        self.records
            .range((Bound::Excluded(cursor), Bound::Unbounded))
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn contains(&self, sort_index: i64) -> bool {
        self.records.contains_key(&sort_index)
    }

    /// Next index to assign.
    pub fn next_index(&self) -> i64 {
        self.high_water + 1
    }

    pub fn highest_index(&self) -> i64 {
        self.high_water
    }

    pub fn records(&self) -> impl Iterator<Item = &StoredEvent> {
        self.records.values()
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ops that rebuild this image from nothing. Used by compaction.
    ///
    /// The ledger is split over several `RecordIds` ops, oldest first, so no
    /// single op outgrows a frame.
    pub fn snapshot_ops(&self) -> Vec<JournalOp> {
        let keys: Vec<String> = self.ledger.keys().cloned().collect();
        let mut ops = Vec::with_capacity(self.records.len() + keys.len() / SNAPSHOT_IDS_PER_OP + 2);
        ops.push(JournalOp::HighWater(self.high_water));
        ops.extend(keys.chunks(SNAPSHOT_IDS_PER_OP).map(|chunk| JournalOp::RecordIds(chunk.to_vec())));
        ops.extend(self.records.values().cloned().map(JournalOp::Append));
        ops
    }
}
