// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Store
//!
//! Durable, ordered holding area for events awaiting consumption. One store
//! owns one journal file; the records, the deduplication ledger and the
//! index high-water mark all live in it.
//!
//! # Guarantees
//! - Every mutating call writes one transaction and returns only once it is
//!   durable. Input too large for one frame is written as several
//!   transactions, each carrying its own events and identifiers.
//! - In-memory state is updated only after a write succeeded. A failed call
//!   leaves the store unchanged, except that the already written
//!   transactions of a multi-frame ingest are kept.
//! - Indices are strictly increasing and never reused, including across
//!   compaction and reopen
//! - A failed automatic compaction never fails the delete that triggered it

use crate::config::JournalConfig;
use crate::errors::Result;
use crate::events::event_journal::EventJournal;
use crate::events::event_log::{
    pack_transactions, EventLogWriter, JournalOp, Transaction, MAX_TRANSACTION_BYTES, TRANSACTION_OVERHEAD,
};
use crate::events::event_replay::recover_journal;
use crate::events::ledger::DedupLedger;
use crate::paths::prepare_journal_path;
use crate::telemetry;
use eventsync::{RawEvent, StoredEvent, StreamName};
use eventsync_persistence::{read_frames, PersistenceError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Durability and retention knobs of a single store.
#[derive(Clone, Copy, Debug)]
pub struct StoreOptions {
    pub ledger_capacity: usize,
    pub sync_writes: bool,
    pub compaction_threshold_bytes: u64,
}

impl From<&JournalConfig> for StoreOptions {
    fn from(cfg: &JournalConfig) -> Self {
        Self {
            ledger_capacity: cfg.ledger_capacity,
            sync_writes: cfg.sync_writes,
            compaction_threshold_bytes: cfg.compaction_threshold_bytes,
        }
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from(&JournalConfig::default())
    }
}

/// Result of an ingest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub appended: usize,
    pub duplicates: usize,
    /// Index of the last appended record, or the unchanged high-water mark
    /// when nothing was appended.
    pub last_index: i64,
}

/// Encoded size of one hyphenated UUID in a `RecordIds` op.
const LEDGER_KEY_COST: usize = 40;

pub struct EventStore {
    stream: StreamName,
    path: PathBuf,
    writer: EventLogWriter,
    journal: EventJournal,
    options: StoreOptions,
    /// Journal length right after the last open or compaction.
    baseline_len: u64,
    /// Largest encoded transaction written in one frame.
    frame_budget: usize,
}

impl EventStore {
    /// Opens the journal of `stream` for the configured account, relocating
    /// a legacy journal into place first if needed.
    pub fn open(config: &JournalConfig, stream: StreamName) -> Result<Self> {
        let path = prepare_journal_path(&config.root_dir, config.account_id, &stream)?;
        Self::open_at(path, stream, StoreOptions::from(config))
    }

    /// Opens (or creates) the journal at an explicit path.
    pub fn open_at(path: impl Into<PathBuf>, stream: StreamName, options: StoreOptions) -> Result<Self> {
        let path = path.into();

        let (journal, writer) = if path.exists() {
            let recovered = recover_journal(&path, options.ledger_capacity)?;
            let writer = EventLogWriter::resume(&path, &recovered.scan, options.sync_writes)?;
            (recovered.journal, writer)
        } else {
            tracing::info!("Creating journal {:?} for stream {}", path, stream);
            let writer = EventLogWriter::create(&path, options.sync_writes)?;
            (EventJournal::new(options.ledger_capacity), writer)
        };

        let baseline_len = writer.len();
        Ok(Self {
            stream,
            path,
            writer,
            journal,
            options,
            baseline_len,
            frame_budget: MAX_TRANSACTION_BYTES,
        })
    }

    /// Appends `events` in order with consecutive indices above every index
    /// assigned so far. Callers are expected to have filtered duplicates.
    pub fn append(&mut self, events: &[RawEvent]) -> Result<i64> {
        let (ops, last_index) = self.append_ops(events);
        if ops.is_empty() {
            return Ok(last_index);
        }
        for txn in pack_transactions(ops, self.frame_budget)? {
            self.commit(txn)?;
        }
        metrics::counter!(telemetry::EVENTS_APPENDED, events.len() as u64);
        Ok(last_index)
    }

    /// The subset of `events` not yet recorded in the ledger, plus the number
    /// dropped as duplicates.
    pub fn filter_new(&self, events: Vec<RawEvent>) -> (Vec<RawEvent>, usize) {
        let (fresh, duplicates) = self.journal.ledger().filter_new(events);
        if duplicates > 0 {
            tracing::debug!("Dropped {} duplicate events on stream {}", duplicates, self.stream);
            metrics::counter!(telemetry::EVENTS_DEDUPLICATED, duplicates as u64);
        }
        (fresh, duplicates)
    }

    /// Appends `events` and records their identifiers in the ledger within
    /// the same transaction. Each event shares its transaction with its
    /// identifier, also when the input spans several frames.
    pub fn commit_ingest(&mut self, events: &[RawEvent]) -> Result<IngestOutcome> {
        let mut last_index = self.journal.highest_index();
        for chunk in self.frame_chunks(events)? {
            let (mut ops, last) = self.append_ops(chunk);
            let keys = self.journal.ledger().keys_to_record(chunk);
            if !keys.is_empty() {
                ops.push(JournalOp::RecordIds(keys));
            }
            if !ops.is_empty() {
                self.commit(Transaction::new(ops))?;
            }
            last_index = last;
        }
        if !events.is_empty() {
            metrics::counter!(telemetry::EVENTS_APPENDED, events.len() as u64);
        }
        Ok(IngestOutcome { appended: events.len(), duplicates: 0, last_index })
    }

    /// Filter, append and record as one durable unit.
    pub fn ingest(&mut self, events: Vec<RawEvent>) -> Result<IngestOutcome> {
        let (fresh, duplicates) = self.filter_new(events);
        let outcome = self.commit_ingest(&fresh)?;
        Ok(IngestOutcome { duplicates, ..outcome })
    }

    /// Records identifiers without appending anything.
    pub fn record_ids(&mut self, events: &[RawEvent]) -> Result<()> {
        let keys = self.journal.ledger().keys_to_record(events);
        if keys.is_empty() {
            return Ok(());
        }
        self.commit(Transaction::new(vec![JournalOp::RecordIds(keys)]))
    }

    pub fn next_batch(&self, batch_size: usize) -> Vec<StoredEvent> {
        self.journal.next_batch(batch_size)
    }

    pub fn batch_after(&self, cursor: i64, batch_size: usize) -> Vec<StoredEvent> {
        self.journal.batch_after(cursor, batch_size)
    }

    /// Removes `records`. Records that are already gone are ignored.
    /// Returns the number actually removed.
    ///
    /// May compact the journal afterwards. If that fails the current journal
    /// is kept and the removal still counts.
    pub fn delete(&mut self, records: &[StoredEvent]) -> Result<usize> {
        let sort_indices: Vec<i64> = records
            .iter()
            .map(|r| r.sort_index)
            .filter(|&i| self.journal.contains(i))
            .collect();
        if sort_indices.is_empty() {
            return Ok(0);
        }

        let removed = sort_indices.len();
        self.commit(Transaction::new(vec![JournalOp::Remove { sort_indices }]))?;

        if self.needs_compaction() {
            if let Err(e) = self.rewrite_journal() {
                tracing::warn!("Compaction of {:?} failed, keeping the current journal: {}", self.path, e);
                self.reattach()?;
            }
        }
        Ok(removed)
    }

    /// Highest index ever assigned on this stream; 0 for a fresh journal.
    pub fn highest_index(&self) -> i64 {
        self.journal.highest_index()
    }

    pub fn len(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    pub fn ledger(&self) -> &DedupLedger {
        self.journal.ledger()
    }

    pub fn reset_dedup_ledger(&mut self) -> Result<()> {
        tracing::info!("Resetting deduplication ledger of stream {}", self.stream);
        self.commit(Transaction::new(vec![JournalOp::ResetLedger]))
    }

    /// Rewrites the journal to the fewest transactions reproducing the
    /// current state.
    pub fn compact(&mut self) -> Result<()> {
        if let Err(e) = self.rewrite_journal() {
            self.reattach()?;
            return Err(e);
        }
        Ok(())
    }

    fn rewrite_journal(&mut self) -> Result<()> {
        let before = self.writer.len();
        let txns = pack_transactions(self.journal.snapshot_ops(), self.frame_budget)?;
        self.writer = EventLogWriter::rewrite(&self.path, &txns, self.options.sync_writes)?;
        self.baseline_len = self.writer.len();
        tracing::info!(
            "Compacted journal {:?}: {} -> {} bytes, {} pending events",
            self.path,
            before,
            self.baseline_len,
            self.journal.len()
        );
        Ok(())
    }

    /// Journal size in bytes.
    pub fn journal_len(&self) -> u64 {
        self.writer.len()
    }

    /// Flushes and releases the journal.
    pub fn close(mut self) -> Result<()> {
        self.writer.sync()?;
        tracing::debug!("Closed journal {:?}", self.path);
        Ok(())
    }

    /// Removes the journal file. Used on account logout.
    pub fn destroy(self) -> Result<()> {
        let Self { path, writer, .. } = self;
        drop(writer);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!("Destroyed journal {:?}", path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stream(&self) -> &StreamName {
        &self.stream
    }

    fn append_ops(&self, events: &[RawEvent]) -> (Vec<JournalOp>, i64) {
        let first = self.journal.next_index();
        let ops: Vec<JournalOp> = events
            .iter()
            .zip(first..)
            .map(|(event, index)| JournalOp::Append(StoredEvent::from_event(event, index)))
            .collect();
        let last_index = first - 1 + events.len() as i64;
        (ops, last_index)
    }

    /// Splits `events` so each slice fits in one frame together with its
    /// identifiers.
    fn frame_chunks<'a>(&self, events: &'a [RawEvent]) -> Result<Vec<&'a [RawEvent]>> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut size = TRANSACTION_OVERHEAD;

        for (i, event) in events.iter().enumerate() {
            // The largest index gives an upper bound on the encoded size.
            let mut cost = JournalOp::Append(StoredEvent::from_event(event, i64::MAX)).encoded_len()?;
            if event.id.is_some() {
                cost += LEDGER_KEY_COST;
            }
            if TRANSACTION_OVERHEAD + cost > self.frame_budget {
                return Err(PersistenceError::FrameTooLarge(TRANSACTION_OVERHEAD + cost).into());
            }
            if size + cost > self.frame_budget {
                chunks.push(&events[start..i]);
                start = i;
                size = TRANSACTION_OVERHEAD;
            }
            size += cost;
        }
        if start < events.len() {
            chunks.push(&events[start..]);
        }
        Ok(chunks)
    }

    /// Points the writer at the file now at `path`. After a failed rewrite
    /// that is either the old journal or the complete new one; both hold
    /// the in-memory state.
    fn reattach(&mut self) -> Result<()> {
        let scan = read_frames(&self.path)?;
        self.writer = EventLogWriter::resume(&self.path, &scan, self.options.sync_writes)?;
        self.baseline_len = self.writer.len();
        Ok(())
    }

    fn commit(&mut self, txn: Transaction) -> Result<()> {
        self.writer.commit(&txn)?;
        self.journal.apply_all(&txn.ops);
        Ok(())
    }

    fn needs_compaction(&self) -> bool {
        let len = self.writer.len();
        len > self.options.compaction_threshold_bytes && len > self.baseline_len.saturating_mul(2)
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("stream", &self.stream)
            .field("path", &self.path)
            .field("pending", &self.journal.len())
            .field("highest_index", &self.journal.highest_index())
            .finish()
    }
}
