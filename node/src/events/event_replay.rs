// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Replay - Recovery
//!
//! Rebuilds an [`EventJournal`] from its file.
//!
//! # Recovery Protocol
//! 1. Scan frames, verifying header, checksums and sequence
//! 2. Decode each frame into a transaction
//! 3. Apply every op in file order
//!
//! # Invariants
//! - Torn tail (interrupted append) → dropped, previous state recovered
//! - Corruption anywhere before the tail → fail closed
//! - replay(file) = the state that wrote it

use crate::errors::{Result, StoreError};
use crate::events::event_journal::EventJournal;
use crate::events::event_log::Transaction;
use crate::telemetry;
use eventsync_persistence::{read_frames, FrameScan};
use std::path::Path;
use std::time::Instant;

/// Journal state recovered from disk, plus the scan needed to resume
/// appending to the same file.
#[derive(Debug)]
pub struct RecoveredJournal {
    pub journal: EventJournal,
    pub scan: FrameScan,
    pub transactions: usize,
}

/// Replays the journal at `path`. The file must exist.
pub fn recover_journal(path: impl AsRef<Path>, ledger_capacity: usize) -> Result<RecoveredJournal> {
    let path = path.as_ref();
    let started = Instant::now();

    let scan = read_frames(path)?;
    if scan.torn_tail {
        tracing::warn!(
            "Journal {:?} has a torn tail past byte {}; discarding incomplete transaction",
            path,
            scan.valid_len
        );
    }

    let mut journal = EventJournal::new(ledger_capacity);
    for frame in &scan.frames {
        let txn = Transaction::decode(&frame.payload).map_err(|e| {
            StoreError::Corrupted(format!(
                "transaction {} at offset {}: {}",
                frame.header.seq, frame.offset, e
            ))
        })?;
        journal.apply_all(&txn.ops);
    }

    let transactions = scan.frames.len();
    tracing::info!(
        "Replayed {} transactions from {:?}: {} pending events, high-water {}",
        transactions,
        path,
        journal.len(),
        journal.highest_index()
    );
    metrics::histogram!(telemetry::RECOVERY_DURATION, started.elapsed().as_secs_f64());

    Ok(RecoveredJournal { journal, scan, transactions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_log::{EventLogWriter, JournalOp};
    use eventsync::{EventSource, RawEvent, StoredEvent};
    use serde_json::json;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::tempdir;

    fn append(index: i64) -> JournalOp {
        let event = RawEvent::new(None, json!({ "type": "user.update", "n": index }), EventSource::Download);
        JournalOp::Append(StoredEvent::from_event(&event, index))
    }

    #[test]
    fn test_replay_applies_transactions_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.journal");

        let mut writer = EventLogWriter::create(&path, true).unwrap();
        writer.commit(&Transaction::new(vec![append(1), append(2), append(3)])).unwrap();
        writer.commit(&Transaction::new(vec![JournalOp::Remove { sort_indices: vec![1] }])).unwrap();
        writer.commit(&Transaction::new(vec![JournalOp::RecordIds(vec!["a".into()])])).unwrap();

        let recovered = recover_journal(&path, 16).unwrap();
        assert_eq!(recovered.transactions, 3);
        assert!(!recovered.scan.torn_tail);

        let indices: Vec<i64> = recovered.journal.next_batch(10).iter().map(|r| r.sort_index).collect();
        assert_eq!(indices, vec![2, 3]);
        assert!(recovered.journal.ledger().contains("a"));
        assert_eq!(recovered.journal.highest_index(), 3);
    }

    #[test]
    fn test_interrupted_transaction_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.journal");

        let mut writer = EventLogWriter::create(&path, true).unwrap();
        writer.commit(&Transaction::new(vec![append(1)])).unwrap();
        drop(writer);

        // Half of a frame header.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[7u8; 9]).unwrap();
        drop(file);

        let recovered = recover_journal(&path, 16).unwrap();
        assert!(recovered.scan.torn_tail);
        assert_eq!(recovered.journal.len(), 1);
    }

    #[test]
    fn test_undecodable_transaction_fails_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.journal");

        let mut frames = eventsync_persistence::FrameWriter::create(&path, true).unwrap();
        frames.append(&[0xff, 0xff, 0xff]).unwrap();
        drop(frames);

        let err = recover_journal(&path, 16).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted(_)));
    }
}
