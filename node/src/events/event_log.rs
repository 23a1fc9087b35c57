// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Journal Log
//!
//! Every mutation of a journal is written as one [`Transaction`] in one
//! checksummed frame. A transaction is either entirely on disk or, after a
//! crash mid-write, entirely absent; there is no state in between.
//!
//! Transactions are bincode encoded. Payloads stay JSON text inside
//! [`StoredEvent`] so the binary encoding never has to understand them.
//!
//! A frame holds at most [`MAX_TRANSACTION_BYTES`]. Work larger than that,
//! such as the snapshot written by compaction, is split with
//! [`pack_transactions`] into several transactions that are each valid on
//! their own.

use crate::errors::{Result, StoreError};
use eventsync::StoredEvent;
use eventsync_persistence::{FrameScan, FrameWriter, PersistenceError, MAX_FRAME_LEN};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalOp {
    /// Enqueue a record. Its `sort_index` is above every index seen before.
    Append(StoredEvent),
    /// Remove consumed records. Unknown indices are ignored.
    Remove { sort_indices: Vec<i64> },
    /// Add identifiers to the deduplication ledger, oldest first.
    RecordIds(Vec<String>),
    ResetLedger,
    /// Highest index ever assigned. Written by compaction so the sequence
    /// survives even when no record is left to carry it.
    HighWater(i64),
}

/// Largest encoded transaction that fits in one frame.
pub const MAX_TRANSACTION_BYTES: usize = MAX_FRAME_LEN;

/// Upper bound on what a transaction adds around its ops: the op count,
/// plus the tag and length of one `RecordIds` op.
pub const TRANSACTION_OVERHEAD: usize = 32;

impl JournalOp {
    /// Size of this op inside an encoded transaction.
    pub fn encoded_len(&self) -> Result<usize> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map(|bytes| bytes.len())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub ops: Vec<JournalOp>,
}

impl Transaction {
    pub fn new(ops: Vec<JournalOp>) -> Self {
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (txn, read) = bincode::serde::decode_from_slice::<Transaction, _>(bytes, bincode::config::standard())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if read != bytes.len() {
            return Err(StoreError::Corrupted(format!(
                "transaction has {} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(txn)
    }
}

/// Splits `ops` in order into transactions of at most `budget` encoded
/// bytes. Fails without splitting anything if a single op is too large.
pub fn pack_transactions(ops: Vec<JournalOp>, budget: usize) -> Result<Vec<Transaction>> {
    let mut txns = Vec::new();
    let mut current = Vec::new();
    let mut size = TRANSACTION_OVERHEAD;

    for op in ops {
        let len = op.encoded_len()?;
        if TRANSACTION_OVERHEAD + len > budget {
            return Err(PersistenceError::FrameTooLarge(TRANSACTION_OVERHEAD + len).into());
        }
        if size + len > budget {
            txns.push(Transaction::new(std::mem::take(&mut current)));
            size = TRANSACTION_OVERHEAD;
        }
        size += len;
        current.push(op);
    }
    if !current.is_empty() {
        txns.push(Transaction::new(current));
    }
    Ok(txns)
}

/// Journal file writer.
///
/// # Safety Guarantees
/// - `commit` returns only after the frame is written (and fsync'd when
///   sync is on)
/// - A transaction is never split across frames
pub struct EventLogWriter {
    frames: FrameWriter,
}

impl EventLogWriter {
    pub fn create(path: impl AsRef<Path>, sync: bool) -> Result<Self> {
        Ok(Self { frames: FrameWriter::create(path, sync)? })
    }

    /// Continue a journal after recovery, dropping any torn tail.
    pub fn resume(path: impl AsRef<Path>, scan: &FrameScan, sync: bool) -> Result<Self> {
        Ok(Self { frames: FrameWriter::resume(path, scan, sync)? })
    }

    /// Replace the whole journal with `txns`. On failure the old journal is
    /// left in place.
    pub fn rewrite(path: impl AsRef<Path>, txns: &[Transaction], sync: bool) -> Result<Self> {
        let payloads = txns.iter().map(Transaction::encode).collect::<Result<Vec<_>>>()?;
        Ok(Self { frames: FrameWriter::rewrite(path, &payloads, sync)? })
    }

    pub fn commit(&mut self, txn: &Transaction) -> Result<()> {
        let payload = txn.encode()?;
        self.frames.append(&payload)?;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.frames.sync()?;
        Ok(())
    }

    /// Journal size in bytes.
    pub fn len(&self) -> u64 {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of transactions in the file.
    pub fn transaction_count(&self) -> u64 {
        self.frames.next_seq() - 1
    }

    pub fn path(&self) -> &Path {
        self.frames.path()
    }
}
