// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable Event Pipeline
//!
//! # Architecture
//! - Event Log = one checksummed frame per transaction (append-only)
//! - Journal = in-memory image rebuilt by replaying the log
//! - Store = the only writer; applies to the journal what it just logged
//! - Processor = drains a store in order, deleting after consumption
//!
//! # Guarantees
//! - Every acknowledged write has been fsync'd
//! - No partial transactions survive a crash
//! - Replay reproduces exactly the state that was written

pub mod event_log;
pub mod event_journal;
pub mod event_replay;
pub mod event_store;
pub mod ledger;
pub mod processor;

pub use event_journal::EventJournal;
pub use event_log::{EventLogWriter, JournalOp, Transaction};
pub use event_replay::{recover_journal, RecoveredJournal};
pub use event_store::{EventStore, IngestOutcome, StoreOptions};
pub use ledger::DedupLedger;
pub use processor::{BatchProcessor, DeliveryMode, DrainReport};
