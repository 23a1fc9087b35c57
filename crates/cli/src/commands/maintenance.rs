// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Commands that write to a journal. Never run them while the owning
//! process has the journal open.

use crate::location::JournalLocation;
use anyhow::{bail, Context};
use eventsync_node::{EventStore, StoreOptions};

fn open_existing(location: &JournalLocation) -> anyhow::Result<EventStore> {
    let path = location.resolve()?;
    if !path.exists() {
        bail!("no journal at {}", path.display());
    }
    let options = StoreOptions {
        ledger_capacity: location.ledger_capacity,
        ..StoreOptions::default()
    };
    EventStore::open_at(&path, location.stream_name()?, options)
        .with_context(|| format!("opening {}", path.display()))
}

/// Forgets every identifier in the deduplication ledger.
pub fn reset_ledger(location: &JournalLocation) -> anyhow::Result<usize> {
    let mut store = open_existing(location)?;
    let cleared = store.ledger().len();
    store.reset_dedup_ledger()?;
    store.close()?;
    println!("Cleared {cleared} identifier(s) from the deduplication ledger");
    Ok(cleared)
}

/// Rewrites the journal to its minimal form. Returns sizes before and after.
pub fn compact(location: &JournalLocation) -> anyhow::Result<(u64, u64)> {
    let mut store = open_existing(location)?;
    let before = store.journal_len();
    store.compact()?;
    let after = store.journal_len();
    store.close()?;
    println!("Compacted {} -> {} bytes", before, after);
    Ok((before, after))
}
