// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::location::JournalLocation;
use anyhow::Context;
use eventsync::config::DEFAULT_LEDGER_CAPACITY;
use eventsync::{EventSource, StoredEvent};
use eventsync_node::events::recover_journal;
use std::path::Path;

/// The first `limit` queued records, lowest index first.
pub fn list(path: &Path, limit: usize) -> anyhow::Result<Vec<StoredEvent>> {
    let recovered =
        recover_journal(path, DEFAULT_LEDGER_CAPACITY).with_context(|| format!("reading {}", path.display()))?;
    Ok(recovered.journal.next_batch(limit))
}

pub fn run(location: &JournalLocation, limit: usize) -> anyhow::Result<()> {
    let path = location.resolve()?;
    let records = list(&path, limit)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Index", "Type", "Source", "Id", "Transient"]);

    for record in &records {
        let source = EventSource::from_u8(record.source)
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| format!("unknown({})", record.source));
        table.add_row(vec![
            record.sort_index.to_string(),
            record.event_type_hint().unwrap_or_else(|| "-".into()),
            source,
            record.uuid.clone().unwrap_or_else(|| "-".into()),
            record.transient.to_string(),
        ]);
    }

    println!("{table}");
    println!("{} record(s) shown\n", records.len());
    Ok(())
}
