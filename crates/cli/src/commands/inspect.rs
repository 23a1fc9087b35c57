// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::location::JournalLocation;
use eventsync_node::events::recover_journal;
use std::path::Path;

/// What `inspect` found in a journal file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalSummary {
    pub file_bytes: u64,
    pub transactions: usize,
    pub torn_tail: bool,
    pub pending: usize,
    pub first_pending: Option<i64>,
    pub highest_index: i64,
    pub ledger_entries: usize,
}

/// Reads a journal without modifying it. A torn tail is reported, not
/// truncated.
pub fn summarize(path: &Path, ledger_capacity: usize) -> anyhow::Result<JournalSummary> {
    let file_bytes = std::fs::metadata(path)?.len();
    let recovered = recover_journal(path, ledger_capacity)?;
    let journal = &recovered.journal;

    let summary = JournalSummary {
        file_bytes,
        transactions: recovered.transactions,
        torn_tail: recovered.scan.torn_tail,
        pending: journal.len(),
        first_pending: journal.records().next().map(|r| r.sort_index),
        highest_index: journal.highest_index(),
        ledger_entries: journal.ledger().len(),
    };
    Ok(summary)
}

pub fn run(location: &JournalLocation) -> anyhow::Result<()> {
    let path = location.resolve()?;

    println!("\nEventSync Journal Report");
    println!("------------------------");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Item", "Status", "Details"]);

    if !path.exists() {
        table.add_row(vec!["Journal", "MISSING", &path.display().to_string()]);
        println!("{table}\n");
        return Ok(());
    }

    match summarize(&path, location.ledger_capacity) {
        Ok(summary) => {
            let tail = if summary.torn_tail { "TORN TAIL" } else { "FOUND" };
            table.add_row(vec![
                "Journal",
                tail,
                &format!("{}, {} bytes, {} transactions", path.display(), summary.file_bytes, summary.transactions),
            ]);
            let first = summary
                .first_pending
                .map(|i| format!(", first index {i}"))
                .unwrap_or_default();
            table.add_row(vec!["Pending", "", &format!("{} events{}", summary.pending, first)]);
            table.add_row(vec!["High-water", "", &summary.highest_index.to_string()]);
            table.add_row(vec!["Ledger", "", &format!("{} identifiers", summary.ledger_entries)]);
        }
        Err(e) => {
            table.add_row(vec!["Journal", "CORRUPT", &e.to_string()]);
        }
    }

    println!("{table}\n");
    Ok(())
}
