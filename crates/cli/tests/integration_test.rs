// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use eventsync::config::DEFAULT_LEDGER_CAPACITY;
use eventsync::{EventSource, RawEvent, StreamName};
use eventsync_cli::commands::{inspect, maintenance, pending};
use eventsync_cli::JournalLocation;
use eventsync_node::{EventStore, JournalConfig};
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::tempdir;
use uuid::Uuid;

fn pushed(n: u32) -> RawEvent {
    RawEvent::new(
        Some(Uuid::new_v4()),
        json!({ "type": "conversation.member-join", "n": n }),
        EventSource::PushNotification,
    )
}

#[test]
fn test_integration_workflow() {
    let dir = tempdir().unwrap();
    let account = Uuid::new_v4();
    let config = JournalConfig::for_account(dir.path(), account);
    {
        let mut store = EventStore::open(&config, StreamName::default()).unwrap();
        store.ingest((0..4).map(pushed).collect()).unwrap();
        let first = store.next_batch(1);
        store.delete(&first).unwrap();
    }

    let location = JournalLocation {
        file: None,
        root: Some(dir.path().to_path_buf()),
        account: Some(account),
        stream: "events".to_string(),
        ledger_capacity: DEFAULT_LEDGER_CAPACITY,
    };
    let path = location.resolve().unwrap();
    assert!(path.exists());

    assert!(inspect::run(&location).is_ok());
    let summary = inspect::summarize(&path, DEFAULT_LEDGER_CAPACITY).unwrap();
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.first_pending, Some(2));
    assert_eq!(summary.highest_index, 4);
    assert_eq!(summary.ledger_entries, 4);
    assert!(!summary.torn_tail);

    assert!(pending::run(&location, 10).is_ok());
    let records = pending::list(&path, 2).unwrap();
    assert_eq!(records.iter().map(|r| r.sort_index).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(records[0].event_type_hint().as_deref(), Some("conversation.member-join"));

    assert_eq!(maintenance::reset_ledger(&location).unwrap(), 4);
    assert_eq!(inspect::summarize(&path, DEFAULT_LEDGER_CAPACITY).unwrap().ledger_entries, 0);

    let (before, after) = maintenance::compact(&location).unwrap();
    assert!(after < before);
    let summary = inspect::summarize(&path, DEFAULT_LEDGER_CAPACITY).unwrap();
    assert_eq!(summary.transactions, 1);
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.highest_index, 4);
}

#[test]
fn test_inspect_reports_torn_tail_without_repairing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.journal");
    {
        let mut store =
            EventStore::open_at(&path, StreamName::default(), eventsync_node::StoreOptions::default()).unwrap();
        store.append(&[pushed(1)]).unwrap();
    }
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    drop(file);
    let len = std::fs::metadata(&path).unwrap().len();

    let summary = inspect::summarize(&path, DEFAULT_LEDGER_CAPACITY).unwrap();
    assert!(summary.torn_tail);
    assert_eq!(summary.pending, 1);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), len);
}

#[test]
fn test_compact_keeps_ledger_of_larger_capacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.journal");
    let capacity = DEFAULT_LEDGER_CAPACITY + 2_000;
    let recorded = DEFAULT_LEDGER_CAPACITY + 500;
    {
        let options = eventsync_node::StoreOptions { ledger_capacity: capacity, ..Default::default() };
        let mut store = EventStore::open_at(&path, StreamName::default(), options).unwrap();
        store.ingest((0..recorded as u32).map(pushed).collect()).unwrap();
    }

    let location = JournalLocation { ledger_capacity: capacity, ..JournalLocation::for_file(path.clone()) };
    maintenance::compact(&location).unwrap();

    let summary = inspect::summarize(&path, capacity).unwrap();
    assert_eq!(summary.ledger_entries, recorded);
    assert_eq!(summary.pending, recorded);
    assert_eq!(summary.transactions, 1);

    // Replaying with a smaller capacity only changes the view, not the file.
    assert_eq!(inspect::summarize(&path, DEFAULT_LEDGER_CAPACITY).unwrap().ledger_entries, DEFAULT_LEDGER_CAPACITY);
    assert_eq!(inspect::summarize(&path, capacity).unwrap().ledger_entries, recorded);
}

#[test]
fn test_missing_location_is_an_error() {
    let location = JournalLocation::default();
    assert!(location.resolve().is_err());
    assert!(inspect::run(&location).is_err());

    let dir = tempdir().unwrap();
    let missing = JournalLocation::for_file(dir.path().join("nope.journal"));
    assert!(inspect::run(&missing).is_ok());
    assert!(maintenance::compact(&missing).is_err());
}
