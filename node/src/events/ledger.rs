// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deduplication Ledger
//!
//! Remembers the identifiers of redeliverable events that have already been
//! journaled, so a push notification followed by a catch-up fetch of the same
//! event does not enqueue it twice.
//!
//! The ledger is a bounded FIFO: once `capacity` identifiers are held, the
//! oldest one is forgotten for every new one recorded. The ledger itself does
//! no I/O; its contents are persisted as part of the journal transactions
//! that append the events, see `EventStore`.

use eventsync::RawEvent;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub struct DedupLedger {
    capacity: usize,
    order: VecDeque<String>,
    seen: FxHashSet<String>,
}

impl DedupLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            seen: FxHashSet::default(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Returns the events that are not duplicates, plus the number dropped.
    ///
    /// Live events and events without an identifier always pass. Of several
    /// copies of the same identifier within `events`, only the first passes.
    pub fn filter_new(&self, events: Vec<RawEvent>) -> (Vec<RawEvent>, usize) {
        let mut batch_seen = FxHashSet::default();
        let before = events.len();

        let fresh: Vec<RawEvent> = events
            .into_iter()
            .filter(|event| match ledger_key(event) {
                Some(key) => !self.contains(&key) && batch_seen.insert(key),
                None => true,
            })
            .collect();

        let dropped = before - fresh.len();
        (fresh, dropped)
    }

    /// Identifiers of `events` that would be added by `record_events`.
    pub fn keys_to_record(&self, events: &[RawEvent]) -> Vec<String> {
        let mut keys = Vec::new();
        let mut batch_seen = FxHashSet::default();
        for key in events.iter().filter_map(ledger_key) {
            if !self.contains(&key) && batch_seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn record_events(&mut self, events: &[RawEvent]) {
        let keys = self.keys_to_record(events);
        self.record_keys(keys);
    }

    /// Adds raw identifiers, evicting the oldest beyond capacity.
    pub fn record_keys(&mut self, keys: impl IntoIterator<Item = String>) {
        for key in keys {
            if self.seen.contains(&key) {
                continue;
            }
            self.seen.insert(key.clone());
            self.order.push_back(key);

            while self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.seen.remove(&evicted);
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.order.clear();
        self.seen.clear();
    }

    /// Identifiers from oldest to newest. Recording them in this order into
    /// an empty ledger reproduces this one.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Key under which `event` is deduplicated, if it is deduplicated at all.
fn ledger_key(event: &RawEvent) -> Option<String> {
    if !event.is_deduplicable() {
        return None;
    }
    event.id.map(|id| id.hyphenated().to_string())
}
