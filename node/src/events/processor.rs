// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Batch Processor
//!
//! Drains an [`EventStore`] to empty in ascending `sort_index` order, one
//! bounded batch per consumer call.
//!
//! # Delivery contract
//! - A batch is deleted only after the consumer returned `Ok`
//! - A consumer error stops the drain and leaves the batch in the store;
//!   the next drain redelivers it unchanged
//! - An empty store yields exactly one call with an empty batch
//!
//! Progress lives entirely in the store: the processor keeps no cursor
//! between drains.

use crate::errors::DrainError;
use crate::events::event_store::EventStore;
use crate::telemetry;
use eventsync::config::DEFAULT_BATCH_SIZE;
use eventsync::filter::retain_valid;
use eventsync::{RawEvent, SelfChannel, StoredEvent};
use std::future::Future;

/// What happens to records once the consumer accepted them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Delete each batch after it was consumed.
    #[default]
    Consume,
    /// Deliver everything once and keep it, so a later drain delivers it
    /// again.
    Retain,
}

/// Tally of one drain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Consumer calls with a non-empty record batch.
    pub batches: usize,
    pub delivered: usize,
    /// Dropped by the self-channel filter.
    pub suppressed: usize,
    /// Stored records that could not be turned back into events.
    pub unreadable: usize,
    pub deleted: usize,
}

#[derive(Clone, Debug)]
pub struct BatchProcessor {
    batch_size: usize,
    self_channel: Option<SelfChannel>,
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchProcessor {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            self_channel: None,
        }
    }

    pub fn with_self_channel(mut self, channel: SelfChannel) -> Self {
        self.self_channel = Some(channel);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn self_channel(&self) -> Option<&SelfChannel> {
        self.self_channel.as_ref()
    }

    /// Delivers every pending record of `store` to `consumer`.
    pub async fn drain<F, Fut, E>(
        &self,
        store: &mut EventStore,
        mode: DeliveryMode,
        mut consumer: F,
    ) -> Result<DrainReport, DrainError<E>>
    where
        F: FnMut(Vec<RawEvent>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::error::Error + 'static,
    {
        let mut report = DrainReport::default();
        // Only used in retain mode, where nothing is deleted.
        let mut cursor = 0i64;
        let mut first = true;

        loop {
            let records = match mode {
                DeliveryMode::Consume => store.next_batch(self.batch_size),
                DeliveryMode::Retain => store.batch_after(cursor, self.batch_size),
            };

            if records.is_empty() {
                if first {
                    consumer(Vec::new()).await.map_err(DrainError::Consumer)?;
                }
                break;
            }
            first = false;

            let (events, unreadable) = self.decode(&records);
            let (events, suppressed) = retain_valid(events, self.self_channel.as_ref());
            let delivered = events.len();

            tracing::debug!(
                "Delivering batch of {} events (indices {}..={}) from stream {}",
                delivered,
                records[0].sort_index,
                records[records.len() - 1].sort_index,
                store.stream()
            );
            consumer(events).await.map_err(DrainError::Consumer)?;

            report.batches += 1;
            report.delivered += delivered;
            report.suppressed += suppressed;
            report.unreadable += unreadable;
            metrics::counter!(telemetry::BATCHES_DELIVERED, 1);
            metrics::counter!(telemetry::EVENTS_DELIVERED, delivered as u64);
            if suppressed > 0 {
                metrics::counter!(telemetry::EVENTS_SUPPRESSED, suppressed as u64);
            }

            match mode {
                DeliveryMode::Consume => report.deleted += store.delete(&records)?,
                DeliveryMode::Retain => cursor = records[records.len() - 1].sort_index,
            }
        }

        Ok(report)
    }

    /// Turns records back into events. Unreadable records are skipped and
    /// counted; they are still deleted with their batch.
    fn decode(&self, records: &[StoredEvent]) -> (Vec<RawEvent>, usize) {
        let mut unreadable = 0;
        let events = records
            .iter()
            .filter_map(|record| match record.to_event() {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping unreadable record {}: {}", record.sort_index, e);
                    unreadable += 1;
                    None
                }
            })
            .collect();
        (events, unreadable)
    }
}
