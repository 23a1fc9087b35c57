// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Decoder
//!
//! Front door of the pipeline: filters, decrypts and journals incoming
//! events, and drains the journal to consumers. All of it runs under one
//! lock per stream, so appends, deletes and drains never interleave.

use crate::config::JournalConfig;
use crate::decrypter::{EventDecrypter, SessionDirectory};
use crate::errors::{DrainError, Result};
use crate::events::{BatchProcessor, DeliveryMode, DrainReport, EventStore, IngestOutcome};
use eventsync::{RawEvent, SelfChannel, StreamName};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

struct DecoderState<S> {
    store: EventStore,
    decrypter: EventDecrypter<S>,
}

pub struct EventDecoder<S> {
    state: Arc<Mutex<DecoderState<S>>>,
    processor: BatchProcessor,
}

impl<S> Clone for EventDecoder<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            processor: self.processor.clone(),
        }
    }
}

impl<S: SessionDirectory + Send + 'static> EventDecoder<S> {
    /// Opens the journal of `stream` for the configured account.
    pub fn open(config: &JournalConfig, stream: StreamName, sessions: S) -> Result<Self> {
        let store = EventStore::open(config, stream)?;
        let decrypter = EventDecrypter::new(sessions, config.max_ciphertext_bytes);
        Ok(Self::from_parts(store, decrypter, BatchProcessor::new(config.batch_size)))
    }

    pub fn from_parts(store: EventStore, decrypter: EventDecrypter<S>, processor: BatchProcessor) -> Self {
        Self {
            state: Arc::new(Mutex::new(DecoderState { store, decrypter })),
            processor,
        }
    }

    /// Drops events the self user cannot have sent to `channel` unless they
    /// are availability updates.
    pub fn with_self_channel(mut self, channel: SelfChannel) -> Self {
        self.processor = self.processor.with_self_channel(channel);
        self
    }

    /// Makes `events` durable without delivering them. Returns once they
    /// survive a crash, so the transport may acknowledge them.
    pub async fn store_events(&self, events: Vec<RawEvent>) -> Result<IngestOutcome> {
        let mut state = self.state.lock().await;
        let DecoderState { store, decrypter } = &mut *state;

        let (fresh, duplicates) = store.filter_new(events);
        let decrypted = decrypter.decrypt_events(fresh);
        let outcome = store.commit_ingest(&decrypted)?;
        Ok(IngestOutcome { duplicates, ..outcome })
    }

    /// Stores `events`, then drains everything pending to `consumer`.
    pub async fn process_events<F, Fut, E>(
        &self,
        events: Vec<RawEvent>,
        mode: DeliveryMode,
        consumer: F,
    ) -> std::result::Result<DrainReport, DrainError<E>>
    where
        F: FnMut(Vec<RawEvent>) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: std::error::Error + 'static,
    {
        let mut state = self.state.lock().await;
        let DecoderState { store, decrypter } = &mut *state;

        let (fresh, duplicates) = store.filter_new(events);
        let decrypted = decrypter.decrypt_events(fresh);
        let outcome = store.commit_ingest(&decrypted)?;
        tracing::debug!(
            "Stored {} events ({} duplicates) on stream {}, last index {}",
            outcome.appended,
            duplicates,
            store.stream(),
            outcome.last_index
        );

        self.processor.drain(store, mode, consumer).await
    }

    /// Drains pending events without storing new ones.
    pub async fn drain<F, Fut, E>(&self, mode: DeliveryMode, consumer: F) -> std::result::Result<DrainReport, DrainError<E>>
    where
        F: FnMut(Vec<RawEvent>) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: std::error::Error + 'static,
    {
        let mut state = self.state.lock().await;
        self.processor.drain(&mut state.store, mode, consumer).await
    }

    pub async fn reset_dedup_ledger(&self) -> Result<()> {
        self.state.lock().await.store.reset_dedup_ledger()
    }

    /// Number of events waiting to be drained.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.store.len()
    }

    pub async fn highest_index(&self) -> i64 {
        self.state.lock().await.store.highest_index()
    }

    pub fn processor(&self) -> &BatchProcessor {
        &self.processor
    }
}
