// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod paths;
pub mod events;
pub mod decrypter;
pub mod decoder;

pub use config::JournalConfig;
pub use decoder::EventDecoder;
pub use decrypter::{DecryptError, EventDecrypter, SenderContext, SessionDirectory};
pub use errors::{ConfigError, DrainError, StoreError};
pub use events::{
    recover_journal, BatchProcessor, DedupLedger, DeliveryMode, DrainReport, EventStore, IngestOutcome, StoreOptions,
};
