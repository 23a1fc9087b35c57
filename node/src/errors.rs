// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use eventsync::ModelError;
use eventsync_persistence::PersistenceError;
use thiserror::Error;

/// Journal failures. All of them are fatal to the operation that hit them;
/// nothing in the store retries.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal file error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Journal corrupted: {0}")]
    Corrupted(String),

    #[error("Event model error: {0}")]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failure of a drain invocation.
///
/// A consumer error leaves the batch it was handed in the store; calling
/// drain again redelivers it.
#[derive(Error, Debug)]
pub enum DrainError<E: std::error::Error + 'static> {
    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    #[error("Consumer failed: {0}")]
    Consumer(#[source] E),
}
