// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    /// Stored payload is not a JSON document.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    /// Stored source tag does not map to a known source.
    #[error("Unknown event source tag: {0}")]
    UnknownSource(u8),
    /// Stored identifier is not a UUID.
    #[error("Invalid event identifier: {0}")]
    InvalidIdentifier(String),
    /// Stream names are used as file names.
    #[error("Invalid stream name: {0:?}")]
    InvalidStreamName(String),
}

pub type Result<T> = core::result::Result<T, ModelError>;
