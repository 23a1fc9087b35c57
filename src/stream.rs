// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Logical event streams.
//!
//! Each stream is an independently sequenced journal. Regular traffic and the
//! traffic of very large conversations use separate streams so a backlog in
//! one never delays the other.

use crate::config::{DEFAULT_STREAM, HUGE_STREAM};
use crate::error::{ModelError, Result};
use std::fmt;

const MAX_STREAM_NAME_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamName(String);

impl StreamName {
    /// Stream names end up as file names, so only `[A-Za-z0-9_-]` is accepted.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= MAX_STREAM_NAME_LEN
            && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(ModelError::InvalidStreamName(name));
        }
        Ok(Self(name))
    }

    pub fn huge() -> Self {
        Self(HUGE_STREAM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.journal", self.0)
    }
}

impl Default for StreamName {
    fn default() -> Self {
        Self(DEFAULT_STREAM.to_string())
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
