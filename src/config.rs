// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Maximum number of records handed to a consumer in one call.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Number of event identifiers the deduplication ledger remembers.
///
/// Push notifications and the catch-up fetch overlap by at most a few
/// hundred events; the ledger keeps well over an order of magnitude more.
pub const DEFAULT_LEDGER_CAPACITY: usize = 10_000;

/// Ciphertexts above this size are rejected without calling the session.
pub const DEFAULT_MAX_CIPHERTEXT_BYTES: usize = 256 * 1024;

/// Stream used for regular conversation traffic.
pub const DEFAULT_STREAM: &str = "events";

/// Stream used for events of very large conversations.
pub const HUGE_STREAM: &str = "huge-events";
