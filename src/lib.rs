// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! eventsync: the data model of the remote event pipeline.
//!
//! Events arrive from the transport layer as [`RawEvent`]s, are persisted as
//! [`StoredEvent`]s in a per-stream journal and come back out in strict
//! `sort_index` order. Nothing in this crate touches the filesystem; the
//! journal itself lives in `eventsync-node`.

pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod message;
pub mod record;
pub mod stream;

pub use error::{ModelError, Result};
pub use event::{EventSource, EventType, RawEvent};
pub use filter::SelfChannel;
pub use message::GenericMessage;
pub use record::StoredEvent;
pub use stream::StreamName;

#[cfg(test)]
mod tests;
