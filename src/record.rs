// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable event record.

use crate::error::{ModelError, Result};
use crate::event::{EventSource, RawEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted form of a [`RawEvent`].
///
/// `sort_index` is assigned by the journal at append time and is the only
/// ordering key. It is not derived from any timestamp in the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub sort_index: i64,
    pub uuid: Option<String>,
    /// Payload as JSON text, kept verbatim so redelivery is byte-identical.
    pub payload: String,
    pub source: u8,
    pub transient: bool,
    pub debug_info: Option<String>,
}

impl StoredEvent {
    pub fn from_event(event: &RawEvent, sort_index: i64) -> Self {
        Self {
            sort_index,
            uuid: event.id.map(|id| id.hyphenated().to_string()),
            payload: event.payload.to_string(),
            source: event.source.as_u8(),
            transient: event.transient,
            debug_info: event.debug_info.clone(),
        }
    }

    /// Rebuilds the event. Stored events never carry ciphertext, so the
    /// result is always marked decrypted.
    pub fn to_event(&self) -> Result<RawEvent> {
        let id = match &self.uuid {
            Some(s) => Some(Uuid::parse_str(s).map_err(|_| ModelError::InvalidIdentifier(s.clone()))?),
            None => None,
        };
        let source = EventSource::from_u8(self.source).ok_or(ModelError::UnknownSource(self.source))?;
        let payload = serde_json::from_str(&self.payload)?;

        Ok(RawEvent {
            id,
            payload,
            source,
            transient: self.transient,
            decrypted: true,
            debug_info: self.debug_info.clone(),
        })
    }

    /// `type` field of the payload without a full parse. Used by tooling.
    pub fn event_type_hint(&self) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.payload)
            .ok()?
            .get("type")?
            .as_str()
            .map(str::to_string)
    }
}
