// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Decrypted message content.
//!
//! After decryption the plaintext of an OTR event is stored hex-encoded under
//! `data.plaintext`. The plaintext itself is a JSON encoded [`GenericMessage`].

use crate::event::RawEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    None,
    Available,
    Away,
    Busy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageContent {
    Text { content: String },
    Availability { status: Availability },
    Reaction { emoji: String, message_id: String },
    Confirmation { message_ids: Vec<String> },
    Asset { mime_type: String, size: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericMessage {
    pub message_id: String,
    pub content: MessageContent,
}

impl GenericMessage {
    pub const PLAINTEXT_KEY: &'static str = "plaintext";

    pub fn text(message_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            content: MessageContent::Text { content: content.into() },
        }
    }

    pub fn availability(message_id: impl Into<String>, status: Availability) -> Self {
        Self {
            message_id: message_id.into(),
            content: MessageContent::Availability { status },
        }
    }

    /// Parses the decrypted content of `event`. `None` for events that were
    /// never encrypted, undecryptable markers and unrecognized content.
    pub fn from_event(event: &RawEvent) -> Option<Self> {
        let encoded = event.data()?.get(Self::PLAINTEXT_KEY)?.as_str()?;
        let bytes = hex::decode(encoded).ok()?;
        Self::from_plaintext(&bytes)
    }

    pub fn from_plaintext(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    pub fn to_plaintext(&self) -> Vec<u8> {
        // Serializing a plain struct of strings and enums cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn has_availability(&self) -> bool {
        matches!(self.content, MessageContent::Availability { .. })
    }
}

/// Hex form of `plaintext` as stored in `data.plaintext`.
pub fn encode_plaintext(plaintext: &[u8]) -> Value {
    Value::String(hex::encode(plaintext))
}
