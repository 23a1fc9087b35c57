// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Decrypter
//!
//! Replaces the ciphertext of encrypted events with plaintext before they
//! reach the journal. The cryptographic engine stays behind the
//! [`SessionDirectory`] trait.
//!
//! # Contract
//! - One output per input, in input order; decryption is never reordered
//! - A failure yields a `conversation.otr-undecryptable` marker that keeps
//!   the conversation, sender and reason but never the ciphertext
//! - Session caches are discarded once per call, after the whole list

use crate::telemetry;
use eventsync::message::encode_plaintext;
use eventsync::{EventType, GenericMessage, RawEvent};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Field of `data` holding the sender's client id.
pub const SENDER_KEY: &str = "sender";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    #[error("No session with client {0}")]
    MissingSession(String),

    #[error("Corrupt ciphertext: {0}")]
    CorruptCiphertext(String),

    #[error("Ciphertext of {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Malformed encrypted event: {0}")]
    Malformed(String),

    #[error("Message was already decrypted once")]
    DuplicateMessage,
}

impl DecryptError {
    /// Short machine-readable code carried in the undecryptable marker.
    pub fn reason(&self) -> &'static str {
        match self {
            DecryptError::MissingSession(_) => "missing-session",
            DecryptError::CorruptCiphertext(_) => "corrupt-ciphertext",
            DecryptError::TooLarge { .. } => "too-large",
            DecryptError::Malformed(_) => "malformed",
            DecryptError::DuplicateMessage => "duplicate-message",
        }
    }
}

/// Who sent a ciphertext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderContext {
    pub conversation: Option<Uuid>,
    pub user: Option<Uuid>,
    pub client: String,
}

/// The cryptographic session store.
///
/// Sessions ratchet, so `decrypt` mutates them and calls for the same sender
/// must arrive in order.
pub trait SessionDirectory {
    fn decrypt(&mut self, ciphertext: &[u8], sender: &SenderContext) -> Result<Vec<u8>, DecryptError>;

    /// Drops whatever was cached while decrypting a list of events.
    fn discard_cache(&mut self) {}
}

pub struct EventDecrypter<S> {
    sessions: S,
    max_ciphertext_bytes: usize,
}

impl<S: SessionDirectory> EventDecrypter<S> {
    pub fn new(sessions: S, max_ciphertext_bytes: usize) -> Self {
        Self { sessions, max_ciphertext_bytes }
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut S {
        &mut self.sessions
    }

    /// Decrypts every encrypted event of `events`. Unencrypted and already
    /// decrypted events pass through untouched.
    pub fn decrypt_events(&mut self, events: Vec<RawEvent>) -> Vec<RawEvent> {
        let mut out = Vec::with_capacity(events.len());
        let mut failed = 0u64;

        for event in events {
            if event.decrypted || !event.event_type().is_encrypted() {
                out.push(event);
                continue;
            }
            match self.decrypt_event(&event) {
                Ok(decrypted) => out.push(decrypted),
                Err(e) => {
                    tracing::warn!(
                        "Failed to decrypt {} event {:?} in conversation {:?}: {}",
                        event.event_type().as_str(),
                        event.id,
                        event.conversation_id(),
                        e
                    );
                    failed += 1;
                    out.push(undecryptable_marker(&event, &e));
                }
            }
        }

        self.sessions.discard_cache();
        if failed > 0 {
            metrics::counter!(telemetry::EVENTS_UNDECRYPTABLE, failed);
        }
        out
    }

    fn decrypt_event(&mut self, event: &RawEvent) -> Result<RawEvent, DecryptError> {
        let field = ciphertext_field(&event.event_type())
            .ok_or_else(|| DecryptError::Malformed("not an encrypted event type".into()))?;
        let data = event
            .data()
            .and_then(Value::as_object)
            .ok_or_else(|| DecryptError::Malformed("missing data".into()))?;
        let client = data
            .get(SENDER_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| DecryptError::Malformed("missing sender client".into()))?;
        let encoded = data
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| DecryptError::Malformed(format!("missing {field}")))?;

        let size = encoded.len() / 2;
        if size > self.max_ciphertext_bytes {
            return Err(DecryptError::TooLarge { size, limit: self.max_ciphertext_bytes });
        }
        let ciphertext = hex::decode(encoded).map_err(|e| DecryptError::CorruptCiphertext(e.to_string()))?;

        let sender = SenderContext {
            conversation: event.conversation_id(),
            user: event.sender_id(),
            client: client.to_string(),
        };
        let plaintext = self.sessions.decrypt(&ciphertext, &sender)?;

        let mut data = data.clone();
        data.remove(field);
        data.insert(GenericMessage::PLAINTEXT_KEY.to_string(), encode_plaintext(&plaintext));

        let mut decrypted = event.clone();
        decrypted.payload["data"] = Value::Object(data);
        decrypted.decrypted = true;
        decrypted.append_debug_info(format!("decrypted from client {}", sender.client));
        Ok(decrypted)
    }
}

/// `data` field carrying the ciphertext of `event_type`.
fn ciphertext_field(event_type: &EventType) -> Option<&'static str> {
    match event_type {
        EventType::OtrMessageAdd => Some("text"),
        EventType::OtrAssetAdd => Some("key"),
        _ => None,
    }
}

/// Terminal replacement for an event that could not be decrypted.
pub fn undecryptable_marker(event: &RawEvent, error: &DecryptError) -> RawEvent {
    let mut data = Map::new();
    data.insert(
        SENDER_KEY.into(),
        event.data().and_then(|d| d.get(SENDER_KEY)).cloned().unwrap_or(Value::Null),
    );
    data.insert("reason".into(), Value::String(error.reason().into()));
    data.insert("original_type".into(), Value::String(event.event_type().as_str().into()));

    let field = |key: &str| event.payload.get(key).cloned().unwrap_or(Value::Null);
    let payload = json!({
        "type": EventType::UNDECRYPTABLE,
        "conversation": field("conversation"),
        "from": field("from"),
        "time": field("time"),
        "data": data,
    });

    let mut marker = RawEvent {
        id: event.id,
        payload,
        source: event.source,
        transient: event.transient,
        decrypted: true,
        debug_info: event.debug_info.clone(),
    };
    marker.append_debug_info(format!("undecryptable: {}", error));
    marker
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventsync::EventSource;
    use std::collections::HashMap;

    /// XOR with a per-client key byte. Unknown clients have no session.
    #[derive(Default)]
    struct XorSessions {
        keys: HashMap<String, u8>,
        discarded: usize,
    }

    impl SessionDirectory for XorSessions {
        fn decrypt(&mut self, ciphertext: &[u8], sender: &SenderContext) -> Result<Vec<u8>, DecryptError> {
            let key = self
                .keys
                .get(&sender.client)
                .ok_or_else(|| DecryptError::MissingSession(sender.client.clone()))?;
            Ok(ciphertext.iter().map(|b| b ^ key).collect())
        }

        fn discard_cache(&mut self) {
            self.discarded += 1;
        }
    }

    fn sessions() -> XorSessions {
        XorSessions { keys: HashMap::from([("c1".to_string(), 0x5a)]), discarded: 0 }
    }

    fn encrypted(client: &str, plaintext: &[u8], key: u8) -> RawEvent {
        let ciphertext: Vec<u8> = plaintext.iter().map(|b| b ^ key).collect();
        RawEvent::new(
            Some(Uuid::new_v4()),
            json!({
                "type": "conversation.otr-message-add",
                "conversation": Uuid::new_v4().to_string(),
                "from": Uuid::new_v4().to_string(),
                "time": "2024-01-01T00:00:00Z",
                "data": { "sender": client, "recipient": "self", "text": hex::encode(ciphertext) },
            }),
            EventSource::Download,
        )
    }

    #[test]
    fn test_decrypts_message_into_plaintext_field() {
        let mut decrypter = EventDecrypter::new(sessions(), 1024);
        let message = GenericMessage::text("m1", "hello");
        let event = encrypted("c1", &message.to_plaintext(), 0x5a);

        let out = decrypter.decrypt_events(vec![event.clone()]);
        assert_eq!(out.len(), 1);
        assert!(out[0].decrypted);
        assert_eq!(out[0].id, event.id);
        assert!(out[0].data().unwrap().get("text").is_none());
        assert_eq!(GenericMessage::from_event(&out[0]), Some(message));
        assert_eq!(decrypter.sessions().discarded, 1);
    }

    #[test]
    fn test_missing_session_yields_marker() {
        let mut decrypter = EventDecrypter::new(sessions(), 1024);
        let event = encrypted("unknown", b"secret", 0x11);

        let out = decrypter.decrypt_events(vec![event.clone()]);
        let marker = &out[0];
        assert_eq!(marker.event_type(), EventType::Undecryptable);
        assert_eq!(marker.conversation_id(), event.conversation_id());
        assert_eq!(marker.sender_id(), event.sender_id());
        assert_eq!(marker.payload["data"]["reason"], "missing-session");
        assert_eq!(marker.payload["data"]["sender"], "unknown");
        assert!(!marker.payload.to_string().contains(event.payload["data"]["text"].as_str().unwrap()));
    }

    #[test]
    fn test_oversized_and_corrupt_ciphertext() {
        let mut decrypter = EventDecrypter::new(sessions(), 4);
        let big = encrypted("c1", b"way too long", 0x5a);
        let mut corrupt = encrypted("c1", b"ok", 0x5a);
        corrupt.payload["data"]["text"] = json!("zz");

        let out = decrypter.decrypt_events(vec![big, corrupt]);
        assert_eq!(out[0].payload["data"]["reason"], "too-large");
        assert_eq!(out[1].payload["data"]["reason"], "corrupt-ciphertext");
    }

    #[test]
    fn test_unencrypted_events_pass_through_in_order() {
        let mut decrypter = EventDecrypter::new(sessions(), 1024);
        let plain = RawEvent::new(None, json!({ "type": "conversation.rename", "n": 1 }), EventSource::WebSocket);
        let secret = encrypted("c1", b"{}", 0x5a);

        let out = decrypter.decrypt_events(vec![plain.clone(), secret]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], plain);
        assert!(out[1].decrypted);
    }

    #[test]
    fn test_asset_key_is_decrypted() {
        let mut decrypter = EventDecrypter::new(sessions(), 1024);
        let mut event = encrypted("c1", b"key-bytes", 0x5a);
        event.payload["type"] = json!("conversation.otr-asset-add");
        let cipher = event.payload["data"]["text"].take();
        event.payload["data"]["key"] = cipher;

        let out = decrypter.decrypt_events(vec![event]);
        let data = out[0].data().unwrap();
        assert!(data.get("key").is_none());
        assert_eq!(data["plaintext"], json!(hex::encode(b"key-bytes")));
    }
}
