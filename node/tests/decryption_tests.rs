// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use eventsync::{EventSource, EventType, GenericMessage, RawEvent, StreamName};
use eventsync_node::{
    DecryptError, DeliveryMode, EventDecoder, EventDecrypter, JournalConfig, SenderContext, SessionDirectory,
};
use serde_json::json;
use std::collections::HashMap;
use tempfile::tempdir;
use uuid::Uuid;

/// Deterministic stand-in for a ratcheting session store: each client has a
/// key byte that is mixed with a per-client message counter, so decrypting
/// out of order or twice gives different output.
#[derive(Clone, Default)]
struct RatchetSessions {
    keys: HashMap<String, u8>,
    counters: HashMap<String, u8>,
    cache_discards: usize,
}

impl RatchetSessions {
    fn with_client(client: &str, key: u8) -> Self {
        let mut sessions = Self::default();
        sessions.keys.insert(client.to_string(), key);
        sessions
    }

    fn encrypt(&mut self, client: &str, plaintext: &[u8]) -> Vec<u8> {
        let step = self.advance(client);
        plaintext.iter().map(|b| b ^ step).collect()
    }

    fn advance(&mut self, client: &str) -> u8 {
        let key = self.keys[client];
        let counter = self.counters.entry(client.to_string()).or_insert(0);
        *counter = counter.wrapping_add(1);
        key.wrapping_add(*counter)
    }
}

impl SessionDirectory for RatchetSessions {
    fn decrypt(&mut self, ciphertext: &[u8], sender: &SenderContext) -> Result<Vec<u8>, DecryptError> {
        if !self.keys.contains_key(&sender.client) {
            return Err(DecryptError::MissingSession(sender.client.clone()));
        }
        let step = self.advance(&sender.client);
        Ok(ciphertext.iter().map(|b| b ^ step).collect())
    }

    fn discard_cache(&mut self) {
        self.cache_discards += 1;
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unused")]
struct Unused;

fn otr_event(client: &str, ciphertext: &[u8]) -> RawEvent {
    RawEvent::new(
        Some(Uuid::new_v4()),
        json!({
            "type": "conversation.otr-message-add",
            "conversation": Uuid::new_v4().to_string(),
            "from": Uuid::new_v4().to_string(),
            "data": { "sender": client, "text": hex::encode(ciphertext) },
        }),
        EventSource::Download,
    )
}

fn conversation_of_three(sender_side: &mut RatchetSessions) -> Vec<RawEvent> {
    let mut events: Vec<RawEvent> = ["one", "two", "three"]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let message = GenericMessage::text(format!("m{i}"), *text);
            otr_event("alice", &sender_side.encrypt("alice", &message.to_plaintext()))
        })
        .collect();
    events.insert(1, otr_event("mallory", b"\x01\x02\x03\x04\x05\x06\x07\x08"));
    events
}

#[test]
fn test_decryption_is_deterministic_from_same_session_state() {
    let mut sender_side = RatchetSessions::with_client("alice", 0x30);
    let events = conversation_of_three(&mut sender_side);
    let initial = RatchetSessions::with_client("alice", 0x30);

    let mut first = EventDecrypter::new(initial.clone(), 1024);
    let mut second = EventDecrypter::new(initial, 1024);
    let a = first.decrypt_events(events.clone());
    let b = second.decrypt_events(events);

    assert_eq!(a, b);
    let texts: Vec<String> = a
        .iter()
        .filter_map(GenericMessage::from_event)
        .map(|m| m.message_id)
        .collect();
    assert_eq!(texts, vec!["m0", "m1", "m2"]);
    assert_eq!(a[1].event_type(), EventType::Undecryptable);
    assert_eq!(first.sessions().cache_discards, 1);
}

#[tokio::test]
async fn test_decoder_never_stores_ciphertext() {
    let dir = tempdir().unwrap();
    let config = JournalConfig::for_account(dir.path(), Uuid::new_v4());
    let mut sender_side = RatchetSessions::with_client("alice", 0x41);
    let events = conversation_of_three(&mut sender_side);
    let ciphertexts: Vec<String> = events
        .iter()
        .map(|e| e.payload["data"]["text"].as_str().unwrap().to_string())
        .collect();

    let decoder =
        EventDecoder::open(&config, StreamName::default(), RatchetSessions::with_client("alice", 0x41)).unwrap();

    let mut delivered = Vec::new();
    let report = decoder
        .process_events(events, DeliveryMode::Consume, |batch| {
            delivered.extend(batch);
            async { Ok::<(), Unused>(()) }
        })
        .await
        .unwrap();
    assert_eq!(report.delivered, 4);
    assert_eq!(delivered.len(), 4);

    for event in &delivered {
        assert!(event.decrypted);
        assert!(event.data().unwrap().get("text").is_none());
    }
    assert_eq!(delivered[1].payload["data"]["reason"], "missing-session");

    let journal = std::fs::read(eventsync_node::paths::journal_path(
        &config.root_dir,
        config.account_id,
        &StreamName::default(),
    ))
    .unwrap();
    let journal = String::from_utf8_lossy(&journal);
    for ciphertext in ciphertexts {
        assert!(!journal.contains(&ciphertext));
    }
}

#[tokio::test]
async fn test_redelivered_ciphertext_is_not_decrypted_twice() {
    let dir = tempdir().unwrap();
    let config = JournalConfig::for_account(dir.path(), Uuid::new_v4());
    let mut sender_side = RatchetSessions::with_client("alice", 0x10);
    let message = GenericMessage::text("m0", "hi");
    let mut pushed = otr_event("alice", &sender_side.encrypt("alice", &message.to_plaintext()));
    pushed.source = EventSource::PushNotification;
    let mut fetched = pushed.clone();
    fetched.source = EventSource::Download;

    let decoder =
        EventDecoder::open(&config, StreamName::default(), RatchetSessions::with_client("alice", 0x10)).unwrap();
    decoder.store_events(vec![pushed]).await.unwrap();
    let outcome = decoder.store_events(vec![fetched]).await.unwrap();
    assert_eq!(outcome.duplicates, 1);

    let mut delivered = Vec::new();
    decoder
        .drain(DeliveryMode::Consume, |batch| {
            delivered.extend(batch);
            async { Ok::<(), Unused>(()) }
        })
        .await
        .unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(GenericMessage::from_event(&delivered[0]), Some(message));
}
