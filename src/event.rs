// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Remote events as delivered by the transport layer.
//!
//! A [`RawEvent`] is the unit of remote state change. Its payload is an opaque
//! JSON document; the only fields this crate ever looks at are `type`,
//! `conversation`, `from` and `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Channel an event arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventSource {
    /// Persistent real-time connection. Never redelivered.
    WebSocket = 0,
    PushNotification = 1,
    /// Catch-up fetch of the notification stream.
    Download = 2,
}

impl EventSource {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(EventSource::WebSocket),
            1 => Some(EventSource::PushNotification),
            2 => Some(EventSource::Download),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Live events bypass deduplication.
    pub fn is_live(self) -> bool {
        matches!(self, EventSource::WebSocket)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventSource::WebSocket => "websocket",
            EventSource::PushNotification => "push",
            EventSource::Download => "download",
        }
    }
}

/// Event kinds the pipeline distinguishes. Everything else is carried as
/// [`EventType::Other`] and passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    OtrMessageAdd,
    OtrAssetAdd,
    MemberJoin,
    MemberLeave,
    Rename,
    UserUpdate,
    /// Terminal marker produced when an encrypted event cannot be decrypted.
    Undecryptable,
    Other(String),
}

impl EventType {
    pub const OTR_MESSAGE_ADD: &'static str = "conversation.otr-message-add";
    pub const OTR_ASSET_ADD: &'static str = "conversation.otr-asset-add";
    pub const MEMBER_JOIN: &'static str = "conversation.member-join";
    pub const MEMBER_LEAVE: &'static str = "conversation.member-leave";
    pub const RENAME: &'static str = "conversation.rename";
    pub const USER_UPDATE: &'static str = "user.update";
    pub const UNDECRYPTABLE: &'static str = "conversation.otr-undecryptable";

    pub fn parse(s: &str) -> Self {
        match s {
            Self::OTR_MESSAGE_ADD => EventType::OtrMessageAdd,
            Self::OTR_ASSET_ADD => EventType::OtrAssetAdd,
            Self::MEMBER_JOIN => EventType::MemberJoin,
            Self::MEMBER_LEAVE => EventType::MemberLeave,
            Self::RENAME => EventType::Rename,
            Self::USER_UPDATE => EventType::UserUpdate,
            Self::UNDECRYPTABLE => EventType::Undecryptable,
            other => EventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::OtrMessageAdd => Self::OTR_MESSAGE_ADD,
            EventType::OtrAssetAdd => Self::OTR_ASSET_ADD,
            EventType::MemberJoin => Self::MEMBER_JOIN,
            EventType::MemberLeave => Self::MEMBER_LEAVE,
            EventType::Rename => Self::RENAME,
            EventType::UserUpdate => Self::USER_UPDATE,
            EventType::Undecryptable => Self::UNDECRYPTABLE,
            EventType::Other(s) => s,
        }
    }

    /// Whether events of this type carry ciphertext that must be decrypted
    /// before they may be stored.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, EventType::OtrMessageAdd | EventType::OtrAssetAdd)
    }
}

/// One remote event.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEvent {
    /// Absent for transient and locally synthesized events.
    pub id: Option<Uuid>,
    pub payload: Value,
    pub source: EventSource,
    pub transient: bool,
    /// Set once the payload no longer carries ciphertext.
    pub decrypted: bool,
    pub debug_info: Option<String>,
}

impl RawEvent {
    pub fn new(id: Option<Uuid>, payload: Value, source: EventSource) -> Self {
        Self {
            id,
            payload,
            source,
            transient: false,
            decrypted: false,
            debug_info: None,
        }
    }

    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    pub fn event_type(&self) -> EventType {
        EventType::parse(self.payload.get("type").and_then(Value::as_str).unwrap_or_default())
    }

    pub fn conversation_id(&self) -> Option<Uuid> {
        self.uuid_field("conversation")
    }

    pub fn sender_id(&self) -> Option<Uuid> {
        self.uuid_field("from")
    }

    /// `data` object of the payload, if any.
    pub fn data(&self) -> Option<&Value> {
        self.payload.get("data")
    }

    /// Identified events from a redeliverable source are subject to
    /// deduplication; everything else always passes.
    pub fn is_deduplicable(&self) -> bool {
        self.id.is_some() && !self.source.is_live()
    }

    /// Appends a line to the debug trail.
    pub fn append_debug_info(&mut self, note: impl AsRef<str>) {
        let note = note.as_ref();
        match &mut self.debug_info {
            Some(trail) => {
                trail.push('\n');
                trail.push_str(note);
            }
            None => self.debug_info = Some(note.to_string()),
        }
    }

    fn uuid_field(&self, key: &str) -> Option<Uuid> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}
