// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Final validity filter applied right before delivery.

use crate::event::RawEvent;
use crate::message::GenericMessage;
use uuid::Uuid;

/// The self conversation of the local account.
///
/// The only thing other users may legitimately post there is an availability
/// update. Everything else they post to it is dropped before it reaches a
/// consumer. Events the self user sent from another device are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelfChannel {
    pub conversation: Uuid,
    pub user: Uuid,
}

impl SelfChannel {
    pub fn new(conversation: Uuid, user: Uuid) -> Self {
        Self { conversation, user }
    }

    pub fn admits(&self, event: &RawEvent) -> bool {
        if event.conversation_id() != Some(self.conversation) {
            return true;
        }
        if event.sender_id() == Some(self.user) {
            return true;
        }
        GenericMessage::from_event(event)
            .map(|message| message.has_availability())
            .unwrap_or(false)
    }
}

/// Drops events `channel` does not admit. Returns the kept events and the
/// number dropped.
pub fn retain_valid(events: Vec<RawEvent>, channel: Option<&SelfChannel>) -> (Vec<RawEvent>, usize) {
    let Some(channel) = channel else {
        return (events, 0);
    };
    let before = events.len();
    let kept: Vec<RawEvent> = events.into_iter().filter(|e| channel.admits(e)).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}
