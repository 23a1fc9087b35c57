
use crate::event::{EventSource, RawEvent};
use serde_json::json;
use uuid::Uuid;

pub(crate) fn otr_event(conversation: Uuid, from: Uuid, source: EventSource) -> RawEvent {
    RawEvent::new(
        Some(Uuid::new_v4()),
        json!({
            "type": "conversation.otr-message-add",
            "conversation": conversation.to_string(),
            "from": from.to_string(),
            "data": { "sender": "c0ffee", "recipient": "beef", "text": "00ff" },
        }),
        source,
    )
}
