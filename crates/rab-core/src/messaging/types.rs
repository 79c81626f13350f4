use crate::domain::{ChatId, UpdateId};

/// One inbound update as delivered by the fetcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub id: UpdateId,
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Message(IncomingMessage),
    /// Anything without message text (edits, stickers, callbacks, ...).
    /// Still delivered so the cursor moves past it.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub user_name: String,
    pub text: String,
}

impl Event {
    pub fn message(
        id: i64,
        chat_id: i64,
        user_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: UpdateId(id),
            kind: EventKind::Message(IncomingMessage {
                chat_id: ChatId(chat_id),
                user_name: user_name.into(),
                text: text.into(),
            }),
        }
    }

    pub fn other(id: i64) -> Self {
        Self {
            id: UpdateId(id),
            kind: EventKind::Other,
        }
    }
}
