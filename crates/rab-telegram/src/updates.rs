//! Telegram `Update` → core [`Event`] conversion.

use teloxide::types::{Update, UpdateKind};

use rab_core::{
    domain::{ChatId, UpdateId},
    errors::Error,
    messaging::types::{Event, EventKind, IncomingMessage},
    Result,
};

/// `getUpdates` offset that asks for updates after `cursor`. Telegram drops
/// (acknowledges) everything below the offset.
pub fn offset_after(cursor: Option<UpdateId>) -> Result<Option<i32>> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };
    let next = cursor
        .0
        .checked_add(1)
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| {
            Error::protocol(
                "can't build getUpdates offset",
                format!("update id {} out of range", cursor.0),
            )
        })?;
    Ok(Some(next))
}

/// Convert a batch, sorted by update id.
pub fn events_from_updates(updates: &[Update]) -> Vec<Event> {
    let mut events: Vec<Event> = updates.iter().map(event_from_update).collect();
    events.sort_by_key(|e| e.id);
    events
}

pub fn event_from_update(update: &Update) -> Event {
    let id = UpdateId(i64::from(update.id));

    let UpdateKind::Message(msg) = &update.kind else {
        return Event {
            id,
            kind: EventKind::Other,
        };
    };
    let (Some(text), Some(user)) = (msg.text(), msg.from()) else {
        return Event {
            id,
            kind: EventKind::Other,
        };
    };

    let user_name = user
        .username
        .clone()
        .unwrap_or_else(|| format!("id{}", user.id.0));

    Event {
        id,
        kind: EventKind::Message(IncomingMessage {
            chat_id: ChatId(msg.chat.id.0),
            user_name,
            text: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Parse from text like a real getUpdates response; teloxide's untagged
    // message kinds don't deserialize from an in-memory `Value`.
    fn update(json: serde_json::Value) -> Update {
        serde_json::from_str(&json.to_string()).unwrap()
    }

    fn text_update(id: i64, username: Option<&str>, text: &str) -> Update {
        let mut from = serde_json::json!({
            "id": 218485655,
            "is_bot": false,
            "first_name": "Alice",
        });
        if let Some(name) = username {
            from["username"] = serde_json::json!(name);
        }
        update(serde_json::json!({
            "update_id": id,
            "message": {
                "message_id": 6534,
                "from": from,
                "chat": {
                    "id": 218485655,
                    "first_name": "Alice",
                    "type": "private"
                },
                "date": 1567927221,
                "text": text
            }
        }))
    }

    #[test]
    fn text_message_becomes_message_event() {
        let event = event_from_update(&text_update(10, Some("alice"), "/rnd"));
        assert_eq!(event, Event::message(10, 218485655, "alice", "/rnd"));
    }

    #[test]
    fn missing_username_falls_back_to_user_id() {
        let event = event_from_update(&text_update(11, None, "/help"));
        assert_eq!(event, Event::message(11, 218485655, "id218485655", "/help"));
    }

    #[test]
    fn edited_message_is_other() {
        let edited = update(serde_json::json!({
            "update_id": 12,
            "edited_message": {
                "message_id": 6534,
                "from": { "id": 1, "is_bot": false, "first_name": "Alice" },
                "chat": { "id": 1, "first_name": "Alice", "type": "private" },
                "date": 1567927221,
                "edit_date": 1567927300,
                "text": "https://example.com"
            }
        }));
        assert!(matches!(edited.kind, UpdateKind::EditedMessage(_)));
        assert_eq!(event_from_update(&edited), Event::other(12));
    }

    #[test]
    fn batch_is_sorted_by_id() {
        let events = events_from_updates(&[
            text_update(3, Some("a"), "x"),
            text_update(1, Some("a"), "y"),
            text_update(2, Some("a"), "z"),
        ]);
        let ids: Vec<i64> = events.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn offset_is_one_past_the_cursor() {
        assert_eq!(offset_after(None).unwrap(), None);
        assert_eq!(offset_after(Some(UpdateId(41))).unwrap(), Some(42));
        let err = offset_after(Some(UpdateId(i64::from(i32::MAX)))).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
