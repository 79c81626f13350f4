use async_trait::async_trait;

use crate::{domain::ChatId, domain::UpdateId, messaging::types::Event, Result};

/// Source of inbound updates (Telegram `getUpdates` today).
#[async_trait]
pub trait UpdateFetcher: Send + Sync {
    /// Fetch at most `limit` updates with an id greater than `cursor`
    /// (everything still pending when `cursor` is `None`).
    ///
    /// Returns updates in ascending id order, and an empty vec when nothing is
    /// new. Never advances any state of its own: a failed fetch can be retried
    /// with the same cursor.
    async fn fetch(&self, cursor: Option<UpdateId>, limit: usize) -> Result<Vec<Event>>;
}

/// Outbound reply capability.
#[async_trait]
pub trait Replier: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;
}
