use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use rab_core::{
    config::Config,
    consumer::{Consumer, ConsumerConfig},
    domain::UpdateId,
    messaging::{
        port::{Replier, UpdateFetcher},
        throttled::{ThrottleConfig, ThrottledReplier},
    },
    processor::EventProcessor,
    storage::PageRepository,
};

use crate::TelegramMessenger;

/// Wire Telegram, the page store and the consumer loop, then poll until
/// `cancel` fires. Returns the id of the last handled update.
pub async fn run_polling(
    cfg: Arc<Config>,
    pages: Arc<dyn PageRepository>,
    cancel: CancellationToken,
) -> anyhow::Result<Option<UpdateId>> {
    let messenger = Arc::new(TelegramMessenger::from_config(&cfg)?);

    match messenger.verify().await? {
        Some(username) => info!("bot started: @{username}"),
        None => info!("bot started (telegram not reachable yet)"),
    }

    // Replies go through a throttling decorator to stay under Telegram's
    // per-chat flood limits; 429 RetryAfter is still retried by the adapter.
    let fetcher: Arc<dyn UpdateFetcher> = messenger.clone();
    let replier: Arc<dyn Replier> = Arc::new(ThrottledReplier::new(
        messenger,
        ThrottleConfig {
            per_chat_min_interval: cfg.reply_min_interval,
            ..ThrottleConfig::default()
        },
    ));

    let processor =
        EventProcessor::new(pages, replier).remove_after_serving(cfg.remove_after_serving);
    let consumer = Consumer::new(fetcher, processor, ConsumerConfig::from(cfg.as_ref()));

    let cursor = consumer.spawn(cancel).wait().await;
    info!(cursor = ?cursor.map(|c| c.0), "service is stopped");

    Ok(cursor)
}
