//! Telegram adapter (teloxide).
//!
//! This crate implements the `rab-core` fetcher and replier ports over the
//! Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use tokio::time::sleep;
use tracing::warn;

pub mod router;
pub mod updates;

use rab_core::{
    config::{Config, MAX_BATCH_SIZE},
    domain::{ChatId, UpdateId},
    errors::Error,
    messaging::{
        port::{Replier, UpdateFetcher},
        types::Event,
    },
    Result,
};

/// Headroom on top of the long-poll timeout before the HTTP client gives up.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    poll_timeout: Duration,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, poll_timeout: Duration) -> Self {
        Self { bot, poll_timeout }
    }

    /// Build a bot whose HTTP client outlives a long-poll request.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(cfg.poll_timeout.saturating_add(HTTP_TIMEOUT_SLACK))
            .build()
            .map_err(|e| Error::Config(format!("can't build http client: {e}")))?;

        let mut bot = Bot::with_client(cfg.telegram_bot_token.clone(), client);
        if let Some(api_url) = &cfg.telegram_api_url {
            let url = reqwest::Url::parse(api_url)
                .map_err(|e| Error::Config(format!("invalid TELEGRAM_API_URL {api_url:?}: {e}")))?;
            bot = bot.set_api_url(url);
        }

        Ok(Self::new(bot, cfg.poll_timeout))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Check the token with `getMe`.
    ///
    /// A rejected token is a config error; a network failure only yields
    /// `None` since the consumer loop retries the connection anyway.
    pub async fn verify(&self) -> Result<Option<String>> {
        match self.bot.get_me().await {
            Ok(me) => Ok(Some(me.username().to_string())),
            Err(teloxide::RequestError::Api(e)) => Err(Error::Config(format!(
                "telegram rejected the bot token: {e}"
            ))),
            Err(e) => {
                warn!(error = %e, "can't reach telegram at startup");
                Ok(None)
            }
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(context: &str, e: teloxide::RequestError) -> Error {
        match e {
            e @ teloxide::RequestError::InvalidJson { .. } => Error::protocol(context, e),
            other => Error::transport(context, other),
        }
    }

    async fn with_retry<T, Fut>(&self, context: &str, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(context, other)),
                },
            }
        }
    }
}

#[async_trait]
impl UpdateFetcher for TelegramMessenger {
    async fn fetch(&self, cursor: Option<UpdateId>, limit: usize) -> Result<Vec<Event>> {
        let mut req = self
            .bot
            .get_updates()
            .limit(limit.clamp(1, MAX_BATCH_SIZE) as u8)
            .timeout(u32::try_from(self.poll_timeout.as_secs()).unwrap_or(u32::MAX));
        if let Some(offset) = updates::offset_after(cursor)? {
            req = req.offset(offset);
        }

        let raw = req
            .await
            .map_err(|e| Self::map_err("can't get updates", e))?;

        Ok(updates::events_from_updates(&raw))
    }
}

#[async_trait]
impl Replier for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.with_retry("can't send message", || {
            self.bot.send_message(Self::tg_chat(chat_id), text.to_string())
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecodable_payload_maps_to_protocol_error() {
        let source = serde_json::from_str::<u8>("not json").unwrap_err();
        let err = TelegramMessenger::map_err(
            "can't get updates",
            teloxide::RequestError::InvalidJson {
                source,
                raw: "not json".into(),
            },
        );
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("can't get updates"));
    }

    #[test]
    fn network_and_api_failures_map_to_transport_error() {
        let network = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let err = TelegramMessenger::map_err(
            "can't get updates",
            teloxide::RequestError::Network(network),
        );
        assert!(matches!(err, Error::Transport { .. }));

        let err = TelegramMessenger::map_err(
            "can't send message",
            teloxide::RequestError::Api(teloxide::ApiError::BotBlocked),
        );
        assert!(matches!(err, Error::Transport { .. }));
        assert!(err.is_retryable());
    }
}
