//! Executes one interpreted command against the page store and the replier.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    command::{interpret, Command},
    domain::Page,
    messaging::{
        port::Replier,
        types::{Event, EventKind, IncomingMessage},
    },
    storage::PageRepository,
    Error, Result,
};

pub const MSG_HELLO: &str = "Hi there! 👾\n\n";
pub const MSG_UNKNOWN_COMMAND: &str = "Unknown command 🤔";
pub const MSG_NO_SAVED_PAGES: &str = "You have no saved pages 🙊";
pub const MSG_SAVED: &str = "Saved! 👌";
pub const MSG_ALREADY_EXISTS: &str = "You already have this page in your list 🤗";
pub const MSG_FAILED: &str = "Something went wrong, please try again later.";

pub struct EventProcessor {
    pages: Arc<dyn PageRepository>,
    replier: Arc<dyn Replier>,
    remove_after_serving: bool,
}

impl EventProcessor {
    pub fn new(pages: Arc<dyn PageRepository>, replier: Arc<dyn Replier>) -> Self {
        Self {
            pages,
            replier,
            remove_after_serving: true,
        }
    }

    pub fn remove_after_serving(mut self, enabled: bool) -> Self {
        self.remove_after_serving = enabled;
        self
    }

    pub fn help_text(&self) -> String {
        let mut text = String::from(
            "I can save and keep your pages, and offer you one to read when you have time.\n\n\
             To save a page, just send me a link to it.\n\n\
             To get a random page from your list, send /rnd.",
        );
        if self.remove_after_serving {
            text.push_str("\nCaution! Once served, the page is removed from your list!");
        }
        text
    }

    /// Handle one update. Sends exactly one reply for a text message, even
    /// when the store fails; the store error is still returned so the caller
    /// can report it.
    pub async fn process(&self, event: &Event) -> Result<()> {
        match &event.kind {
            EventKind::Message(msg) => self.process_message(msg).await,
            EventKind::Other => {
                debug!(update_id = event.id.0, "skipping non-text update");
                Ok(())
            }
        }
    }

    async fn process_message(&self, msg: &IncomingMessage) -> Result<()> {
        let command = interpret(&msg.text);
        debug!(user = %msg.user_name, ?command, "got command");

        match command {
            Command::Save { url } => self.save_page(msg, Page::new(&msg.user_name, url)).await,
            Command::Random => self.send_random(msg).await,
            Command::Help => self.reply(msg, &self.help_text()).await,
            Command::Start => {
                self.reply(msg, &format!("{MSG_HELLO}{}", self.help_text()))
                    .await
            }
            Command::Unknown => self.reply(msg, MSG_UNKNOWN_COMMAND).await,
        }
    }

    async fn save_page(&self, msg: &IncomingMessage, page: Page) -> Result<()> {
        match self.store_if_new(&page).await {
            Ok(true) => {
                info!(user = %page.user_name, url = %page.url, "page saved");
                self.reply(msg, MSG_SAVED).await
            }
            Ok(false) => self.reply(msg, MSG_ALREADY_EXISTS).await,
            Err(e) => self.fail(msg, e).await,
        }
    }

    /// Check-then-insert is safe: events are never processed concurrently.
    async fn store_if_new(&self, page: &Page) -> Result<bool> {
        if self.pages.exists(page).await? {
            return Ok(false);
        }
        self.pages.save(page).await?;
        Ok(true)
    }

    async fn send_random(&self, msg: &IncomingMessage) -> Result<()> {
        let page = match self.pages.pick_random(&msg.user_name).await {
            Ok(page) => page,
            Err(Error::NoSavedPages) => {
                debug!(user = %msg.user_name, "no saved pages");
                return self.reply(msg, MSG_NO_SAVED_PAGES).await;
            }
            Err(e) => return self.fail(msg, e).await,
        };

        self.reply(msg, &page.url).await?;

        if self.remove_after_serving {
            self.pages.remove(&page).await?;
        }

        Ok(())
    }

    async fn reply(&self, msg: &IncomingMessage, text: &str) -> Result<()> {
        self.replier.send_text(msg.chat_id, text).await
    }

    /// Generic reply for an internal failure; `err` is what gets reported.
    async fn fail(&self, msg: &IncomingMessage, err: Error) -> Result<()> {
        if let Err(reply_err) = self.reply(msg, MSG_FAILED).await {
            warn!(error = %reply_err, "can't send failure reply");
        }
        Err(err)
    }
}
