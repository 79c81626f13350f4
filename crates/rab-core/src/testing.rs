//! Fakes shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, Page, UpdateId},
    messaging::{
        port::{Replier, UpdateFetcher},
        types::Event,
    },
    storage::{memory::MemoryRepository, PageRepository},
    Error, Result,
};

#[derive(Default)]
pub struct RecordingReplier {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingReplier {
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Replier for RecordingReplier {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Memory store that counts calls, fails every operation on a URL containing
/// a marker and every random pick for one user.
pub struct FlakyRepository {
    inner: MemoryRepository,
    fail_marker: Option<String>,
    fail_user: Option<String>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl FlakyRepository {
    pub fn new(inner: MemoryRepository) -> Self {
        Self {
            inner,
            fail_marker: None,
            fail_user: None,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn fail_picks_for(mut self, user_name: &str) -> Self {
        self.fail_user = Some(user_name.to_string());
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn pages(&self) -> Vec<Page> {
        self.inner.pages().await
    }

    fn check(&self, page: &Page) -> Result<()> {
        match &self.fail_marker {
            Some(marker) if page.url.contains(marker.as_str()) => {
                Err(Error::storage("fake store", "connection refused"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PageRepository for FlakyRepository {
    async fn save(&self, page: &Page) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check(page)?;
        self.inner.save(page).await
    }

    async fn exists(&self, page: &Page) -> Result<bool> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check(page)?;
        self.inner.exists(page).await
    }

    async fn pick_random(&self, user_name: &str) -> Result<Page> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_user.as_deref() == Some(user_name) {
            return Err(Error::storage("fake store", "connection refused"));
        }
        self.inner.pick_random(user_name).await
    }

    async fn remove(&self, page: &Page) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check(page)?;
        self.inner.remove(page).await
    }
}

/// Fetcher that plays back scripted results and records each requested cursor.
/// Once the script runs out it returns empty batches.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Vec<Event>>>>,
    calls: Mutex<Vec<(Option<UpdateId>, usize)>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<Vec<Event>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn cursors(&self) -> Vec<Option<UpdateId>> {
        self.calls.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    pub fn limits(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(_, l)| *l).collect()
    }
}

#[async_trait]
impl UpdateFetcher for ScriptedFetcher {
    async fn fetch(&self, cursor: Option<UpdateId>, limit: usize) -> Result<Vec<Event>> {
        self.calls.lock().unwrap().push((cursor, limit));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
