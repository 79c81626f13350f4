//! The polling loop: fetch a batch, process it in order, advance the cursor.
//!
//! States: `Idle → Fetching → Processing → Idle`, with `Fetching → Backoff →
//! Fetching` on fetch failure and `Stopped` once the cancellation token fires.
//! Cancellation is observed between batches, never mid-batch.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::Config,
    domain::UpdateId,
    messaging::{port::UpdateFetcher, types::Event},
    processor::EventProcessor,
};

#[derive(Clone, Copy, Debug)]
pub struct ConsumerConfig {
    /// Upper bound handed to the fetcher; batches are not split further.
    pub batch_size: usize,
    /// Pause after an empty batch.
    pub idle_delay: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_delay: Duration::from_secs(1),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }
}

impl From<&Config> for ConsumerConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            batch_size: cfg.batch_size,
            idle_delay: cfg.idle_delay,
            backoff_initial: cfg.backoff_initial,
            backoff_max: cfg.backoff_max,
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Fetching,
    Processing(Vec<Event>),
    Backoff(Duration),
    Stopped,
}

/// Result of one [`Consumer::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// A batch (possibly empty) was fetched and every event in it handled.
    Handled(BatchReport),
    /// The fetch failed; the loop waited this long and will refetch from the
    /// same cursor.
    BackedOff(Duration),
    Stopped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub events: usize,
    pub failed: usize,
}

/// Exponential delay between failed fetches, reset by a successful one.
#[derive(Clone, Copy, Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            next: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.next = self.initial;
    }
}

pub struct Consumer {
    fetcher: Arc<dyn UpdateFetcher>,
    processor: EventProcessor,
    cfg: ConsumerConfig,
    cursor: Option<UpdateId>,
    backoff: Backoff,
}

impl Consumer {
    pub fn new(
        fetcher: Arc<dyn UpdateFetcher>,
        processor: EventProcessor,
        cfg: ConsumerConfig,
    ) -> Self {
        Self {
            fetcher,
            processor,
            cfg,
            cursor: None,
            backoff: Backoff::new(cfg.backoff_initial, cfg.backoff_max),
        }
    }

    /// Id of the last handled update, `None` before the first non-empty batch.
    pub fn cursor(&self) -> Option<UpdateId> {
        self.cursor
    }

    /// Run until `cancel` fires. An in-flight batch is always finished first.
    pub async fn run(&mut self, cancel: &CancellationToken) {
        info!(batch_size = self.cfg.batch_size, "consumer started");
        while self.step(cancel).await != Step::Stopped {}
        info!(cursor = ?self.cursor.map(|c| c.0), "consumer stopped");
    }

    /// Run the loop on its own task.
    pub fn spawn(mut self, cancel: CancellationToken) -> ConsumerHandle {
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            self.run(&token).await;
            self.cursor
        });
        ConsumerHandle { cancel, join }
    }

    /// One iteration, from `Idle` until a batch is handled, a backoff wait has
    /// elapsed, or the loop stops.
    pub async fn step(&mut self, cancel: &CancellationToken) -> Step {
        let mut state = State::Idle;
        loop {
            trace!(?state, "consumer state");
            state = match state {
                State::Idle if cancel.is_cancelled() => State::Stopped,
                State::Idle => State::Fetching,
                State::Fetching => {
                    let fetched = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        res = self.fetcher.fetch(self.cursor, self.cfg.batch_size) => Some(res),
                    };
                    match fetched {
                        // Nothing was received, so nothing is lost.
                        None => State::Stopped,
                        Some(Ok(batch)) => {
                            self.backoff.reset();
                            State::Processing(batch)
                        }
                        Some(Err(err)) => {
                            let delay = self.backoff.next_delay();
                            warn!(
                                error = %err,
                                cursor = ?self.cursor.map(|c| c.0),
                                delay_ms = delay.as_millis() as u64,
                                "can't get events, backing off"
                            );
                            State::Backoff(delay)
                        }
                    }
                }
                State::Processing(batch) => {
                    let report = self.handle_batch(batch).await;
                    if report.events == 0 {
                        // A cancel here is picked up by the next step's Idle check.
                        sleep_or_cancel(self.cfg.idle_delay, cancel).await;
                    }
                    return Step::Handled(report);
                }
                State::Backoff(delay) => {
                    if sleep_or_cancel(delay, cancel).await {
                        return Step::BackedOff(delay);
                    }
                    State::Stopped
                }
                State::Stopped => return Step::Stopped,
            };
        }
    }

    /// Process every event in ascending id order, then move the cursor to the
    /// highest id seen. A failing event is reported and skipped.
    async fn handle_batch(&mut self, mut batch: Vec<Event>) -> BatchReport {
        batch.sort_by_key(|e| e.id);

        let mut report = BatchReport {
            events: batch.len(),
            failed: 0,
        };
        for event in &batch {
            if let Err(err) = self.processor.process(event).await {
                report.failed += 1;
                warn!(update_id = event.id.0, error = %err, "can't handle event");
            }
        }

        if let Some(last) = batch.last() {
            self.cursor = self.cursor.max(Some(last.id));
            debug!(
                events = report.events,
                failed = report.failed,
                cursor = last.id.0,
                "batch handled"
            );
        }

        report
    }
}

/// `false` when cancelled before `duration` elapsed.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}

pub struct ConsumerHandle {
    cancel: CancellationToken,
    join: JoinHandle<Option<UpdateId>>,
}

impl ConsumerHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loop and wait for it to finish; returns the final cursor.
    pub async fn stop(self) -> Option<UpdateId> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the loop to exit on its own (after someone cancels the token).
    pub async fn wait(self) -> Option<UpdateId> {
        match self.join.await {
            Ok(cursor) => cursor,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!(error = %e, "consumer task did not finish");
                None
            }
        }
    }
}
