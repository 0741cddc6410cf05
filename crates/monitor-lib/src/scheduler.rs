//! Named, cancelable polling timers
//!
//! Polling cadence in this system depends on the selected window, and a
//! selection change must kill the timer that served the old one. Timers are
//! keyed by `(consumer, window)` so scheduling a new selection supersedes the
//! previous timer instead of racing it.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Identity of one timer: who owns it, and for which window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub consumer: String,
    pub window: String,
}

impl TimerKey {
    pub fn new(consumer: impl Into<String>, window: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            window: window.into(),
        }
    }
}

/// Owns every polling timer in the process
#[derive(Default)]
pub struct PollScheduler {
    timers: DashMap<TimerKey, JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or replace) the timer under `key`. The task runs once
    /// immediately, then once per `period`. Any previous timer under the
    /// same key is aborted first.
    pub fn schedule<F, Fut>(&self, key: TimerKey, period: Duration, task: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task().await;
            }
        });

        if let Some(previous) = self.timers.insert(key.clone(), handle) {
            previous.abort();
            debug!(
                consumer = %key.consumer,
                window = %key.window,
                "superseded existing timer"
            );
        }
    }

    /// Stop one timer; true if it existed
    pub fn cancel(&self, key: &TimerKey) -> bool {
        match self.timers.remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Stop every timer owned by `consumer`, e.g. when its selection changes.
    /// Returns how many were canceled.
    pub fn cancel_consumer(&self, consumer: &str) -> usize {
        let keys: Vec<TimerKey> = self
            .timers
            .iter()
            .filter(|entry| entry.key().consumer == consumer)
            .map(|entry| entry.key().clone())
            .collect();
        keys.iter().filter(|key| self.cancel(key)).count()
    }

    pub fn is_scheduled(&self, key: &TimerKey) -> bool {
        self.timers.contains_key(key)
    }

    /// Abort every timer
    pub fn shutdown(&self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
        self.timers.clear();
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
