//! Poller: per-query-name background refresh timers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::domain::query::PollingTable;
use crate::infrastructure::cache::QueryCache;

#[derive(Debug, Default)]
struct NameState {
    subscribers: usize,
    timer: Option<JoinHandle<()>>,
}

/// Arms one repeating refetch task per polled query name while that name has
/// at least one live subscriber.
///
/// Fetch errors never disarm a timer; the next tick simply tries again.
/// Overlapping ticks are absorbed by the cache's fetch de-duplication.
#[derive(Debug)]
pub struct Poller {
    cache: QueryCache,
    table: PollingTable,
    armed: Mutex<HashMap<String, NameState>>,
}

impl Poller {
    pub fn new(cache: QueryCache, table: PollingTable) -> Self {
        Self {
            cache,
            table,
            armed: Mutex::new(HashMap::new()),
        }
    }

    /// Called when a view subscribes to a query of `name`; arms the timer on
    /// the 0 -> 1 transition.
    pub fn on_subscribe(&self, name: &str) {
        let mut armed = self.armed.lock().unwrap();
        let state = armed.entry(name.to_string()).or_default();
        state.subscribers += 1;

        if state.subscribers == 1 {
            let policy = self.table.policy(name);
            if policy.is_enabled() {
                debug!(query = name, interval_ms = policy.interval.as_millis() as u64, "arming poll timer");
                state.timer = Some(self.spawn_timer(name.to_string(), policy.interval));
            }
        }
    }

    /// Called when a view unsubscribes; disarms the timer on the 1 -> 0
    /// transition.
    pub fn on_unsubscribe(&self, name: &str) {
        let mut armed = self.armed.lock().unwrap();
        let Some(state) = armed.get_mut(name) else {
            return;
        };

        state.subscribers = state.subscribers.saturating_sub(1);
        if state.subscribers == 0 {
            if let Some(timer) = state.timer.take() {
                debug!(query = name, "disarming poll timer");
                timer.abort();
            }
            armed.remove(name);
        }
    }

    fn spawn_timer(&self, name: String, interval: Duration) -> JoinHandle<()> {
        let cache = self.cache.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial fetch is the
            // subscriber's job, not the poller's.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                // Each refetch runs detached, so disarming the timer only
                // stops the ticker and never kills a request that is
                // already out.
                for key in cache.subscribed_keys(&name) {
                    let cache = cache.clone();
                    tokio::spawn(async move {
                        cache.fetch_registered(&key).await;
                    });
                }
            }
        })
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let mut armed = self.armed.lock().unwrap();
        for state in armed.values_mut() {
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }
    }
}
