//! Query cache: the keyed store of query results every view reads from.
//!
//! Entries are mutated only here, in response to fetch completions,
//! invalidation, or subscription bookkeeping. Every write is applied
//! atomically under one lock and delivered to the key's listeners in write
//! order, so no listener ever observes a torn entry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::query::{QueryEntry, QueryKey, QueryPattern, QueryStatus};
use crate::domain::ClientError;

/// Loads fresh data for a query key, normally by hitting the remote API.
/// Registered per query name so invalidation and polling can refetch
/// without the caller supplying a loader each time.
#[async_trait]
pub trait QueryLoader: Send + Sync + fmt::Debug {
    async fn load(&self, key: &QueryKey) -> Result<Value, ClientError>;
}

/// Callback invoked with the entry snapshot after every write to a
/// subscribed key. Listeners run under the cache lock and must not call
/// back into the cache.
pub type Listener = Arc<dyn Fn(&QueryEntry) + Send + Sync>;

struct EntryState {
    entry: QueryEntry,
    listeners: HashMap<u64, Listener>,
    in_flight: bool,
}

impl EntryState {
    fn new(key: QueryKey) -> Self {
        Self {
            entry: QueryEntry::idle(key),
            listeners: HashMap::new(),
            in_flight: false,
        }
    }

    fn notify(&self) {
        for listener in self.listeners.values() {
            listener(&self.entry);
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, EntryState>,
    next_listener_id: u64,
}

struct CacheInner {
    state: Mutex<CacheState>,
    loaders: Mutex<HashMap<String, Arc<dyn QueryLoader>>>,
}

/// Keyed store of query results with per-entry freshness metadata.
///
/// Cheap to clone; clones share the same store. One instance is constructed
/// at application start (or per test fixture) and passed by reference, never
/// reached through ambient global state.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.inner.state.lock().unwrap().entries.len();
        f.debug_struct("QueryCache").field("entries", &entries).finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState::default()),
                loaders: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers the loader used to refetch queries of `name` on
    /// invalidation and polling ticks.
    pub fn register_loader(&self, name: impl Into<String>, loader: Arc<dyn QueryLoader>) {
        self.inner.loaders.lock().unwrap().insert(name.into(), loader);
    }

    fn loader_for(&self, name: &str) -> Option<Arc<dyn QueryLoader>> {
        self.inner.loaders.lock().unwrap().get(name).cloned()
    }

    /// Snapshot of the entry for `key`, creating an idle one if absent.
    /// Never triggers a fetch.
    pub fn read(&self, key: &QueryKey) -> QueryEntry {
        let mut state = self.inner.state.lock().unwrap();
        state
            .entries
            .entry(key.clone())
            .or_insert_with(|| EntryState::new(key.clone()))
            .entry
            .clone()
    }

    /// Keys of `name` that currently have at least one subscriber.
    pub fn subscribed_keys(&self, name: &str) -> Vec<QueryKey> {
        let state = self.inner.state.lock().unwrap();
        state
            .entries
            .values()
            .filter(|s| s.entry.key.name() == name && s.entry.subscriber_count > 0)
            .map(|s| s.entry.key.clone())
            .collect()
    }

    /// Fetches `key` through `loader`. If an identical key is already in
    /// flight the call is a no-op, so at most one automatic request per key
    /// is outstanding at any time.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, loader: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ClientError>>,
    {
        if !self.begin_fetch(key, false) {
            debug!(key = %key.as_cache_key(), "fetch deduplicated, request already in flight");
            return;
        }

        let result = loader().await;
        self.complete_fetch(key, result);
    }

    /// Explicit user-triggered refresh. Skips the dedup guard, so it may
    /// overlap an in-flight fetch for the same key; completions are applied
    /// in the order they arrive, last write wins.
    pub async fn refresh<F, Fut>(&self, key: &QueryKey, loader: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ClientError>>,
    {
        self.begin_fetch(key, true);
        let result = loader().await;
        self.complete_fetch(key, result);
    }

    /// Fetches `key` through its registered loader, if one exists.
    pub async fn fetch_registered(&self, key: &QueryKey) {
        let Some(loader) = self.loader_for(key.name()) else {
            warn!(query = key.name(), "no loader registered, skipping fetch");
            return;
        };

        let load_key = key.clone();
        self.fetch(key, move || async move { loader.load(&load_key).await })
            .await;
    }

    /// Refreshes `key` through its registered loader, if one exists.
    pub async fn refresh_registered(&self, key: &QueryKey) {
        let Some(loader) = self.loader_for(key.name()) else {
            warn!(query = key.name(), "no loader registered, skipping refresh");
            return;
        };

        let load_key = key.clone();
        self.refresh(key, move || async move { loader.load(&load_key).await })
            .await;
    }

    /// Marks every entry matching `pattern` stale without clearing its data,
    /// and immediately refetches the ones that have subscribers.
    pub async fn invalidate(&self, pattern: &QueryPattern) {
        let mut to_refetch = Vec::new();

        {
            let mut state = self.inner.state.lock().unwrap();
            for entry_state in state.entries.values_mut() {
                if !pattern.matches(&entry_state.entry.key) {
                    continue;
                }

                entry_state.entry.is_stale = true;
                entry_state.notify();

                if entry_state.entry.subscriber_count > 0 {
                    to_refetch.push(entry_state.entry.key.clone());
                }
            }
        }

        let refetches: Vec<_> = to_refetch
            .iter()
            .map(|key| self.fetch_registered(key))
            .collect();
        join_all(refetches).await;
    }

    /// Registers `listener` for every write to `key`'s entry and bumps its
    /// subscriber count. Dropping the guard releases both.
    pub fn subscribe(&self, key: &QueryKey, listener: Listener) -> SubscriptionGuard {
        let mut state = self.inner.state.lock().unwrap();
        let listener_id = state.next_listener_id;
        state.next_listener_id += 1;

        let entry_state = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| EntryState::new(key.clone()));
        entry_state.entry.subscriber_count += 1;
        entry_state.listeners.insert(listener_id, listener);

        SubscriptionGuard {
            cache: self.clone(),
            key: key.clone(),
            listener_id,
        }
    }

    fn unsubscribe(&self, key: &QueryKey, listener_id: u64) {
        let mut state = self.inner.state.lock().unwrap();
        let Some(entry_state) = state.entries.get_mut(key) else {
            return;
        };

        entry_state.listeners.remove(&listener_id);
        entry_state.entry.subscriber_count = entry_state.entry.subscriber_count.saturating_sub(1);

        // Entries nobody watches are dropped, unless a fetch is still in
        // flight and about to write.
        if entry_state.entry.subscriber_count == 0 && !entry_state.in_flight {
            state.entries.remove(key);
        }
    }

    /// Transitions the entry to `Loading`, retaining previous data for
    /// stale-while-revalidate display. Returns false when deduplicated.
    fn begin_fetch(&self, key: &QueryKey, forced: bool) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        let entry_state = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| EntryState::new(key.clone()));

        if entry_state.in_flight && !forced {
            return false;
        }

        entry_state.in_flight = true;
        entry_state.entry.status = QueryStatus::Loading;
        entry_state.notify();
        true
    }

    fn complete_fetch(&self, key: &QueryKey, result: Result<Value, ClientError>) {
        let mut state = self.inner.state.lock().unwrap();
        // The entry may have been evicted while this request was out; the
        // result has nobody left to consume it and must not resurrect the
        // entry.
        let Some(entry_state) = state.entries.get_mut(key) else {
            debug!(key = %key.as_cache_key(), "dropping completion for evicted entry");
            return;
        };

        entry_state.in_flight = false;
        match result {
            Ok(data) => {
                entry_state.entry.data = Some(data);
                entry_state.entry.status = QueryStatus::Success;
                entry_state.entry.error = None;
                entry_state.entry.last_fetched_at = Some(Utc::now());
                entry_state.entry.is_stale = false;
            }
            Err(error) => {
                // Last-known-good data stays visible alongside the error.
                entry_state.entry.status = QueryStatus::Error;
                entry_state.entry.error = Some(error);
            }
        }
        entry_state.notify();
    }
}

/// Releases a cache subscription on drop: the listener is deregistered and
/// the entry's subscriber count decremented. An in-flight request for the
/// key is not cancelled; its completion simply has one less listener.
pub struct SubscriptionGuard {
    cache: QueryCache,
    key: QueryKey,
    listener_id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key, self.listener_id);
    }
}
