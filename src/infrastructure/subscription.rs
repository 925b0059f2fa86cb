//! Declarative binding of a view to one query key.

use tokio::sync::watch;

use crate::domain::query::{QueryEntry, QueryKey};
use crate::infrastructure::cache::{Listener, QueryCache, SubscriptionGuard};
use crate::infrastructure::poller::Poller;
use std::sync::Arc;

/// Releases the poller's per-name subscriber slot on drop.
struct PollSlot {
    poller: Arc<Poller>,
    name: String,
}

impl PollSlot {
    fn acquire(poller: &Arc<Poller>, name: &str) -> Self {
        poller.on_subscribe(name);
        Self {
            poller: Arc::clone(poller),
            name: name.to_string(),
        }
    }
}

impl Drop for PollSlot {
    fn drop(&mut self) {
        self.poller.on_unsubscribe(&self.name);
    }
}

struct WatchInner {
    key: QueryKey,
    receiver: watch::Receiver<QueryEntry>,
    _guard: SubscriptionGuard,
    _poll_slot: PollSlot,
}

/// A view's handle on one query: holds the latest entry snapshot, keeps the
/// subscription and the poll timer alive, and offers explicit refresh.
///
/// On creation the entry is fetched if it has never been fetched; otherwise
/// the cached value is served as-is. Dropping the handle releases the
/// subscription (and may disarm the poll timer) without cancelling any
/// in-flight request.
pub struct QueryWatch {
    cache: QueryCache,
    poller: Arc<Poller>,
    inner: WatchInner,
}

impl QueryWatch {
    pub(crate) fn bind(cache: &QueryCache, poller: &Arc<Poller>, key: QueryKey) -> Self {
        let inner = Self::attach(cache, poller, key);
        Self {
            cache: cache.clone(),
            poller: Arc::clone(poller),
            inner,
        }
    }

    fn attach(cache: &QueryCache, poller: &Arc<Poller>, key: QueryKey) -> WatchInner {
        let initial = cache.read(&key);
        let never_fetched = initial.never_fetched();

        let (sender, receiver) = watch::channel(initial);
        let listener: Listener = Arc::new(move |entry: &QueryEntry| {
            let _ = sender.send(entry.clone());
        });
        let guard = cache.subscribe(&key, listener);
        let poll_slot = PollSlot::acquire(poller, key.name());

        if never_fetched {
            let cache = cache.clone();
            let fetch_key = key.clone();
            tokio::spawn(async move {
                cache.fetch_registered(&fetch_key).await;
            });
        }

        WatchInner {
            key,
            receiver,
            _guard: guard,
            _poll_slot: poll_slot,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.inner.key
    }

    /// Latest entry snapshot for the bound key.
    pub fn entry(&self) -> QueryEntry {
        self.inner.receiver.borrow().clone()
    }

    /// Waits for the next entry write and returns the new snapshot. `None`
    /// if the cache side of the channel has gone away.
    pub async fn changed(&mut self) -> Option<QueryEntry> {
        self.inner.receiver.changed().await.ok()?;
        Some(self.inner.receiver.borrow_and_update().clone())
    }

    /// Rebinds this handle to a different key (e.g. a new day-range
    /// parameter). The snapshot is re-seeded from the new key's entry, so a
    /// stale value from the old key is never observable here.
    pub fn rebind(&mut self, key: QueryKey) {
        if self.inner.key == key {
            return;
        }
        self.inner = Self::attach(&self.cache, &self.poller, key);
    }

    /// Explicit user-triggered refresh of the bound key. Unlike automatic
    /// fetches this is never deduplicated away.
    pub async fn refresh(&self) {
        self.cache.refresh_registered(&self.inner.key).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::domain::query::{PollingTable, QueryStatus};
    use crate::infrastructure::cache::mock::StubLoader;

    fn fixture() -> (QueryCache, Arc<Poller>) {
        let cache = QueryCache::new();
        let poller = Arc::new(Poller::new(cache.clone(), PollingTable::new()));
        (cache, poller)
    }

    async fn settle() {
        // Initial fetches are spawned; give them a turn to run.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_bind_triggers_initial_fetch() {
        let (cache, poller) = fixture();
        let loader = Arc::new(StubLoader::returning(json!({"total": 1})));
        cache.register_loader("students", loader.clone());

        let watch = QueryWatch::bind(&cache, &poller, QueryKey::new("students"));
        settle().await;

        assert_eq!(loader.calls(), 1);
        let entry = watch.entry();
        assert_eq!(entry.status, QueryStatus::Success);
        assert_eq!(entry.data, Some(json!({"total": 1})));
    }

    #[tokio::test]
    async fn test_second_binding_serves_cache_without_refetch() {
        let (cache, poller) = fixture();
        let loader = Arc::new(StubLoader::returning(json!({"total": 1})));
        cache.register_loader("students", loader.clone());

        let _first = QueryWatch::bind(&cache, &poller, QueryKey::new("students"));
        settle().await;

        let second = QueryWatch::bind(&cache, &poller, QueryKey::new("students"));
        settle().await;

        assert_eq!(loader.calls(), 1);
        assert_eq!(second.entry().data, Some(json!({"total": 1})));
    }

    #[tokio::test]
    async fn test_all_subscribers_observe_refresh() {
        let (cache, poller) = fixture();
        let loader = Arc::new(StubLoader::returning(json!({"total": 1})));
        cache.register_loader("students", loader.clone());

        let first = QueryWatch::bind(&cache, &poller, QueryKey::new("students"));
        let second = QueryWatch::bind(&cache, &poller, QueryKey::new("students"));
        settle().await;

        loader.set_value(json!({"total": 2}));
        first.refresh().await;

        assert_eq!(first.entry().data, Some(json!({"total": 2})));
        assert_eq!(second.entry().data, Some(json!({"total": 2})));
    }

    #[tokio::test]
    async fn test_rebind_does_not_flash_old_data() {
        let (cache, poller) = fixture();
        let loader = Arc::new(StubLoader::returning(json!({"history": ["old"]})));
        cache.register_loader("attendance-history", loader.clone());

        let week = QueryKey::new("attendance-history").with_param("days", "7");
        let fortnight = QueryKey::new("attendance-history").with_param("days", "14");

        let mut watch = QueryWatch::bind(&cache, &poller, week.clone());
        settle().await;
        assert_eq!(watch.entry().data, Some(json!({"history": ["old"]})));

        loader.set_value(json!({"history": ["new"]}));
        watch.rebind(fortnight.clone());

        // Immediately after rebind the snapshot belongs to the new key; the
        // old key's data must not bleed through while the fetch runs.
        let entry = watch.entry();
        assert_eq!(entry.key, fortnight);
        assert!(entry.data.is_none());

        settle().await;
        assert_eq!(watch.entry().data, Some(json!({"history": ["new"]})));
    }

    #[tokio::test]
    async fn test_rebind_to_same_key_is_a_no_op() {
        let (cache, poller) = fixture();
        let loader = Arc::new(StubLoader::returning(json!({"total": 1})));
        cache.register_loader("students", loader.clone());

        let key = QueryKey::new("students");
        let mut watch = QueryWatch::bind(&cache, &poller, key.clone());
        settle().await;

        watch.rebind(key.clone());
        settle().await;

        assert_eq!(loader.calls(), 1);
        assert_eq!(watch.entry().data, Some(json!({"total": 1})));
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let (cache, poller) = fixture();
        let loader = Arc::new(StubLoader::returning(json!({"total": 1})));
        cache.register_loader("students", loader.clone());

        let key = QueryKey::new("students");
        let watch = QueryWatch::bind(&cache, &poller, key.clone());
        settle().await;
        assert_eq!(cache.read(&key).subscriber_count, 1);

        drop(watch);
        assert!(cache.read(&key).never_fetched());
    }
}
