//! In-process queue and result store.
//!
//! Backed by a `VecDeque` plus a [`Notify`] for blocking dequeues, and a
//! `HashMap` whose expired entries are swept on every write. Shares nothing across
//! processes, so it is only suitable when the API and worker run in the same
//! process (tests, local demos).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::{ResultStore, StoreError, TaskQueue, WriteOutcome};

/// Queue + result store living in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    queue: Mutex<VecDeque<String>>,
    available: Notify,
    results: Mutex<HashMap<String, StoredValue>>,
    offline: AtomicBool,
}

#[derive(Debug)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskQueue for InMemoryStore {
    async fn enqueue(&self, message: String) -> Result<(), StoreError> {
        self.check_online()?;
        self.queue.lock().await.push_back(message);
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before checking, so an enqueue between the
            // check and the wait is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.queue.lock().await.pop_front() {
                return Ok(Some(message));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
            self.check_online()?;
        }
    }

    async fn depth(&self) -> Result<u64, StoreError> {
        self.check_online()?;
        Ok(self.queue.lock().await.len() as u64)
    }
}

#[async_trait]
impl ResultStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        let mut results = self.results.lock().await;
        match results.get(key) {
            Some(stored) if stored.expires_at > Instant::now() => Ok(Some(stored.value.clone())),
            Some(_) => {
                results.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<WriteOutcome, StoreError> {
        self.check_online()?;
        let now = Instant::now();
        let mut results = self.results.lock().await;
        results.retain(|_, stored| stored.expires_at > now);

        if results.contains_key(key) {
            return Ok(WriteOutcome::AlreadyExists);
        }

        results.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(WriteOutcome::Written)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn dequeue_preserves_fifo_order() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store.enqueue(format!("m{i}")).await.unwrap();
        }
        assert_eq!(store.depth().await.unwrap(), 5);

        for i in 0..5 {
            let message = store.dequeue(Duration::from_millis(10)).await.unwrap();
            assert_eq!(message.as_deref(), Some(format!("m{i}").as_str()));
        }
        assert_eq!(store.depth().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dequeue_times_out_on_empty_queue() {
        let store = InMemoryStore::new();
        let started = Instant::now();
        let message = store.dequeue(Duration::from_secs(1)).await.unwrap();
        assert!(message.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn blocked_dequeue_wakes_on_enqueue() {
        let store = Arc::new(InMemoryStore::new());

        let consumer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.dequeue(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        store.enqueue("late".to_string()).await.unwrap();

        let message = consumer.await.unwrap().unwrap();
        assert_eq!(message.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn each_message_goes_to_one_consumer() {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..100 {
            store.enqueue(i.to_string()).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(m) = store.dequeue(Duration::from_millis(20)).await.unwrap() {
                    got.push(m);
                }
                got
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_by_key(|m| m.parse::<u32>().unwrap());
        let expected: Vec<String> = (0..100).map(|i: u32| i.to_string()).collect();
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn set_only_writes_absent_keys() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.set("k", "first".into(), TTL).await.unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(
            store.set("k", "second".into(), TTL).await.unwrap(),
            WriteOutcome::AlreadyExists
        );
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test(start_paused = true)]
    async fn values_expire_after_ttl() {
        let store = InMemoryStore::new();
        store.set("k", "v".into(), Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());

        // An expired key can be written again.
        assert_eq!(
            store.set("k", "again".into(), TTL).await.unwrap(),
            WriteOutcome::Written
        );
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_unread_expired_values() {
        let store = InMemoryStore::new();
        for i in 0..1000 {
            store
                .set(&format!("k{i}"), "v".into(), Duration::from_secs(1))
                .await
                .unwrap();
        }
        assert_eq!(store.results.lock().await.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        store.set("fresh", "v".into(), TTL).await.unwrap();

        let results = store.results.lock().await;
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("fresh"));
    }

    #[tokio::test]
    async fn offline_store_rejects_everything() {
        let store = InMemoryStore::new();
        store.set_offline(true);

        assert_matches!(store.enqueue("m".into()).await, Err(StoreError::Unavailable(_)));
        assert_matches!(store.get("k").await, Err(StoreError::Unavailable(_)));
        assert_matches!(store.ping().await, Err(StoreError::Unavailable(_)));

        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}
