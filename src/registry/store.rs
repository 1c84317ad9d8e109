//! Stream registry implementation
//!
//! The central registry that holds all live streams and fans published
//! byte chunks out to subscriber queues. Pure in-memory routing: the
//! registry knows nothing about the ingest protocol or the relay.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, RwLock};

use super::entry::{StreamEntry, SubscriberId};

/// Central registry for all live streams
///
/// Thread-safe via `RwLock` over the name map; each entry carries its own
/// lock so broadcasting on one stream never contends with another.
pub struct StreamRegistry {
    streams: RwLock<HashMap<String, Arc<Mutex<StreamEntry>>>>,
}

impl StreamRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Get a publish handle for a stream, creating it on first use
    ///
    /// Idempotent per name: a second publisher for the same name receives
    /// a handle to the same stream.
    pub async fn publish(&self, name: &str) -> StreamWriter {
        let entry = self.entry_or_create(name).await;

        tracing::info!(stream = %name, "Publisher attached");

        StreamWriter {
            name: name.to_string(),
            entry,
        }
    }

    /// Attach a bounded subscriber queue to a stream
    ///
    /// The stream is created if absent, so a subscriber may attach before
    /// the publisher arrives. Returns an id usable for [`unsubscribe`].
    ///
    /// [`unsubscribe`]: StreamRegistry::unsubscribe
    pub async fn subscribe(&self, name: &str, tx: mpsc::Sender<Bytes>) -> SubscriberId {
        let entry = self.entry_or_create(name).await;
        let id = {
            let mut entry = entry.lock().await;
            entry.attach(tx)
        };

        tracing::debug!(stream = %name, subscriber = id, "Subscriber attached");
        id
    }

    /// Detach a subscriber queue from a stream
    pub async fn unsubscribe(&self, name: &str, id: SubscriberId) {
        let streams = self.streams.read().await;

        if let Some(entry) = streams.get(name) {
            let removed = entry.lock().await.detach(id);
            if removed {
                tracing::debug!(stream = %name, subscriber = id, "Subscriber detached");
            }
        }
    }

    /// Remove a stream, closing every subscriber queue
    ///
    /// Called when the source ends. The entry is marked closed so any
    /// outstanding [`StreamWriter`] stops publishing into it, and the
    /// subscriber senders are dropped so each queue sees end-of-stream
    /// on its next receive.
    pub async fn close(&self, name: &str) -> bool {
        let removed = self.streams.write().await.remove(name);
        match removed {
            Some(entry) => {
                entry.lock().await.close();
                tracing::info!(stream = %name, "Stream closed");
                true
            }
            None => false,
        }
    }

    /// Names of all registered streams
    pub async fn snapshot(&self) -> Vec<String> {
        self.streams.read().await.keys().cloned().collect()
    }

    /// Number of registered streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Subscriber count for one stream, if it exists
    pub async fn subscriber_count(&self, name: &str) -> Option<usize> {
        let streams = self.streams.read().await;
        match streams.get(name) {
            Some(entry) => Some(entry.lock().await.subscriber_count()),
            None => None,
        }
    }

    /// Total chunks dropped on one stream's subscriber queues
    pub async fn dropped_chunks(&self, name: &str) -> Option<u64> {
        let streams = self.streams.read().await;
        match streams.get(name) {
            Some(entry) => Some(entry.lock().await.dropped_chunks()),
            None => None,
        }
    }

    async fn entry_or_create(&self, name: &str) -> Arc<Mutex<StreamEntry>> {
        {
            let streams = self.streams.read().await;
            if let Some(entry) = streams.get(name) {
                return Arc::clone(entry);
            }
        }

        let mut streams = self.streams.write().await;
        // Re-check under the write lock; another task may have won the race
        let entry = streams
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(stream = %name, "Stream created");
                Arc::new(Mutex::new(StreamEntry::new()))
            });
        Arc::clone(entry)
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable publish handle bound to one stream
#[derive(Clone)]
pub struct StreamWriter {
    name: String,
    entry: Arc<Mutex<StreamEntry>>,
}

impl StreamWriter {
    /// Stream name this writer publishes to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Broadcast one chunk to every current subscriber
    ///
    /// Returns `false` when the stream has been closed in the registry;
    /// the handle is stale and the caller should publish anew.
    pub async fn write(&self, chunk: Bytes) -> bool {
        let mut entry = self.entry.lock().await;
        if entry.is_closed() {
            return false;
        }
        entry.broadcast(&chunk);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_idempotent() {
        let registry = StreamRegistry::new();

        let w1 = registry.publish("demo").await;
        let w2 = registry.publish("demo").await;

        assert_eq!(registry.stream_count().await, 1);

        // Both handles reach the same subscriber
        let (tx, mut rx) = mpsc::channel(8);
        registry.subscribe("demo", tx).await;

        w1.write(Bytes::from_static(b"a")).await;
        w2.write(Bytes::from_static(b"b")).await;

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"a"));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"b"));
    }

    #[tokio::test]
    async fn test_fanout_in_order() {
        let registry = StreamRegistry::new();
        let writer = registry.publish("demo").await;

        let (tx1, mut rx1) = mpsc::channel(16);
        let (tx2, mut rx2) = mpsc::channel(16);
        registry.subscribe("demo", tx1).await;
        registry.subscribe("demo", tx2).await;

        for i in 0u8..5 {
            writer.write(Bytes::from(vec![i])).await;
        }

        for i in 0u8..5 {
            assert_eq!(rx1.recv().await.unwrap(), Bytes::from(vec![i]));
            assert_eq!(rx2.recv().await.unwrap(), Bytes::from(vec![i]));
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_locally() {
        let registry = StreamRegistry::new();
        let writer = registry.publish("demo").await;

        // Slow subscriber with capacity 1, healthy one with plenty
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(16);
        registry.subscribe("demo", slow_tx).await;
        registry.subscribe("demo", fast_tx).await;

        for i in 0u8..4 {
            writer.write(Bytes::from(vec![i])).await;
        }

        // The healthy subscriber saw everything in order
        for i in 0u8..4 {
            assert_eq!(fast_rx.recv().await.unwrap(), Bytes::from(vec![i]));
        }

        // The slow queue kept only the first chunk; the rest were dropped
        assert_eq!(slow_rx.recv().await.unwrap(), Bytes::from(vec![0]));
        assert_eq!(registry.dropped_chunks("demo").await, Some(3));
    }

    #[tokio::test]
    async fn test_subscribe_before_publish() {
        let registry = StreamRegistry::new();

        let (tx, mut rx) = mpsc::channel(8);
        registry.subscribe("early", tx).await;

        let writer = registry.publish("early").await;
        writer.write(Bytes::from_static(b"hello")).await;

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let registry = StreamRegistry::new();
        let writer = registry.publish("demo").await;

        let (tx, mut rx) = mpsc::channel(8);
        let id = registry.subscribe("demo", tx).await;
        assert_eq!(registry.subscriber_count("demo").await, Some(1));

        registry.unsubscribe("demo", id).await;
        assert_eq!(registry.subscriber_count("demo").await, Some(0));

        writer.write(Bytes::from_static(b"x")).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_subscriber_pruned() {
        let registry = StreamRegistry::new();
        let writer = registry.publish("demo").await;

        let (tx, rx) = mpsc::channel(8);
        registry.subscribe("demo", tx).await;
        drop(rx);

        writer.write(Bytes::from_static(b"x")).await;
        assert_eq!(registry.subscriber_count("demo").await, Some(0));
    }

    #[tokio::test]
    async fn test_close_ends_subscriber_queues() {
        let registry = StreamRegistry::new();
        let writer = registry.publish("demo").await;

        let (tx, mut rx) = mpsc::channel(8);
        registry.subscribe("demo", tx).await;
        writer.write(Bytes::from_static(b"x")).await;

        assert!(registry.close("demo").await);
        assert!(!registry.close("demo").await);
        assert_eq!(registry.stream_count().await, 0);

        // Buffered chunk still drains, then the queue reports closure
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"x"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_writer_reports_closed() {
        let registry = StreamRegistry::new();
        let stale = registry.publish("demo").await;

        assert!(stale.write(Bytes::from_static(b"live")).await);
        assert!(registry.close("demo").await);

        // The old handle points at the removed entry and must refuse it
        assert!(!stale.write(Bytes::from_static(b"lost")).await);

        // A fresh publish re-creates the stream and delivers again
        let writer = registry.publish("demo").await;
        let (tx, mut rx) = mpsc::channel(8);
        registry.subscribe("demo", tx).await;

        assert!(writer.write(Bytes::from_static(b"back")).await);
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"back"));
    }

    #[tokio::test]
    async fn test_snapshot() {
        let registry = StreamRegistry::new();
        registry.publish("one").await;
        registry.publish("two").await;

        let mut names = registry.snapshot().await;
        names.sort();
        assert_eq!(names, vec!["one".to_string(), "two".to_string()]);
    }
}
