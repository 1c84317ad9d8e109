//! Per-stream state stored in the registry

use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Identifier of an attached subscriber queue, unique within one stream
pub type SubscriberId = u64;

/// One attached subscriber queue
pub(super) struct Subscriber {
    pub(super) id: SubscriberId,
    pub(super) tx: mpsc::Sender<Bytes>,
    /// Chunks dropped on this queue because it was full
    pub(super) dropped: u64,
}

/// Entry for a single live stream
///
/// Owns the set of subscriber queues. Broadcast is per-subscriber
/// `try_send`: a full queue drops that subscriber's chunk and counts it,
/// never blocking the publisher or the other subscribers.
pub struct StreamEntry {
    pub(super) subscribers: Vec<Subscriber>,
    pub(super) next_subscriber_id: SubscriberId,

    /// Set when the stream is removed from the registry; writers holding
    /// a handle to this entry must stop publishing into it
    pub(super) closed: bool,

    /// Chunks published to this stream
    pub chunks_published: u64,

    /// Bytes published to this stream
    pub bytes_published: u64,

    /// When the stream was created
    pub created_at: Instant,
}

impl StreamEntry {
    pub(super) fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_subscriber_id: 1,
            closed: false,
            chunks_published: 0,
            bytes_published: 0,
            created_at: Instant::now(),
        }
    }

    /// Whether the stream has been removed from the registry
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(super) fn close(&mut self) {
        self.closed = true;
        self.subscribers.clear();
    }

    /// Number of attached subscriber queues
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total chunks dropped across all subscribers
    pub fn dropped_chunks(&self) -> u64 {
        self.subscribers.iter().map(|s| s.dropped).sum()
    }

    pub(super) fn attach(&mut self, tx: mpsc::Sender<Bytes>) -> SubscriberId {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.push(Subscriber { id, tx, dropped: 0 });
        id
    }

    pub(super) fn detach(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Broadcast one chunk to every attached queue
    ///
    /// Closed queues are pruned; full queues drop the chunk locally.
    pub(super) fn broadcast(&mut self, chunk: &Bytes) {
        self.chunks_published += 1;
        self.bytes_published += chunk.len() as u64;

        let mut closed = false;
        for sub in &mut self.subscribers {
            match sub.tx.try_send(chunk.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    sub.dropped += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    closed = true;
                }
            }
        }

        if closed {
            self.subscribers.retain(|s| !s.tx.is_closed());
        }
    }
}
