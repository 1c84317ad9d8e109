//! Ingest fan-in with explicit backpressure
//!
//! Queue-full on the ingest side is a backpressure event with a
//! deliberate, documented policy: wait a bounded interval for space,
//! then drop the packet and count it. Unbounded blocking would stall
//! the ingest socket; silent dropping would hide quality loss. The
//! immediate-drop variant exists for deployments that prefer latency
//! over completeness.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::config::{BackpressurePolicy, RelayConfig};
use crate::stats::RelayCounters;

/// One raw media packet as received from the ingest protocol
#[derive(Debug, Clone)]
pub struct MediaPacket {
    /// Stream the packet belongs to
    pub stream: String,
    /// Raw packet bytes
    pub data: Bytes,
}

/// Fans ingest packets into the forwarding and relay queues
#[derive(Clone)]
pub struct IngestSender {
    forwarding_tx: mpsc::Sender<MediaPacket>,
    relay_tx: mpsc::Sender<MediaPacket>,
    policy: BackpressurePolicy,
    send_timeout: Duration,
    counters: Arc<RelayCounters>,
}

impl IngestSender {
    pub(super) fn new(
        forwarding_tx: mpsc::Sender<MediaPacket>,
        relay_tx: mpsc::Sender<MediaPacket>,
        config: &RelayConfig,
        counters: Arc<RelayCounters>,
    ) -> Self {
        Self {
            forwarding_tx,
            relay_tx,
            policy: config.backpressure,
            send_timeout: config.ingest_send_timeout,
            counters,
        }
    }

    /// Deliver one packet to both queues under the backpressure policy
    ///
    /// Delivery to one queue is independent of the other; the payload
    /// clone is a refcount bump.
    pub async fn send(&self, packet: MediaPacket) {
        self.send_one(&self.forwarding_tx, packet.clone()).await;
        self.send_one(&self.relay_tx, packet).await;
    }

    async fn send_one(&self, tx: &mpsc::Sender<MediaPacket>, packet: MediaPacket) {
        match self.policy {
            BackpressurePolicy::DropNewest => match tx.try_send(packet) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(packet)) => {
                    tracing::debug!(stream = %packet.stream, "Ingest queue full, dropping packet");
                    self.counters.record_ingest_drop();
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!("Ingest queue closed");
                }
            },
            BackpressurePolicy::BoundedWait => {
                match tokio::time::timeout(self.send_timeout, tx.send(packet)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        // Receiver gone; the consumer side shut down
                        tracing::debug!(stream = %e.0.stream, "Ingest queue closed");
                    }
                    Err(_) => {
                        self.counters.record_ingest_drop();
                        tracing::debug!("Ingest queue full past bounded wait, dropping packet");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sender_with(
        policy: BackpressurePolicy,
        capacity: usize,
    ) -> (
        IngestSender,
        mpsc::Receiver<MediaPacket>,
        mpsc::Receiver<MediaPacket>,
        Arc<RelayCounters>,
    ) {
        let mut config = RelayConfig::default().backpressure(policy);
        config.ingest_send_timeout = Duration::from_millis(20);
        let counters = Arc::new(RelayCounters::new());
        let (fwd_tx, fwd_rx) = mpsc::channel(capacity);
        let (relay_tx, relay_rx) = mpsc::channel(capacity);
        let sender = IngestSender::new(fwd_tx, relay_tx, &config, Arc::clone(&counters));
        (sender, fwd_rx, relay_rx, counters)
    }

    fn packet(n: u8) -> MediaPacket {
        MediaPacket {
            stream: "demo".to_string(),
            data: Bytes::from(vec![n]),
        }
    }

    #[tokio::test]
    async fn test_send_reaches_both_queues() {
        let (sender, mut fwd_rx, mut relay_rx, counters) =
            sender_with(BackpressurePolicy::BoundedWait, 8);

        sender.send(packet(1)).await;

        assert_eq!(fwd_rx.recv().await.unwrap().data, Bytes::from(vec![1]));
        assert_eq!(relay_rx.recv().await.unwrap().data, Bytes::from(vec![1]));
        assert_eq!(counters.snapshot().ingest_drops, 0);
    }

    #[tokio::test]
    async fn test_bounded_wait_drops_after_timeout() {
        let (sender, _fwd_rx, _relay_rx, counters) =
            sender_with(BackpressurePolicy::BoundedWait, 1);

        sender.send(packet(1)).await;
        // Both queues are now full and nobody is draining them
        sender.send(packet(2)).await;

        assert_eq!(counters.snapshot().ingest_drops, 2);
    }

    #[tokio::test]
    async fn test_drop_newest_never_waits() {
        let (sender, _fwd_rx, _relay_rx, counters) =
            sender_with(BackpressurePolicy::DropNewest, 1);

        sender.send(packet(1)).await;

        let before = std::time::Instant::now();
        sender.send(packet(2)).await;

        assert!(before.elapsed() < Duration::from_millis(10));
        assert_eq!(counters.snapshot().ingest_drops, 2);
    }

    #[tokio::test]
    async fn test_bounded_wait_succeeds_when_space_frees() {
        let (sender, mut fwd_rx, mut relay_rx, counters) =
            sender_with(BackpressurePolicy::BoundedWait, 1);

        sender.send(packet(1)).await;

        // A consumer drains while the second send is waiting
        let drain = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            fwd_rx.recv().await;
            relay_rx.recv().await;
            (fwd_rx, relay_rx)
        });

        sender.send(packet(2)).await;
        let (mut fwd_rx, mut relay_rx) = drain.await.unwrap();

        assert_eq!(counters.snapshot().ingest_drops, 0);
        assert_eq!(fwd_rx.recv().await.unwrap().data, Bytes::from(vec![2]));
        assert_eq!(relay_rx.recv().await.unwrap().data, Bytes::from(vec![2]));
    }
}
