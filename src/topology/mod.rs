//! Channel topology
//!
//! The bounded queues and signaling links wired up at process start:
//! the ingest protocol fans raw media packets into the forwarding sink
//! queue and the relay queue, and the signaling service exchanges one
//! offer and one answer per viewer negotiation over a pair of rendezvous
//! links. Correlation across concurrent negotiations is the stream name
//! carried in the payload, never transport identity.

pub mod ingest;

pub use ingest::{IngestSender, MediaPacket};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::registry::StreamRegistry;
use crate::stats::RelayCounters;
use std::collections::HashMap;
use std::sync::Arc;

/// A remote session offer, keyed by stream name
#[derive(Debug, Clone)]
pub struct SessionOffer {
    /// Stream the viewer wants to watch
    pub stream: String,
    /// Serialized remote session description
    pub description: String,
}

/// The local answer to a [`SessionOffer`]
#[derive(Debug, Clone)]
pub struct SessionAnswer {
    /// Stream the negotiation belongs to
    pub stream: String,
    /// Serialized local session description
    pub description: String,
}

/// All channels connecting the collaborators at process start
///
/// The receivers are taken by the service that consumes them; the
/// senders are cloned into the producers.
pub struct Topology {
    /// Ingest-side fan-in handle feeding both packet queues
    pub ingest: IngestSender,
    /// Raw packets for the external forwarding sink
    pub forwarding_rx: mpsc::Receiver<MediaPacket>,
    /// Raw packets for the relay subsystem
    pub relay_rx: mpsc::Receiver<MediaPacket>,
    /// Offers from the signaling service
    pub offer_tx: mpsc::Sender<SessionOffer>,
    pub offer_rx: mpsc::Receiver<SessionOffer>,
    /// Answers back to the signaling service
    pub answer_tx: mpsc::Sender<SessionAnswer>,
    pub answer_rx: mpsc::Receiver<SessionAnswer>,
}

impl Topology {
    /// Build the topology from the configured capacities
    pub fn new(config: &RelayConfig, counters: Arc<RelayCounters>) -> Self {
        let (forwarding_tx, forwarding_rx) = mpsc::channel(config.ingest_queue_capacity);
        let (relay_tx, relay_rx) = mpsc::channel(config.ingest_queue_capacity);

        // Rendezvous links: one in-flight negotiation message per side
        let (offer_tx, offer_rx) = mpsc::channel(1);
        let (answer_tx, answer_rx) = mpsc::channel(1);

        Self {
            ingest: IngestSender::new(forwarding_tx, relay_tx, config, counters),
            forwarding_rx,
            relay_rx,
            offer_tx,
            offer_rx,
            answer_tx,
            answer_rx,
        }
    }
}

/// Drain the relay packet queue into the stream registry
///
/// The pump caches one [`StreamWriter`] per stream name and publishes
/// each packet's bytes to it. A cached handle that reports closure (the
/// stream was removed and the source reconnected) is discarded and the
/// stream is published anew, so a re-appearing source is registered
/// again. The pump ends when the queue closes.
///
/// [`StreamWriter`]: crate::registry::StreamWriter
pub async fn run_registry_pump(
    mut rx: mpsc::Receiver<MediaPacket>,
    registry: Arc<StreamRegistry>,
) {
    let mut writers: HashMap<String, crate::registry::StreamWriter> = HashMap::new();

    while let Some(packet) = rx.recv().await {
        let delivered = match writers.get(&packet.stream) {
            Some(writer) => writer.write(packet.data.clone()).await,
            None => false,
        };

        if !delivered {
            let writer = registry.publish(&packet.stream).await;
            writer.write(packet.data).await;
            writers.insert(packet.stream.clone(), writer);
        }
    }

    tracing::info!("Ingest queue closed, registry pump stopped");
}

/// Convenience constructor for raw packet payloads
pub fn media_packet(stream: impl Into<String>, data: impl Into<Bytes>) -> MediaPacket {
    MediaPacket {
        stream: stream.into(),
        data: data.into(),
    }
}
