//! Relay instance lifecycle
//!
//! A relay instance is the paired transcoder + packet-relay unit for one
//! primary stream: an exclusive port pair, two bound UDP sockets, the
//! transcoding process fed from a registry subscription, and one relay
//! loop per media kind. A monitor task ties their lifetimes together:
//! when the process exits (voluntarily or by cancellation) the loops are
//! stopped, the ports return to the pool and the stream's reservation in
//! the [`ActiveRelaySet`] is released.

use std::future::Future;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::registry::StreamRegistry;
use crate::relay::active::ActiveRelaySet;
use crate::relay::forward::relay_loop;
use crate::relay::ports::{PortAllocator, PortPair};
use crate::relay::transcoder::{Transcoder, TranscoderSpec};
use crate::stats::RelayCounters;
use crate::track::{MediaKind, TrackRegistry};

/// Starts relay instances for the supervisor
///
/// The seam between stream discovery and instance construction; tests
/// substitute their own implementation.
pub trait RelayLauncher: Send + Sync + 'static {
    /// Start a relay instance for one primary stream
    fn launch(&self, stream: &str) -> impl Future<Output = Result<RelayHandle>> + Send;
}

/// Handle to a running relay instance
pub struct RelayHandle {
    stream: String,
    cancel: CancellationToken,
    monitor: tokio::task::JoinHandle<()>,
}

impl RelayHandle {
    pub(crate) fn from_parts(
        stream: &str,
        cancel: CancellationToken,
        monitor: tokio::task::JoinHandle<()>,
    ) -> Self {
        Self {
            stream: stream.to_string(),
            cancel,
            monitor,
        }
    }

    /// Stream this instance relays
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Request shutdown of the whole instance
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the instance has fully stopped
    pub fn is_finished(&self) -> bool {
        self.monitor.is_finished()
    }

    /// Wait until the instance has fully stopped
    pub async fn join(self) {
        let _ = self.monitor.await;
    }
}

/// Production launcher backed by the external transcoding process
pub struct TranscodeLauncher {
    config: RelayConfig,
    registry: Arc<StreamRegistry>,
    tracks: Arc<TrackRegistry>,
    ports: Arc<PortAllocator>,
    active: Arc<ActiveRelaySet>,
    counters: Arc<RelayCounters>,
}

impl TranscodeLauncher {
    pub fn new(
        config: RelayConfig,
        registry: Arc<StreamRegistry>,
        tracks: Arc<TrackRegistry>,
        active: Arc<ActiveRelaySet>,
        counters: Arc<RelayCounters>,
    ) -> Self {
        let ports = Arc::new(PortAllocator::new(config.rtp_port_min, config.rtp_port_max));
        Self {
            config,
            registry,
            tracks,
            ports,
            active,
            counters,
        }
    }

    /// The endpoint pool, exposed for inspection
    pub fn ports(&self) -> &Arc<PortAllocator> {
        &self.ports
    }
}

impl RelayLauncher for TranscodeLauncher {
    async fn launch(&self, stream: &str) -> Result<RelayHandle> {
        let ports = self.ports.allocate().await?;
        let spec = TranscoderSpec::ffmpeg(&self.config, ports);

        start_instance(
            stream,
            spec,
            ports,
            &self.config,
            Arc::clone(&self.registry),
            Arc::clone(&self.tracks),
            Arc::clone(&self.ports),
            Arc::clone(&self.active),
            Arc::clone(&self.counters),
        )
        .await
    }
}

/// Bind sockets, spawn the transcoder and loops, wire up the monitor
///
/// Any startup failure releases the port pair before returning; the
/// caller (supervisor) releases the stream's reservation.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn start_instance(
    stream: &str,
    spec: TranscoderSpec,
    ports: PortPair,
    config: &RelayConfig,
    registry: Arc<StreamRegistry>,
    tracks: Arc<TrackRegistry>,
    allocator: Arc<PortAllocator>,
    active: Arc<ActiveRelaySet>,
    counters: Arc<RelayCounters>,
) -> Result<RelayHandle> {
    let ip = config.rtp_bind_ip;

    let video_socket = match UdpSocket::bind((ip, ports.video)).await {
        Ok(socket) => socket,
        Err(e) => {
            allocator.release(ports).await;
            return Err(e.into());
        }
    };
    let audio_socket = match UdpSocket::bind((ip, ports.audio)).await {
        Ok(socket) => socket,
        Err(e) => {
            allocator.release(ports).await;
            return Err(e.into());
        }
    };

    let (input_tx, input_rx) = mpsc::channel(config.subscriber_queue_capacity);
    let subscriber_id = registry.subscribe(stream, input_tx).await;

    let cancel = CancellationToken::new();
    let transcoder = match Transcoder::spawn(
        spec,
        stream,
        input_rx,
        cancel.clone(),
        config.shutdown_grace,
    ) {
        Ok(transcoder) => transcoder,
        Err(e) => {
            registry.unsubscribe(stream, subscriber_id).await;
            allocator.release(ports).await;
            return Err(e);
        }
    };

    // Loops run on child tokens so instance shutdown stops them, while
    // a single loop failure does not cancel its sibling.
    let video_task = tokio::spawn(relay_loop(
        video_socket,
        stream.to_string(),
        MediaKind::Video,
        Arc::clone(&tracks),
        Arc::clone(&counters),
        cancel.child_token(),
    ));
    let audio_task = tokio::spawn(relay_loop(
        audio_socket,
        stream.to_string(),
        MediaKind::Audio,
        Arc::clone(&tracks),
        Arc::clone(&counters),
        cancel.child_token(),
    ));

    tracing::info!(
        stream = %stream,
        video_port = ports.video,
        audio_port = ports.audio,
        "Relay instance started"
    );

    let name = stream.to_string();
    let monitor_cancel = cancel.clone();
    let monitor = tokio::spawn(async move {
        match transcoder.wait().await {
            Ok(status) => {
                tracing::info!(stream = %name, status = %status, "Transcoder exited")
            }
            Err(e) => tracing::warn!(stream = %name, error = %e, "Transcoder wait failed"),
        }

        // Process exit is terminal for the instance
        monitor_cancel.cancel();
        let _ = video_task.await;
        let _ = audio_task.await;

        registry.unsubscribe(&name, subscriber_id).await;
        allocator.release(ports).await;
        active.release(&name).await;

        tracing::info!(stream = %name, "Relay instance stopped");
    });

    Ok(RelayHandle::from_parts(stream, cancel, monitor))
}
