//! Relay configuration

use std::net::IpAddr;
use std::time::Duration;

/// Backpressure policy applied when the ingest-side queues are full
///
/// The ingest socket must never stall indefinitely, and silent drops must
/// stay observable, so the sender blocks for a bounded wait and then drops
/// with a counter increment. See [`crate::topology::IngestSender`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Wait up to the configured timeout for queue space, then drop
    BoundedWait,
    /// Drop immediately when the queue is full
    DropNewest,
}

/// Configuration for the relay subsystem
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Interval between supervisor scans of the stream registry
    pub poll_interval: Duration,

    /// Delimiter marking a derived, per-viewer stream name.
    /// Names containing it are never selected for primary relay.
    pub viewer_delimiter: char,

    /// Capacity of each stream subscriber queue (byte chunks)
    pub subscriber_queue_capacity: usize,

    /// Capacity of the ingest-to-forwarding and ingest-to-relay queues
    pub ingest_queue_capacity: usize,

    /// Backpressure policy for the ingest-side queues
    pub backpressure: BackpressurePolicy,

    /// Bounded wait before an ingest packet is dropped (BoundedWait policy)
    pub ingest_send_timeout: Duration,

    /// Local address the per-instance RTP listeners bind to
    pub rtp_bind_ip: IpAddr,

    /// First port of the relay endpoint pool (video/audio pairs)
    pub rtp_port_min: u16,

    /// One past the last port of the relay endpoint pool
    pub rtp_port_max: u16,

    /// Transcoder executable
    pub transcoder_program: String,

    /// Video bitrate passed to the transcoder (e.g. "6000k")
    pub video_bitrate: String,

    /// Maximum video bitrate (e.g. "8000k")
    pub video_max_bitrate: String,

    /// Video encoder buffer size (e.g. "12000k")
    pub video_buffer_size: String,

    /// Capacity of each viewer track's packet queue
    pub track_queue_capacity: usize,

    /// Grace period between transcoder kill and forced reap
    pub shutdown_grace: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            viewer_delimiter: '@',
            subscriber_queue_capacity: 1024,
            ingest_queue_capacity: 65536,
            backpressure: BackpressurePolicy::BoundedWait,
            ingest_send_timeout: Duration::from_millis(100),
            rtp_bind_ip: "127.0.0.1".parse().unwrap(),
            rtp_port_min: 5004,
            rtp_port_max: 5104,
            transcoder_program: "ffmpeg".to_string(),
            video_bitrate: "6000k".to_string(),
            video_max_bitrate: "8000k".to_string(),
            video_buffer_size: "12000k".to_string(),
            track_queue_capacity: 256,
            shutdown_grace: Duration::from_secs(3),
        }
    }
}

impl RelayConfig {
    /// Set the supervisor poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the viewer-stream delimiter
    pub fn viewer_delimiter(mut self, delimiter: char) -> Self {
        self.viewer_delimiter = delimiter;
        self
    }

    /// Set the subscriber queue capacity
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity.max(1);
        self
    }

    /// Set the ingest queue capacity
    pub fn ingest_queue_capacity(mut self, capacity: usize) -> Self {
        self.ingest_queue_capacity = capacity.max(1);
        self
    }

    /// Set the backpressure policy
    pub fn backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.backpressure = policy;
        self
    }

    /// Set the RTP endpoint pool range (`min..max`)
    pub fn rtp_port_range(mut self, min: u16, max: u16) -> Self {
        self.rtp_port_min = min;
        self.rtp_port_max = max.max(min);
        self
    }

    /// Set the transcoder executable
    pub fn transcoder_program(mut self, program: impl Into<String>) -> Self {
        self.transcoder_program = program.into();
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
