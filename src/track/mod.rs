//! Viewer tracks and the shared routing table
//!
//! A [`Track`] is one viewer's inbound media leg for one media kind. The
//! external signaling layer creates and removes tracks as viewers join
//! and leave; the packet relay reads the table on its hot write path.
//! [`TrackRegistry`] is the single owned object mediating that sharing:
//! lookups return an owned snapshot, so the relay never iterates a list
//! that a concurrent viewer-leave is mutating.

pub mod registry;

pub use registry::TrackRegistry;

use tokio::sync::mpsc;

use crate::rtp::RtpPacket;

/// Media kind of a track or relay leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// One viewer's inbound media leg for one media kind
///
/// Carries the payload-type and synchronization-source values negotiated
/// with that viewer, and the bounded queue the peer-transport writer
/// drains. The relay rewrites each packet to these values before writing.
#[derive(Debug)]
pub struct Track {
    /// Negotiated payload-type identifier
    pub payload_type: u8,
    /// Negotiated synchronization-source identifier
    pub ssrc: u32,
    sink: mpsc::Sender<RtpPacket>,
}

impl Track {
    /// Create a track around an existing sink queue
    pub fn new(payload_type: u8, ssrc: u32, sink: mpsc::Sender<RtpPacket>) -> Self {
        Self {
            payload_type,
            ssrc,
            sink,
        }
    }

    /// Create a track together with the receiving end of its queue
    pub fn channel(
        payload_type: u8,
        ssrc: u32,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<RtpPacket>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(payload_type, ssrc, tx), rx)
    }

    /// Queue a packet for this viewer without blocking
    ///
    /// A full or closed queue is reported to the caller; the relay logs
    /// it and moves on to the remaining destinations.
    pub fn write(&self, packet: RtpPacket) -> Result<(), TrackWriteError> {
        self.sink.try_send(packet).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TrackWriteError::Full,
            mpsc::error::TrySendError::Closed(_) => TrackWriteError::Closed,
        })
    }

    /// Whether the viewer side has gone away
    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }
}

/// Failure writing to one destination track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackWriteError {
    /// The track's queue is full
    Full,
    /// The viewer side dropped the receiver
    Closed,
}

impl std::fmt::Display for TrackWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackWriteError::Full => write!(f, "Track queue full"),
            TrackWriteError::Closed => write!(f, "Track closed"),
        }
    }
}

impl std::error::Error for TrackWriteError {}
