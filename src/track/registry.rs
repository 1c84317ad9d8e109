//! Destination-track table
//!
//! Keyed by (stream name, media kind). Written by the signaling layer on
//! viewer join/leave, read by the relay loops per packet. Reads return an
//! owned snapshot of `Arc<Track>`s, so relay iteration is immune to
//! concurrent removal.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{MediaKind, Track};

type TrackKey = (String, MediaKind);

/// Synchronized table of destination tracks
pub struct TrackRegistry {
    tracks: RwLock<HashMap<TrackKey, Vec<Arc<Track>>>>,
}

impl TrackRegistry {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            tracks: RwLock::new(HashMap::new()),
        }
    }

    /// Add a viewer track for a stream and media kind
    pub async fn add(&self, stream: &str, kind: MediaKind, track: Arc<Track>) {
        let mut tracks = self.tracks.write().await;
        tracks
            .entry((stream.to_string(), kind))
            .or_default()
            .push(track);

        tracing::debug!(stream = %stream, kind = %kind, "Track added");
    }

    /// Remove a viewer track by its negotiated synchronization source
    ///
    /// Returns whether a track was removed.
    pub async fn remove(&self, stream: &str, kind: MediaKind, ssrc: u32) -> bool {
        let mut tracks = self.tracks.write().await;
        let key = (stream.to_string(), kind);

        if let Some(list) = tracks.get_mut(&key) {
            let before = list.len();
            list.retain(|t| t.ssrc != ssrc);
            let removed = list.len() != before;
            if list.is_empty() {
                tracks.remove(&key);
            }
            if removed {
                tracing::debug!(stream = %stream, kind = %kind, ssrc = ssrc, "Track removed");
            }
            removed
        } else {
            false
        }
    }

    /// Snapshot of the current destinations for (stream, kind)
    pub async fn snapshot(&self, stream: &str, kind: MediaKind) -> Vec<Arc<Track>> {
        let tracks = self.tracks.read().await;
        tracks
            .get(&(stream.to_string(), kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Drop every track belonging to a stream (both media kinds)
    pub async fn clear_stream(&self, stream: &str) {
        let mut tracks = self.tracks.write().await;
        tracks.retain(|(name, _), _| name != stream);
    }

    /// Number of tracks registered for (stream, kind)
    pub async fn track_count(&self, stream: &str, kind: MediaKind) -> usize {
        let tracks = self.tracks.read().await;
        tracks
            .get(&(stream.to_string(), kind))
            .map_or(0, |list| list.len())
    }
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
