//! Packet relay loop
//!
//! One loop per media kind per relay instance, each bound to that
//! instance's exclusive UDP port. Every datagram is parsed once, then
//! rewritten and queued for each destination track. Per-packet and
//! per-destination faults are logged and skipped; only cancellation or a
//! socket error ends the loop.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::rtp::RtpPacket;
use crate::stats::RelayCounters;
use crate::track::{MediaKind, TrackRegistry};

/// Largest datagram the transcoder will emit
const UDP_MTU: usize = 1500;

/// Receive, rewrite and redistribute one substream until cancelled
pub async fn relay_loop(
    socket: UdpSocket,
    stream: String,
    kind: MediaKind,
    tracks: Arc<TrackRegistry>,
    counters: Arc<RelayCounters>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; UDP_MTU];

    loop {
        let len = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv(&mut buf) => match received {
                Ok(len) => len,
                Err(e) => {
                    tracing::warn!(stream = %stream, kind = %kind, error = %e, "Relay socket read failed");
                    break;
                }
            },
        };

        let packet = match RtpPacket::parse(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(stream = %stream, kind = %kind, error = %e, "Dropping malformed packet");
                counters.record_parse_error();
                continue;
            }
        };

        // Owned snapshot: viewer join/leave cannot mutate the list
        // mid-iteration.
        let destinations = tracks.snapshot(&stream, kind).await;
        if destinations.is_empty() {
            continue;
        }

        let mut delivered = false;
        for track in &destinations {
            let out = packet.retarget(track.payload_type, track.ssrc);
            match track.write(out) {
                Ok(()) => delivered = true,
                Err(e) => {
                    tracing::debug!(
                        stream = %stream,
                        kind = %kind,
                        ssrc = track.ssrc,
                        error = %e,
                        "Track write failed"
                    );
                    counters.record_track_write_failure();
                }
            }
        }

        if delivered {
            counters.record_relayed();
        }
    }

    tracing::debug!(stream = %stream, kind = %kind, "Relay loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::track::Track;

    async fn start_loop(
        stream: &str,
        kind: MediaKind,
        tracks: Arc<TrackRegistry>,
        counters: Arc<RelayCounters>,
        cancel: CancellationToken,
    ) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let task = tokio::spawn(relay_loop(
            socket,
            stream.to_string(),
            kind,
            tracks,
            counters,
            cancel,
        ));
        (addr, task)
    }

    fn video_datagram(ssrc: u32, seq: u16) -> Vec<u8> {
        let mut data = vec![0x80, 96];
        data.extend_from_slice(&seq.to_be_bytes());
        data.extend_from_slice(&3000u32.to_be_bytes());
        data.extend_from_slice(&ssrc.to_be_bytes());
        data.extend_from_slice(b"frame-data");
        data
    }

    #[tokio::test]
    async fn test_rewrites_per_destination() {
        let tracks = Arc::new(TrackRegistry::new());
        let counters = Arc::new(RelayCounters::new());
        let cancel = CancellationToken::new();

        let (track_a, mut rx_a) = Track::channel(96, 1001, 8);
        let (track_b, mut rx_b) = Track::channel(97, 2002, 8);
        tracks.add("demo", MediaKind::Video, Arc::new(track_a)).await;
        tracks.add("demo", MediaKind::Video, Arc::new(track_b)).await;

        let (addr, task) = start_loop(
            "demo",
            MediaKind::Video,
            Arc::clone(&tracks),
            Arc::clone(&counters),
            cancel.clone(),
        )
        .await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&video_datagram(555, 10), addr).await.unwrap();

        let a = timeout(Duration::from_secs(1), rx_a.recv())
            .await
            .unwrap()
            .unwrap();
        let b = timeout(Duration::from_secs(1), rx_b.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(a.payload_type, 96);
        assert_eq!(a.ssrc, 1001);
        assert_eq!(b.payload_type, 97);
        assert_eq!(b.ssrc, 2002);

        // Same sequence, timestamp and payload on both copies
        for packet in [&a, &b] {
            assert_eq!(packet.sequence, 10);
            assert_eq!(packet.timestamp, 3000);
            assert_eq!(packet.payload.as_ref(), b"frame-data");
        }

        assert_eq!(counters.snapshot().packets_relayed, 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_packet_does_not_kill_loop() {
        let tracks = Arc::new(TrackRegistry::new());
        let counters = Arc::new(RelayCounters::new());
        let cancel = CancellationToken::new();

        let (track, mut rx) = Track::channel(96, 1001, 8);
        tracks.add("demo", MediaKind::Video, Arc::new(track)).await;

        let (addr, task) = start_loop(
            "demo",
            MediaKind::Video,
            Arc::clone(&tracks),
            Arc::clone(&counters),
            cancel.clone(),
        )
        .await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&[0xFF, 0x00, 0x01], addr).await.unwrap();
        sender.send_to(&video_datagram(555, 11), addr).await.unwrap();

        // The well-formed packet after the malformed one still arrives
        let packet = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet.sequence, 11);
        assert_eq!(counters.snapshot().parse_errors, 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_destination_does_not_block_others() {
        let tracks = Arc::new(TrackRegistry::new());
        let counters = Arc::new(RelayCounters::new());
        let cancel = CancellationToken::new();

        // Zero-capacity queues are not possible; capacity 1, pre-filled
        let (full_track, mut full_rx) = Track::channel(96, 1001, 1);
        full_track
            .write(RtpPacket::parse(&video_datagram(1, 1)).unwrap())
            .unwrap();
        let (open_track, mut open_rx) = Track::channel(97, 2002, 8);
        tracks.add("demo", MediaKind::Video, Arc::new(full_track)).await;
        tracks.add("demo", MediaKind::Video, Arc::new(open_track)).await;

        let (addr, task) = start_loop(
            "demo",
            MediaKind::Video,
            Arc::clone(&tracks),
            Arc::clone(&counters),
            cancel.clone(),
        )
        .await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&video_datagram(555, 12), addr).await.unwrap();

        let packet = timeout(Duration::from_secs(1), open_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet.ssrc, 2002);
        assert_eq!(counters.snapshot().track_write_failures, 1);

        // The full track still holds only its pre-filled packet
        assert_eq!(full_rx.recv().await.unwrap().sequence, 1);

        cancel.cancel();
        task.await.unwrap();
        drop(full_rx);
    }

    #[tokio::test]
    async fn test_cancellation_stops_loop() {
        let tracks = Arc::new(TrackRegistry::new());
        let counters = Arc::new(RelayCounters::new());
        let cancel = CancellationToken::new();

        let (_addr, task) = start_loop(
            "demo",
            MediaKind::Audio,
            tracks,
            counters,
            cancel.clone(),
        )
        .await;

        cancel.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("loop did not stop on cancel")
            .unwrap();
    }
}
