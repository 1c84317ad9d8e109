//! Relay wiring example
//!
//! Run with: cargo run --example relay_server [STREAM_NAME]
//!
//! Pipe raw media into stdin and it is published into the registry under
//! STREAM_NAME (default "demo"). The supervisor discovers the stream and
//! starts a transcoding relay instance for it; a stub signaling task
//! registers one video and one audio viewer track and prints how many
//! packets reach them.
//!
//! Example:
//!   ffmpeg -re -i input.mp4 -c copy -f mpegts - | cargo run --example relay_server
//!
//! Requires `ffmpeg` on PATH for the transcoding process.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use relay_rs::registry::StreamRegistry;
use relay_rs::relay::{ActiveRelaySet, Supervisor, TranscodeLauncher};
use relay_rs::stats::RelayCounters;
use relay_rs::topology::{media_packet, run_registry_pump, Topology};
use relay_rs::track::{MediaKind, Track, TrackRegistry};
use relay_rs::RelayConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_rs=debug,relay_server=info".into()),
        )
        .init();

    let stream_name = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());

    let config = RelayConfig::default().poll_interval(Duration::from_millis(500));
    let counters = Arc::new(RelayCounters::new());
    let registry = Arc::new(StreamRegistry::new());
    let tracks = Arc::new(TrackRegistry::new());
    let active = Arc::new(ActiveRelaySet::new());

    let topology = Topology::new(&config, Arc::clone(&counters));

    // Relay queue -> stream registry
    tokio::spawn(run_registry_pump(
        topology.relay_rx,
        Arc::clone(&registry),
    ));

    // The forwarding sink is an external collaborator; here we just
    // drain its queue.
    let mut forwarding_rx = topology.forwarding_rx;
    tokio::spawn(async move { while forwarding_rx.recv().await.is_some() {} });

    // Supervisor discovers the stream and launches the relay
    let launcher = TranscodeLauncher::new(
        config.clone(),
        Arc::clone(&registry),
        Arc::clone(&tracks),
        Arc::clone(&active),
        Arc::clone(&counters),
    );
    let supervisor = Arc::new(Supervisor::new(
        &config,
        Arc::clone(&registry),
        launcher,
        Arc::clone(&active),
        Arc::clone(&counters),
    ));
    let cancel = CancellationToken::new();
    supervisor.spawn(cancel.clone());

    // Stub viewer: one track per media kind, draining and counting
    let (video_track, mut video_rx) = Track::channel(96, 1001, config.track_queue_capacity);
    let (audio_track, mut audio_rx) = Track::channel(111, 2002, config.track_queue_capacity);
    tracks
        .add(&stream_name, MediaKind::Video, Arc::new(video_track))
        .await;
    tracks
        .add(&stream_name, MediaKind::Audio, Arc::new(audio_track))
        .await;

    tokio::spawn(async move {
        let mut count = 0u64;
        while video_rx.recv().await.is_some() {
            count += 1;
            if count % 500 == 0 {
                println!("viewer: {} video packets", count);
            }
        }
    });
    tokio::spawn(async move { while audio_rx.recv().await.is_some() {} });

    // Feed stdin into the ingest queues
    println!("Publishing stdin as stream '{}'...", stream_name);
    let ingest = topology.ingest.clone();
    let mut stdin = tokio::io::stdin();
    let mut buf = vec![0u8; 4096];
    loop {
        match stdin.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                ingest
                    .send(media_packet(
                        stream_name.clone(),
                        buf[..n].to_vec(),
                    ))
                    .await;
            }
        }
    }

    println!("Input ended, shutting down");
    registry.close(&stream_name).await;
    cancel.cancel();
    supervisor.shutdown_all().await;

    let snapshot = counters.snapshot();
    println!(
        "Relayed {} packets ({} parse errors, {} write failures, {} ingest drops)",
        snapshot.packets_relayed,
        snapshot.parse_errors,
        snapshot.track_write_failures,
        snapshot.ingest_drops,
    );
}
