//! Live stream relay library
//!
//! `relay-rs` takes one inbound live stream and republishes it to many
//! real-time viewers, transcoding in the middle. The ingest protocol
//! publishes raw byte chunks into a [`StreamRegistry`]; a [`Supervisor`]
//! discovers each new primary stream and starts a relay instance for it:
//! an external transcoding process converting the bytes into two RTP
//! substreams, and a packet relay rewriting each packet per destination
//! and fanning it out to the viewer tracks in a [`TrackRegistry`].
//!
//! Ingest termination, viewer signaling and the forwarding sink are
//! external collaborators; they connect through the channels built by
//! [`topology::Topology`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay_rs::registry::StreamRegistry;
//! use relay_rs::relay::{ActiveRelaySet, Supervisor, TranscodeLauncher};
//! use relay_rs::stats::RelayCounters;
//! use relay_rs::track::TrackRegistry;
//! use relay_rs::RelayConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let config = RelayConfig::default();
//! let registry = Arc::new(StreamRegistry::new());
//! let tracks = Arc::new(TrackRegistry::new());
//! let active = Arc::new(ActiveRelaySet::new());
//! let counters = Arc::new(RelayCounters::new());
//!
//! let launcher = TranscodeLauncher::new(
//!     config.clone(),
//!     Arc::clone(&registry),
//!     Arc::clone(&tracks),
//!     Arc::clone(&active),
//!     Arc::clone(&counters),
//! );
//! let supervisor = Arc::new(Supervisor::new(
//!     &config,
//!     Arc::clone(&registry),
//!     launcher,
//!     active,
//!     counters,
//! ));
//!
//! let cancel = CancellationToken::new();
//! supervisor.spawn(cancel.clone());
//!
//! // The ingest side publishes chunks:
//! let writer = registry.publish("demo").await;
//! writer.write(bytes::Bytes::from_static(b"...")).await;
//! # }
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod relay;
pub mod rtp;
pub mod stats;
pub mod topology;
pub mod track;

pub use config::{BackpressurePolicy, RelayConfig};
pub use error::{Error, Result, RtpError};
pub use registry::{StreamRegistry, StreamWriter};
pub use relay::{ActiveRelaySet, RelayHandle, RelayLauncher, Supervisor, TranscodeLauncher};
pub use rtp::RtpPacket;
pub use stats::RelayCounters;
pub use topology::{MediaPacket, SessionAnswer, SessionOffer, Topology};
pub use track::{MediaKind, Track, TrackRegistry};
