//! Stream relay: discovery, transcoding and packet fan-out
//!
//! The relay turns one published byte stream into per-viewer RTP tracks:
//!
//! ```text
//! StreamRegistry ──subscriber queue──► Transcoder (external process)
//!                                          │ RTP over loopback UDP
//!                                ┌─────────┴─────────┐
//!                                ▼                   ▼
//!                          relay_loop(video)   relay_loop(audio)
//!                                │                   │
//!                                └──── TrackRegistry snapshot ────► viewer tracks
//! ```
//!
//! The [`Supervisor`] scans the registry and starts one
//! instance per primary stream through a [`RelayLauncher`]; the
//! [`ActiveRelaySet`] guarantees at most one instance per name, and the
//! [`PortAllocator`] gives each instance an exclusive endpoint pair.

pub mod active;
pub mod forward;
pub mod instance;
pub mod ports;
pub mod supervisor;
pub mod transcoder;

pub use active::ActiveRelaySet;
pub use instance::{RelayHandle, RelayLauncher, TranscodeLauncher};
pub use ports::{PortAllocator, PortPair};
pub use supervisor::Supervisor;
pub use transcoder::{Transcoder, TranscoderSpec};
