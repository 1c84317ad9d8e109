//! Real-time-transport packet handling
//!
//! Parsing and serialization of the RTP datagrams the transcoder emits,
//! plus the per-destination header rewrite used by the packet relay.

pub mod packet;

pub use packet::RtpPacket;
