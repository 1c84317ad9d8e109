//! Stream registry for pub/sub routing
//!
//! The registry holds named live streams and fans published byte chunks
//! out to subscriber queues. It has no protocol knowledge: the ingest
//! side publishes, the relay and any other observer subscribe.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<StreamRegistry>
//!                  ┌───────────────────────────┐
//!                  │ streams: HashMap<String,  │
//!                  │   StreamEntry {           │
//!                  │     subscribers: Vec<Tx>, │
//!                  │   }                       │
//!                  │ >                         │
//!                  └────────────┬──────────────┘
//!                               │
//!            ┌──────────────────┼──────────────────┐
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!       [Publisher]        [Subscriber]       [Subscriber]
//!       writer.write()     rx.recv()          rx.recv()
//! ```
//!
//! # Fan-out semantics
//!
//! Every subscriber owns a bounded `mpsc` queue. Broadcast is `try_send`
//! per queue: a full queue drops that subscriber's chunk and counts the
//! drop, so one slow consumer never blocks delivery to the rest. Within
//! one queue, delivery order matches publish order. `bytes::Bytes` makes
//! the per-subscriber clone a reference count bump, not a copy.

pub mod entry;
pub mod store;

pub use entry::{StreamEntry, SubscriberId};
pub use store::{StreamRegistry, StreamWriter};
