//! Ridgeline sender — the transmit-side packetization engine.
//!
//! One `PacketBuilder::build` call turns a queued message into framed
//! wire packets on either an erasure-coded or an acknowledged stream,
//! paces oversized messages onto the timed queue, and seeds the
//! retransmission bookkeeping the external resend loop consumes.

pub mod builder;
pub mod framer;
pub mod group;
pub mod pacing;
pub mod planner;
pub mod queue;
pub mod resend;
pub mod state;

pub use builder::{OutboundMessage, PacketBuilder};
pub use queue::{SendQueueItem, SendQueueReceivers, SendQueues};
pub use resend::{AckContext, ResendRecord, ResendTracker};
pub use state::{ConnectionInfo, NetStatus, SharedState, StreamMeta};
