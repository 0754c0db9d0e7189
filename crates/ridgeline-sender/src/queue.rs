//! Output queues — the boundary between packet building and socket
//! dispatch.
//!
//! Two queues leave this component: the immediate queue is drained as
//! fast as the socket allows; the paced queue is drained by a timer
//! loop that respects each item's send time. Builders push, the
//! external dispatch loops receive. Pushes are atomic per item and
//! preserve per-producer order; ordering across producers is carried by
//! the slice ids inside the packets, not by the queues.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

/// One packet ready for the wire.
#[derive(Debug, Clone)]
pub struct SendQueueItem {
    pub dest: SocketAddr,
    pub bytes: Bytes,

    /// Absolute send time, milliseconds since the Unix epoch. Items on
    /// the immediate queue carry their enqueue time.
    pub send_time_ms: u64,
}

/// Where the pacer routed a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Send as soon as the socket loop gets to it.
    Immediate,

    /// Hold until the given absolute millisecond.
    Paced(u64),
}

/// Producer half of the two output queues.
#[derive(Clone)]
pub struct SendQueues {
    immediate: mpsc::UnboundedSender<SendQueueItem>,
    paced: mpsc::UnboundedSender<SendQueueItem>,
}

/// Consumer half, owned by the dispatch loops.
pub struct SendQueueReceivers {
    pub immediate: mpsc::UnboundedReceiver<SendQueueItem>,
    pub paced: mpsc::UnboundedReceiver<SendQueueItem>,
}

impl SendQueues {
    pub fn new() -> (Self, SendQueueReceivers) {
        let (immediate_tx, immediate_rx) = mpsc::unbounded_channel();
        let (paced_tx, paced_rx) = mpsc::unbounded_channel();
        (
            Self {
                immediate: immediate_tx,
                paced: paced_tx,
            },
            SendQueueReceivers {
                immediate: immediate_rx,
                paced: paced_rx,
            },
        )
    }

    /// Queue a packet for immediate dispatch. `now_ms` is recorded as
    /// the item's send time.
    pub fn push_immediate(&self, dest: SocketAddr, bytes: Bytes, now_ms: u64) {
        if self
            .immediate
            .send(SendQueueItem {
                dest,
                bytes,
                send_time_ms: now_ms,
            })
            .is_err()
        {
            tracing::warn!(%dest, "immediate queue receiver gone, packet dropped");
        }
    }

    /// Queue a packet for paced dispatch at `send_time_ms`.
    pub fn push_paced(&self, dest: SocketAddr, bytes: Bytes, send_time_ms: u64) {
        if self
            .paced
            .send(SendQueueItem {
                dest,
                bytes,
                send_time_ms,
            })
            .is_err()
        {
            tracing::warn!(%dest, "paced queue receiver gone, packet dropped");
        }
    }
}
