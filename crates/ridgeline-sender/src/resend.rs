//! Retransmission and acknowledgment bookkeeping for ACK streams.
//!
//! The packetization engine installs one record set per transmitted
//! fragment; the external resend loop retransmits, counts attempts,
//! and retires entries as acks arrive. The engine's responsibility ends
//! at the initial insert — it never updates or removes what it
//! installed.

use std::net::SocketAddr;

use bytes::Bytes;
use dashmap::DashMap;

/// (connection id, packet id) — identifies one transmitted slice.
pub type PacketKey = (u64, u32);

/// (connection id, stream id, group id) — identifies one reliable
/// message.
pub type GroupKey = (u64, u16, u32);

/// Everything the resend loop needs to retransmit one slice.
#[derive(Debug, Clone)]
pub struct ResendRecord {
    /// The encoded packet, byte-identical to the first transmission.
    pub bytes: Bytes,
    pub conn_id: u64,
    pub packet_id: u32,
    pub dest: SocketAddr,

    /// When the slice last went out, milliseconds since the epoch.
    pub last_send_ms: u64,

    /// When the resend loop should retransmit if still unacknowledged.
    pub next_resend_ms: u64,

    /// Transmissions so far. 1 after the initial send.
    pub attempts: u32,
}

/// Application-facing context for one slice, returned through the
/// completion callback once the whole group is acknowledged.
#[derive(Debug, Clone)]
pub struct AckContext {
    pub conn_id: u64,
    pub stream_id: u16,
    pub group_id: u32,
    pub packet_id: u32,
    pub slice_id: u16,

    /// Opaque token the application attached to the message.
    pub ctx: u64,
}

/// Shared bookkeeping tables, multiple-producer safe.
///
/// Per-key operations are atomic (dashmap shard locking); the engine
/// installs entries in transmission order per message, so the group's
/// expected count is present before any ack for the group can arrive.
#[derive(Default)]
pub struct ResendTracker {
    records: DashMap<PacketKey, ResendRecord>,
    pending: DashMap<PacketKey, bool>,
    group_expected: DashMap<GroupKey, u16>,
    contexts: DashMap<PacketKey, AckContext>,
}

impl ResendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the initial resend record for a just-transmitted slice.
    pub fn install_record(&self, record: ResendRecord) {
        self.records
            .insert((record.conn_id, record.packet_id), record);
    }

    /// Mark a slice as awaiting acknowledgment.
    pub fn set_ack_pending(&self, key: PacketKey) {
        self.pending.insert(key, false);
    }

    /// Record how many slices the group contains. Idempotent — every
    /// fragment of a message upserts the same count.
    pub fn register_group_expected(&self, key: GroupKey, count: u16) {
        self.group_expected.insert(key, count);
    }

    /// Attach the application context for a slice.
    pub fn store_context(&self, key: PacketKey, context: AckContext) {
        self.contexts.insert(key, context);
    }

    // ── Consumed by the external resend/ack loop ─────────────────────────────

    /// Mark a slice acknowledged. Returns false if the slice is
    /// unknown (already retired, or never tracked).
    pub fn mark_acked(&self, key: PacketKey) -> bool {
        match self.pending.get_mut(&key) {
            Some(mut acked) => {
                *acked = true;
                true
            }
            None => false,
        }
    }

    /// Drop all bookkeeping for a slice once it is fully settled.
    pub fn retire(&self, key: PacketKey) -> Option<AckContext> {
        self.records.remove(&key);
        self.pending.remove(&key);
        self.contexts.remove(&key).map(|(_, ctx)| ctx)
    }

    /// Forget a completed group.
    pub fn retire_group(&self, key: GroupKey) {
        self.group_expected.remove(&key);
    }

    pub fn record(&self, key: PacketKey) -> Option<ResendRecord> {
        self.records.get(&key).map(|r| r.value().clone())
    }

    /// None if untracked, otherwise whether the slice has been acked.
    pub fn is_acked(&self, key: PacketKey) -> Option<bool> {
        self.pending.get(&key).map(|a| *a)
    }

    pub fn group_expected(&self, key: GroupKey) -> Option<u16> {
        self.group_expected.get(&key).map(|c| *c)
    }

    pub fn context(&self, key: PacketKey) -> Option<AckContext> {
        self.contexts.get(&key).map(|c| c.value().clone())
    }

    /// Number of live resend records, across all connections.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}
