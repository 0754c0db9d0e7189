//! Shared connection/stream state — the store the packetization engine
//! reads per message.
//!
//! One `SharedState` is shared between the session layer (which
//! registers connections and streams and feeds loss estimates) and any
//! number of concurrent builders. Builders only read snapshots and
//! allocate packet ids; they never hold references into the store.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;

use ridgeline_core::codec::SessionKey;

/// Snapshot of one connection, copied out of the store per message.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Where this connection's packets are sent.
    pub peer_addr: SocketAddr,

    /// Whether slice payloads are sealed under `session_key`.
    pub encrypt: bool,

    /// Symmetric key established by the session layer.
    pub session_key: SessionKey,
}

/// Per-stream delivery metadata.
#[derive(Debug, Clone, Copy)]
pub struct StreamMeta {
    /// Delivery discipline byte as negotiated on the wire. Validated
    /// against `StreamKind` per build, so an unknown discipline drops
    /// the message instead of poisoning the table.
    pub kind: u8,

    /// Advisory receive timeout carried in every slice header, seconds.
    pub timeout_secs: u16,
}

/// Observed network condition of one connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetStatus {
    /// Estimated packet loss, 0.0 ..= 1.0.
    pub packet_loss_rate: f64,
}

/// The shared store. Cheap to clone via `Arc`.
///
/// Contracts relied on by concurrent builders:
/// - lookups return owned snapshots, never references into the maps;
/// - `next_packet_id` is an atomic read-modify-write serialized per
///   connection, so ids are unique and monotonically increasing even
///   under concurrent builds for the same connection.
#[derive(Default)]
pub struct SharedState {
    connections: DashMap<u64, ConnectionInfo>,
    streams: DashMap<(u64, u16), StreamMeta>,
    packet_ids: DashMap<u64, u32>,
    net_status: DashMap<u64, NetStatus>,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_connection(&self, conn_id: u64, info: ConnectionInfo) {
        self.connections.insert(conn_id, info);
    }

    pub fn remove_connection(&self, conn_id: u64) {
        self.connections.remove(&conn_id);
        self.streams.retain(|(c, _), _| *c != conn_id);
        self.packet_ids.remove(&conn_id);
        self.net_status.remove(&conn_id);
    }

    pub fn insert_stream(&self, conn_id: u64, stream_id: u16, meta: StreamMeta) {
        self.streams.insert((conn_id, stream_id), meta);
    }

    pub fn set_net_status(&self, conn_id: u64, status: NetStatus) {
        self.net_status.insert(conn_id, status);
    }

    /// Snapshot of a connection, or None if it is unknown.
    pub fn connection(&self, conn_id: u64) -> Option<ConnectionInfo> {
        self.connections.get(&conn_id).map(|c| c.value().clone())
    }

    /// Snapshot of a stream's metadata, or None if it is unknown.
    pub fn stream(&self, conn_id: u64, stream_id: u16) -> Option<StreamMeta> {
        self.streams.get(&(conn_id, stream_id)).map(|s| *s)
    }

    /// Allocate the next packet id for a connection. Ids start at 1.
    pub fn next_packet_id(&self, conn_id: u64) -> u32 {
        let mut entry = self.packet_ids.entry(conn_id).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Current loss estimate for a connection. Unknown connections
    /// report zero loss.
    pub fn net_status(&self, conn_id: u64) -> NetStatus {
        self.net_status
            .get(&conn_id)
            .map(|s| *s)
            .unwrap_or_default()
    }
}
