//! Packet building — one queued message in, framed wire packets out.
//!
//! `PacketBuilder::build` is the single entry point: it resolves the
//! message's connection and stream, then walks the FEC or ACK assembly
//! path. The call is synchronous and owns all of its transient state
//! (coding group, pacing cursor), so any number of builds may run
//! concurrently against the same shared store and queues.
//!
//! A malformed or stale message is logged and dropped; nothing here
//! retries, and no error reaches the calling loop.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use zerocopy::byteorder::{U16, U32, U64};

use ridgeline_core::codec::{CodecError, SliceCodec};
use ridgeline_core::config::SenderConfig;
use ridgeline_core::fec::{FecError, RedundancyCoder};
use ridgeline_core::wire::{
    AckSliceHeader, FecSliceHeader, StreamKind, FLAG_SEALED, FRAGMENT_LEN_PREFIX,
    MAX_FRAGMENT_PAYLOAD, MAX_PARTITION_ORIGINALS, WIRE_VERSION,
};

use crate::framer::fragment_count;
use crate::group::{CodingGroup, GroupError, GroupMeta};
use crate::pacing::{now_ms, Pacer};
use crate::planner::plan;
use crate::queue::{Dispatch, SendQueues};
use crate::resend::{AckContext, ResendRecord, ResendTracker};
use crate::state::{ConnectionInfo, SharedState, StreamMeta};

/// A message dequeued for transmission. Immutable once queued.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub conn_id: u64,
    pub stream_id: u16,
    pub group_id: u32,
    pub payload: Bytes,

    /// Opaque completion token, surfaced again through the group's ack
    /// context once the message is fully acknowledged.
    pub ctx: u64,
}

/// Why a message was dropped. Logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("empty message payload")]
    EmptyMessage,

    #[error("connection {0} unknown")]
    UnknownConnection(u64),

    #[error("stream {1} on connection {0} unknown")]
    UnknownStream(u64, u16),

    #[error("unsupported stream kind 0x{0:02x}")]
    UnsupportedStream(u8),

    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error(transparent)]
    Redundancy(#[from] FecError),

    #[error(transparent)]
    Group(#[from] GroupError),
}

/// Builds wire packets for dequeued messages.
pub struct PacketBuilder {
    state: Arc<SharedState>,
    queues: SendQueues,
    tracker: Arc<ResendTracker>,
    codec: Arc<dyn SliceCodec>,
    coder: Arc<dyn RedundancyCoder>,
    config: SenderConfig,
}

impl PacketBuilder {
    pub fn new(
        state: Arc<SharedState>,
        queues: SendQueues,
        tracker: Arc<ResendTracker>,
        codec: Arc<dyn SliceCodec>,
        coder: Arc<dyn RedundancyCoder>,
        config: SenderConfig,
    ) -> Self {
        Self {
            state,
            queues,
            tracker,
            codec,
            coder,
            config,
        }
    }

    /// Build and queue all packets for one message.
    ///
    /// Failures are logged and the message is dropped; packets already
    /// queued before a mid-message failure stay queued.
    pub fn build(&self, msg: &OutboundMessage) {
        if let Err(error) = self.try_build(msg) {
            tracing::warn!(
                conn = msg.conn_id,
                stream = msg.stream_id,
                group = msg.group_id,
                %error,
                "message dropped"
            );
        }
    }

    fn try_build(&self, msg: &OutboundMessage) -> Result<(), BuildError> {
        if msg.payload.is_empty() {
            return Err(BuildError::EmptyMessage);
        }
        let conn = self
            .state
            .connection(msg.conn_id)
            .ok_or(BuildError::UnknownConnection(msg.conn_id))?;
        let stream = self
            .state
            .stream(msg.conn_id, msg.stream_id)
            .ok_or(BuildError::UnknownStream(msg.conn_id, msg.stream_id))?;

        match StreamKind::try_from(stream.kind) {
            Ok(StreamKind::Fec) => self.build_fec_stream(msg, &conn, &stream),
            Ok(StreamKind::Ack) => self.build_ack_stream(msg, &conn, &stream),
            Err(_) => Err(BuildError::UnsupportedStream(stream.kind)),
        }
    }

    // ── FEC path ─────────────────────────────────────────────────────────────

    fn build_fec_stream(
        &self,
        msg: &OutboundMessage,
        conn: &ConnectionInfo,
        stream: &StreamMeta,
    ) -> Result<(), BuildError> {
        let total = fragment_count(msg.payload.len());
        let mut group = CodingGroup::new(
            GroupMeta {
                conn_id: msg.conn_id,
                stream_id: msg.stream_id,
                group_id: msg.group_id,
                timeout_secs: stream.timeout_secs,
                encrypt: conn.encrypt,
                session_key: conn.session_key,
                dest: conn.peer_addr,
            },
            total,
        );
        let partition_total = group.partition_count();
        let loss = self.state.net_status(msg.conn_id).packet_loss_rate;
        let crypto = conn.encrypt.then_some(&conn.session_key);
        let mut pacer = self.pacer_for(msg.payload.len());

        tracing::debug!(
            len = msg.payload.len(),
            fragments = total,
            partitions = partition_total,
            conn = msg.conn_id,
            stream = msg.stream_id,
            group = msg.group_id,
            "building fec stream packets"
        );

        for (index, fragment) in msg.payload.chunks(MAX_FRAGMENT_PAYLOAD).enumerate() {
            let partition_index = index / MAX_PARTITION_ORIGINALS;
            let slot = index % MAX_PARTITION_ORIGINALS;

            let partition = &mut group.partitions[partition_index];
            if slot == 0 {
                let redundancy =
                    plan(self.config.redundancy, partition.original_count() as usize, loss);
                partition.set_redundancy(redundancy as u16);
            }
            let opn = partition.original_count();
            let pn = partition.redundancy_count();

            let packet_id = self.state.next_packet_id(msg.conn_id);
            let framed = partition.write_fragment(slot, fragment)?;
            let header = fec_header(
                &group.meta,
                partition_total,
                partition_index as u16,
                slot as u16,
                packet_id,
                opn,
                pn,
                (fragment.len() + FRAGMENT_LEN_PREFIX) as u16,
            );
            let bytes = self.codec.encode_fec_slice(&header, framed, crypto)?;
            self.dispatch(&mut pacer, group.meta.dest, bytes);
        }

        self.emit_redundancy(&group, &mut pacer)
    }

    /// Generate and queue each partition's redundancy slices, ids
    /// continuing upward from the partition's original count.
    fn emit_redundancy(&self, group: &CodingGroup, pacer: &mut Pacer) -> Result<(), BuildError> {
        let crypto = group.meta.encrypt.then_some(&group.meta.session_key);
        pacer.catch_up(now_ms());
        let partition_total = group.partition_count();

        for (partition_index, partition) in group.partitions.iter().enumerate() {
            let redundancy = partition.redundancy_count();
            if redundancy == 0 {
                continue;
            }
            pacer.catch_up(now_ms());

            let slices = self.coder.generate(partition.slots(), redundancy as usize)?;
            let mut slice_id = partition.original_count();
            for slice in &slices {
                let packet_id = self.state.next_packet_id(group.meta.conn_id);
                let header = fec_header(
                    &group.meta,
                    partition_total,
                    partition_index as u16,
                    slice_id,
                    packet_id,
                    partition.original_count(),
                    redundancy,
                    slice.len() as u16,
                );
                let bytes = self.codec.encode_fec_slice(&header, slice, crypto)?;
                self.dispatch(pacer, group.meta.dest, bytes);
                slice_id += 1;
            }
        }
        Ok(())
    }

    // ── ACK path ─────────────────────────────────────────────────────────────

    fn build_ack_stream(
        &self,
        msg: &OutboundMessage,
        conn: &ConnectionInfo,
        stream: &StreamMeta,
    ) -> Result<(), BuildError> {
        let group_size = fragment_count(msg.payload.len()) as u16;
        let crypto = conn.encrypt.then_some(&conn.session_key);
        let mut pacer = self.pacer_for(msg.payload.len());

        tracing::debug!(
            len = msg.payload.len(),
            group_size,
            conn = msg.conn_id,
            stream = msg.stream_id,
            group = msg.group_id,
            "building ack stream packets"
        );

        for (index, fragment) in msg.payload.chunks(MAX_FRAGMENT_PAYLOAD).enumerate() {
            let slice_id = index as u16;
            let packet_id = self.state.next_packet_id(msg.conn_id);
            let header = AckSliceHeader {
                version: WIRE_VERSION,
                kind: StreamKind::Ack.into(),
                flags: seal_flag(conn.encrypt),
                conn_id: U64::new(msg.conn_id),
                stream_id: U16::new(msg.stream_id),
                group_id: U32::new(msg.group_id),
                packet_id: U32::new(packet_id),
                group_size: U16::new(group_size),
                slice_id: U16::new(slice_id),
                timeout_secs: U16::new(stream.timeout_secs),
                payload_len: U16::new(fragment.len() as u16),
            };

            // A failed encode abandons the rest of the message: the
            // fragments never transmitted must leave no resend state.
            let bytes = self.codec.encode_ack_slice(&header, fragment, crypto)?;
            let sent_at = self.dispatch(&mut pacer, conn.peer_addr, bytes.clone());

            let key = (msg.conn_id, packet_id);
            self.tracker.install_record(ResendRecord {
                bytes,
                conn_id: msg.conn_id,
                packet_id,
                dest: conn.peer_addr,
                last_send_ms: sent_at,
                next_resend_ms: sent_at + self.config.resend_interval_ms,
                attempts: 1,
            });
            self.tracker.set_ack_pending(key);
            self.tracker
                .register_group_expected((msg.conn_id, msg.stream_id, msg.group_id), group_size);
            self.tracker.store_context(
                key,
                AckContext {
                    conn_id: msg.conn_id,
                    stream_id: msg.stream_id,
                    group_id: msg.group_id,
                    packet_id,
                    slice_id,
                    ctx: msg.ctx,
                },
            );
        }
        Ok(())
    }

    // ── Shared ───────────────────────────────────────────────────────────────

    fn pacer_for(&self, len: usize) -> Pacer {
        Pacer::new(
            len > self.config.big_message_threshold,
            self.config.pace_packets_per_ms,
            now_ms(),
        )
    }

    /// Route one packet through the pacer into the matching queue.
    /// Returns the send time recorded for the packet.
    fn dispatch(&self, pacer: &mut Pacer, dest: SocketAddr, bytes: Bytes) -> u64 {
        match pacer.next() {
            Dispatch::Immediate => {
                let now = now_ms();
                self.queues.push_immediate(dest, bytes, now);
                now
            }
            Dispatch::Paced(at) => {
                self.queues.push_paced(dest, bytes, at);
                at
            }
        }
    }
}

fn seal_flag(encrypt: bool) -> u8 {
    if encrypt {
        FLAG_SEALED
    } else {
        0
    }
}

#[allow(clippy::too_many_arguments)]
fn fec_header(
    meta: &GroupMeta,
    partition_total: u16,
    partition_index: u16,
    slice_id: u16,
    packet_id: u32,
    opn: u16,
    pn: u16,
    payload_len: u16,
) -> FecSliceHeader {
    FecSliceHeader {
        version: WIRE_VERSION,
        kind: StreamKind::Fec.into(),
        flags: seal_flag(meta.encrypt),
        conn_id: U64::new(meta.conn_id),
        stream_id: U16::new(meta.stream_id),
        group_id: U32::new(meta.group_id),
        packet_id: U32::new(packet_id),
        partition_count: U16::new(partition_total),
        partition_index: U16::new(partition_index),
        slice_id: U16::new(slice_id),
        fec_opn: U16::new(opn),
        fec_pn: U16::new(pn),
        timeout_secs: U16::new(meta.timeout_secs),
        payload_len: U16::new(payload_len),
    }
}
