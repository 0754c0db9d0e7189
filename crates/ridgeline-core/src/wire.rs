//! Ridgeline wire format — on-wire slice headers for both stream kinds.
//!
//! These types ARE the protocol. Every field, every size is part of the
//! wire format and must match the receiver bit-for-bit. Integer fields
//! use network byte order so a header serializes identically on every
//! platform.
//!
//! All types are #[repr(C, packed)] for deterministic layout and use
//! zerocopy derives for safe, allocation-free serialization. There is no
//! unsafe code in this module.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{NetworkEndian, U16, U32, U64};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Framing constants ────────────────────────────────────────────────────────

/// Maximum fragment payload bytes carried by one wire packet.
pub const MAX_FRAGMENT_PAYLOAD: usize = 1400;

/// Length prefix preceding a fragment's payload inside a coding slot,
/// big-endian u16.
pub const FRAGMENT_LEN_PREFIX: usize = 2;

/// Fixed size of one coding slot: length prefix plus a full fragment.
/// Every slot in a partition is this size; short fragments are
/// zero-padded so redundancy slices line up.
pub const CODING_SLOT_SIZE: usize = MAX_FRAGMENT_PAYLOAD + FRAGMENT_LEN_PREFIX;

/// Maximum original fragments grouped into one coding partition.
pub const MAX_PARTITION_ORIGINALS: usize = 8;

/// Current wire format version.
pub const WIRE_VERSION: u8 = 0x01;

/// Header flag bit: the payload is sealed under the connection's
/// session key.
pub const FLAG_SEALED: u8 = 0x01;

// ── Stream kind ──────────────────────────────────────────────────────────────

/// Delivery discipline of a stream, as negotiated on the wire.
///
/// Fec streams trade redundancy for latency: lost slices are recovered
/// from erasure-coded siblings, nothing is retransmitted. Ack streams
/// retransmit every unacknowledged slice until the peer confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamKind {
    Fec = 0x01,
    Ack = 0x02,
}

impl TryFrom<u8> for StreamKind {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(StreamKind::Fec),
            0x02 => Ok(StreamKind::Ack),
            other => Err(WireError::UnknownStreamKind(other)),
        }
    }
}

impl From<StreamKind> for u8 {
    fn from(k: StreamKind) -> u8 {
        k as u8
    }
}

// ── Slice headers ────────────────────────────────────────────────────────────

/// Header of one erasure-coded stream slice.
///
/// Carries everything the receiver needs to place the slice into its
/// coding group: which partition of how many, which slot within the
/// partition, and the partition's (original, redundancy) shape. Slice
/// ids `0..fec_opn` are original fragments; `fec_opn..fec_opn+fec_pn`
/// are redundancy slices.
///
/// Wire size: 35 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FecSliceHeader {
    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// StreamKind::Fec as u8.
    pub kind: u8,

    /// Bit flags. Bit 0: payload sealed under the session key.
    pub flags: u8,

    /// Connection this slice belongs to.
    pub conn_id: U64<NetworkEndian>,

    /// Stream within the connection.
    pub stream_id: U16<NetworkEndian>,

    /// Coding group (one application message) within the stream.
    pub group_id: U32<NetworkEndian>,

    /// Per-connection monotonic packet id.
    pub packet_id: U32<NetworkEndian>,

    /// Total partitions in the group.
    pub partition_count: U16<NetworkEndian>,

    /// Zero-indexed partition this slice belongs to.
    pub partition_index: U16<NetworkEndian>,

    /// Slot index within the partition.
    pub slice_id: U16<NetworkEndian>,

    /// Original fragment count of this partition.
    pub fec_opn: U16<NetworkEndian>,

    /// Redundancy slice count of this partition.
    pub fec_pn: U16<NetworkEndian>,

    /// Advisory receive timeout, seconds. Consumed by the receiver,
    /// not enforced by the sender.
    pub timeout_secs: U16<NetworkEndian>,

    /// Payload bytes following this header (before sealing overhead).
    pub payload_len: U16<NetworkEndian>,
}

assert_eq_size!(FecSliceHeader, [u8; 35]);

/// Header of one acknowledged stream slice.
///
/// Ack slices carry the fragment payload directly (no coding slot
/// padding). `group_size` tells the receiver how many slices make up
/// the message so it can detect completion.
///
/// Wire size: 29 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct AckSliceHeader {
    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// StreamKind::Ack as u8.
    pub kind: u8,

    /// Bit flags. Bit 0: payload sealed under the session key.
    pub flags: u8,

    /// Connection this slice belongs to.
    pub conn_id: U64<NetworkEndian>,

    /// Stream within the connection.
    pub stream_id: U16<NetworkEndian>,

    /// Group (one application message) within the stream.
    pub group_id: U32<NetworkEndian>,

    /// Per-connection monotonic packet id.
    pub packet_id: U32<NetworkEndian>,

    /// Total fragments in the group.
    pub group_size: U16<NetworkEndian>,

    /// Zero-indexed fragment position within the group.
    pub slice_id: U16<NetworkEndian>,

    /// Advisory receive timeout, seconds.
    pub timeout_secs: U16<NetworkEndian>,

    /// Payload bytes following this header (before sealing overhead).
    pub payload_len: U16<NetworkEndian>,
}

assert_eq_size!(AckSliceHeader, [u8; 29]);

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unknown stream kind byte: 0x{0:02x}")]
    UnknownStreamKind(u8),

    #[error("unknown wire version: 0x{0:02x}")]
    UnknownVersion(u8),
}

// ── Tests ────────────────────────────────────────────────────────────────────
