//! Slice codec — turns a slice header plus payload into wire bytes.
//!
//! The packetization engine never touches sockets or cipher state
//! directly; it hands each slice to a `SliceCodec` and queues whatever
//! comes back. `SealingCodec` is the production codec: header bytes
//! followed by the payload, sealed with ChaCha20-Poly1305 under the
//! connection's session key when the connection is encrypted.

use bytes::Bytes;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305};
use zerocopy::AsBytes;

use crate::wire::{AckSliceHeader, FecSliceHeader, CODING_SLOT_SIZE, MAX_FRAGMENT_PAYLOAD};

/// Per-connection symmetric key, established by the session layer.
pub type SessionKey = [u8; 32];

/// Poly1305 tag appended to a sealed payload.
pub const SEAL_OVERHEAD: usize = 16;

/// Errors produced while encoding a slice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("fec payload length {0} exceeds slot size {}", CODING_SLOT_SIZE)]
    FecPayloadTooLarge(usize),

    #[error("ack payload length {0} exceeds fragment size {}", MAX_FRAGMENT_PAYLOAD)]
    AckPayloadTooLarge(usize),

    #[error("session key rejected by cipher")]
    Key,

    #[error("payload sealing failed")]
    Seal,
}

/// Encodes slice headers and payloads into transmittable packets.
///
/// `crypto` is the connection's session key when the connection is
/// encrypted, None for cleartext connections. Implementations must not
/// retry internally; a failed encode is reported once and the caller
/// decides what to abandon.
pub trait SliceCodec: Send + Sync {
    fn encode_fec_slice(
        &self,
        header: &FecSliceHeader,
        payload: &[u8],
        crypto: Option<&SessionKey>,
    ) -> Result<Bytes, CodecError>;

    fn encode_ack_slice(
        &self,
        header: &AckSliceHeader,
        payload: &[u8],
        crypto: Option<&SessionKey>,
    ) -> Result<Bytes, CodecError>;
}

/// The production codec.
///
/// Packet layout: header bytes, then the payload. With a session key the
/// payload is sealed in place and a 16-byte tag appended; the header
/// rides in the clear but is bound into the seal as associated data.
#[derive(Debug, Default, Clone, Copy)]
pub struct SealingCodec;

impl SealingCodec {
    pub fn new() -> Self {
        SealingCodec
    }

    fn encode(
        &self,
        header_bytes: &[u8],
        payload: &[u8],
        nonce: [u8; 12],
        crypto: Option<&SessionKey>,
    ) -> Result<Bytes, CodecError> {
        let mut out = Vec::with_capacity(header_bytes.len() + payload.len() + SEAL_OVERHEAD);
        out.extend_from_slice(header_bytes);

        match crypto {
            None => out.extend_from_slice(payload),
            Some(key) => {
                let unbound =
                    UnboundKey::new(&CHACHA20_POLY1305, key).map_err(|_| CodecError::Key)?;
                let sealing = LessSafeKey::new(unbound);

                let mut sealed = payload.to_vec();
                sealing
                    .seal_in_place_append_tag(
                        Nonce::assume_unique_for_key(nonce),
                        Aad::from(header_bytes),
                        &mut sealed,
                    )
                    .map_err(|_| CodecError::Seal)?;
                out.extend_from_slice(&sealed);
            }
        }

        Ok(Bytes::from(out))
    }
}

impl SliceCodec for SealingCodec {
    fn encode_fec_slice(
        &self,
        header: &FecSliceHeader,
        payload: &[u8],
        crypto: Option<&SessionKey>,
    ) -> Result<Bytes, CodecError> {
        if payload.len() > CODING_SLOT_SIZE {
            return Err(CodecError::FecPayloadTooLarge(payload.len()));
        }
        let conn_id = header.conn_id;
        let packet_id = header.packet_id;
        self.encode(
            header.as_bytes(),
            payload,
            slice_nonce(conn_id.get(), packet_id.get()),
            crypto,
        )
    }

    fn encode_ack_slice(
        &self,
        header: &AckSliceHeader,
        payload: &[u8],
        crypto: Option<&SessionKey>,
    ) -> Result<Bytes, CodecError> {
        if payload.len() > MAX_FRAGMENT_PAYLOAD {
            return Err(CodecError::AckPayloadTooLarge(payload.len()));
        }
        let conn_id = header.conn_id;
        let packet_id = header.packet_id;
        self.encode(
            header.as_bytes(),
            payload,
            slice_nonce(conn_id.get(), packet_id.get()),
            crypto,
        )
    }
}

/// Nonce for one slice: connection id followed by packet id.
///
/// Unique under a given session key because packet ids are allocated
/// monotonically per connection and the key never outlives the
/// connection.
fn slice_nonce(conn_id: u64, packet_id: u32) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..8].copy_from_slice(&conn_id.to_le_bytes());
    nonce[8..].copy_from_slice(&packet_id.to_le_bytes());
    nonce
}
