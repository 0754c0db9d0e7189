//! Ridgeline core — wire format, slice codec, erasure coding, and
//! configuration shared by the sender and its tools.

pub mod codec;
pub mod config;
pub mod fec;
pub mod wire;

pub use codec::{CodecError, SealingCodec, SessionKey, SliceCodec};
pub use config::{RedundancyPolicy, SenderConfig};
pub use fec::{FecError, RedundancyCoder, ReedSolomonCoder};
pub use wire::StreamKind;
