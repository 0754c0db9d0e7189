//! Erasure coding seam — produces redundancy slices for a coding
//! partition.
//!
//! The engine fills a partition's slots and asks a `RedundancyCoder`
//! for `m` redundancy slices over the `k` originals. Any coder whose
//! output lets a receiver rebuild the originals from any `k` of the
//! `k + m` slices fits; the default is Reed-Solomon over GF(2^8).

use reed_solomon_erasure::galois_8::ReedSolomon;

/// Errors produced while generating redundancy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FecError {
    #[error("partition has no original slots")]
    NoOriginals,

    #[error("slot {index} is {len} bytes, expected {expected}")]
    UnevenSlots {
        index: usize,
        len: usize,
        expected: usize,
    },

    #[error("reed-solomon: {0}")]
    Codec(String),
}

/// Generates redundancy slices over a partition's original slots.
///
/// Slots must all be the same size; returned slices are that size too.
/// `redundancy == 0` is valid and returns no slices.
pub trait RedundancyCoder: Send + Sync {
    fn generate(&self, originals: &[Vec<u8>], redundancy: usize) -> Result<Vec<Vec<u8>>, FecError>;
}

/// Reed-Solomon redundancy over GF(2^8).
///
/// Any `k` of the `k + m` slices reconstruct the originals, so the
/// receiver survives the loss of up to `m` slices per partition.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReedSolomonCoder;

impl ReedSolomonCoder {
    pub fn new() -> Self {
        ReedSolomonCoder
    }
}

impl RedundancyCoder for ReedSolomonCoder {
    fn generate(&self, originals: &[Vec<u8>], redundancy: usize) -> Result<Vec<Vec<u8>>, FecError> {
        if redundancy == 0 {
            return Ok(Vec::new());
        }
        if originals.is_empty() {
            return Err(FecError::NoOriginals);
        }

        let slot_size = originals[0].len();
        for (index, slot) in originals.iter().enumerate() {
            if slot.len() != slot_size {
                return Err(FecError::UnevenSlots {
                    index,
                    len: slot.len(),
                    expected: slot_size,
                });
            }
        }

        let rs = ReedSolomon::new(originals.len(), redundancy)
            .map_err(|e| FecError::Codec(e.to_string()))?;

        let mut shards: Vec<Vec<u8>> = originals.to_vec();
        shards.resize(originals.len() + redundancy, vec![0u8; slot_size]);
        rs.encode(&mut shards)
            .map_err(|e| FecError::Codec(e.to_string()))?;

        Ok(shards.split_off(originals.len()))
    }
}
