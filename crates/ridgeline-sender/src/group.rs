//! Coding groups — the transient slot buffers one FEC build writes
//! fragments into before redundancy is computed.
//!
//! A `CodingGroup` is constructed, filled, coded over, and dropped
//! inside a single `build` call. It is never shared across builds, so
//! concurrent builds cannot alias each other's buffers.

use std::net::SocketAddr;

use ridgeline_core::codec::SessionKey;
use ridgeline_core::wire::{CODING_SLOT_SIZE, FRAGMENT_LEN_PREFIX, MAX_FRAGMENT_PAYLOAD};

use crate::framer::{partition_count, partition_originals};

/// Errors from slot writes. These indicate a caller bug, not a network
/// condition; the builder maps them into its own error type and drops
/// the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("slot {slot} out of range for partition of {slots} slots")]
    SlotOutOfRange { slot: usize, slots: usize },

    #[error("fragment of {0} bytes exceeds {}", MAX_FRAGMENT_PAYLOAD)]
    FragmentTooLarge(usize),
}

/// Metadata shared by every slice of one group, copied once at build
/// start.
#[derive(Debug, Clone)]
pub struct GroupMeta {
    pub conn_id: u64,
    pub stream_id: u16,
    pub group_id: u32,
    pub timeout_secs: u16,
    pub encrypt: bool,
    pub session_key: SessionKey,
    pub dest: SocketAddr,
}

/// One coding partition: up to `MAX_PARTITION_ORIGINALS` fixed-size
/// slots plus the redundancy count chosen for it.
#[derive(Debug)]
pub struct Partition {
    slots: Vec<Vec<u8>>,
    redundancy: u16,
}

impl Partition {
    fn new(originals: usize) -> Self {
        Self {
            slots: vec![vec![0u8; CODING_SLOT_SIZE]; originals],
            redundancy: 0,
        }
    }

    /// Original fragment count of this partition, fixed at group
    /// construction.
    pub fn original_count(&self) -> u16 {
        self.slots.len() as u16
    }

    /// Redundancy slice count, fixed once by `set_redundancy`.
    pub fn redundancy_count(&self) -> u16 {
        self.redundancy
    }

    /// Record the planner's redundancy decision for this partition.
    pub fn set_redundancy(&mut self, redundancy: u16) {
        self.redundancy = redundancy;
    }

    /// Write a fragment into `slot`: 2-byte big-endian length prefix,
    /// then the payload, remainder left zeroed. Returns the framed
    /// prefix of the slot (prefix + payload) for transmission.
    pub fn write_fragment(&mut self, slot: usize, payload: &[u8]) -> Result<&[u8], GroupError> {
        if slot >= self.slots.len() {
            return Err(GroupError::SlotOutOfRange {
                slot,
                slots: self.slots.len(),
            });
        }
        if payload.len() > MAX_FRAGMENT_PAYLOAD {
            return Err(GroupError::FragmentTooLarge(payload.len()));
        }

        let buf = &mut self.slots[slot];
        buf[..FRAGMENT_LEN_PREFIX].copy_from_slice(&(payload.len() as u16).to_be_bytes());
        buf[FRAGMENT_LEN_PREFIX..FRAGMENT_LEN_PREFIX + payload.len()].copy_from_slice(payload);

        Ok(&buf[..FRAGMENT_LEN_PREFIX + payload.len()])
    }

    /// The full slot buffers, for the redundancy coder.
    pub fn slots(&self) -> &[Vec<u8>] {
        &self.slots
    }
}

/// All partitions of one message, owned by one build call.
#[derive(Debug)]
pub struct CodingGroup {
    pub meta: GroupMeta,
    pub partitions: Vec<Partition>,
}

impl CodingGroup {
    /// Lay out partitions for a message of `total_fragments` fragments:
    /// every partition full except possibly the last.
    pub fn new(meta: GroupMeta, total_fragments: usize) -> Self {
        let partitions = (0..partition_count(total_fragments))
            .map(|index| Partition::new(partition_originals(total_fragments, index)))
            .collect();
        Self { meta, partitions }
    }

    pub fn partition_count(&self) -> u16 {
        self.partitions.len() as u16
    }
}
