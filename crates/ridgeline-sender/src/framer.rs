//! Fragmentation arithmetic — deterministic message-to-fragment
//! boundaries shared by both stream paths.
//!
//! Fragment `i` of a message covers payload bytes
//! `[i * MAX_FRAGMENT_PAYLOAD, min((i + 1) * MAX_FRAGMENT_PAYLOAD, len))`,
//! which is exactly what `payload.chunks(MAX_FRAGMENT_PAYLOAD)` yields.
//! The receiver computes the same boundaries, so these functions must
//! never change shape.

use ridgeline_core::wire::{MAX_FRAGMENT_PAYLOAD, MAX_PARTITION_ORIGINALS};

/// Number of fragments a message of `len` bytes splits into.
pub fn fragment_count(len: usize) -> usize {
    len.div_ceil(MAX_FRAGMENT_PAYLOAD)
}

/// Number of coding partitions needed for `fragments` fragments.
pub fn partition_count(fragments: usize) -> usize {
    fragments.div_ceil(MAX_PARTITION_ORIGINALS)
}

/// Original-fragment count of partition `index`, given the group's
/// total fragment count. Every partition is full except possibly the
/// last.
pub fn partition_originals(total_fragments: usize, index: usize) -> usize {
    let consumed = index * MAX_PARTITION_ORIGINALS;
    (total_fragments - consumed).min(MAX_PARTITION_ORIGINALS)
}
