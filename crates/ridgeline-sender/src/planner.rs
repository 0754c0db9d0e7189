//! Redundancy planning — how many redundancy slices a coding partition
//! gets.
//!
//! Two policies exist. `Flat` is the production default: a quarter of
//! the partition's original count, ignoring observed loss. `Tiered`
//! scales protection with the connection's loss estimate, giving small
//! partitions proportionally more cover. Both are pure functions of
//! (original count, loss rate); the choice is configuration.

use ridgeline_core::config::RedundancyPolicy;

/// Loss below this is treated as a clean link.
const NEGLIGIBLE_LOSS: f64 = 0.001;

/// Redundancy slice count for a partition of `original_count`
/// fragments on a connection with the given loss estimate.
pub fn plan(policy: RedundancyPolicy, original_count: usize, loss_rate: f64) -> usize {
    match policy {
        RedundancyPolicy::Flat => original_count / 4,
        RedundancyPolicy::Tiered => plan_tiered(original_count, loss_rate),
    }
}

fn plan_tiered(original_count: usize, loss_rate: f64) -> usize {
    if loss_rate < NEGLIGIBLE_LOSS {
        return if original_count < 10 { 0 } else { 1 };
    }

    let k = original_count as f64;
    let raw = if original_count < 10 {
        (k * loss_rate * 5.0) as usize + 1
    } else if original_count < 20 {
        (k * loss_rate * 4.0) as usize
    } else if original_count < 30 {
        (k * loss_rate * 3.0) as usize
    } else {
        (k * loss_rate * 2.5) as usize
    };

    raw.clamp(1, original_count.max(1))
}
