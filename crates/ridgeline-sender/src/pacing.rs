//! Pacing — spreads a big message's packets over a fixed-rate cadence.
//!
//! A message is big or small once, at build start, from its total byte
//! length. Small messages go straight to the immediate queue. Big
//! messages get a per-build millisecond cursor: each packet takes the
//! cursor's current time, and after `packets_per_ms` packets the cursor
//! advances one millisecond. The cursor is local to one build call;
//! concurrent builds pace independently.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::queue::Dispatch;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-build send-time cursor.
#[derive(Debug)]
pub struct Pacer {
    big: bool,
    packets_per_ms: u32,
    send_time_ms: u64,
    sent_this_ms: u32,
}

impl Pacer {
    /// `big` is decided once from the message's total length. The first
    /// paced packet goes out one millisecond from `now_ms`.
    pub fn new(big: bool, packets_per_ms: u32, now_ms: u64) -> Self {
        Self {
            big,
            packets_per_ms: packets_per_ms.max(1),
            send_time_ms: now_ms + 1,
            sent_this_ms: 0,
        }
    }

    /// Pull the cursor forward if wall time has passed it, opening a
    /// fresh millisecond bucket. Never moves the cursor backward, and
    /// never resets the count within the current bucket — so a bucket
    /// can't exceed `packets_per_ms` across emission phases.
    pub fn catch_up(&mut self, now_ms: u64) {
        if self.send_time_ms < now_ms {
            self.send_time_ms = now_ms;
            self.sent_this_ms = 0;
        }
    }

    /// Route the next packet.
    pub fn next(&mut self) -> Dispatch {
        if !self.big {
            return Dispatch::Immediate;
        }
        let at = self.send_time_ms;
        self.sent_this_ms += 1;
        if self.sent_this_ms >= self.packets_per_ms {
            self.sent_this_ms = 0;
            self.send_time_ms += 1;
        }
        Dispatch::Paced(at)
    }
}
