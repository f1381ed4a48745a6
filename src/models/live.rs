// Counter samples, rates, and the live status handed to presentation.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::DailyUsage;

/// Raw cumulative counter reading across the monitored interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub at: Instant,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Bytes per second in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub sent_per_sec: u64,
    pub recv_per_sec: u64,
}

impl Rate {
    pub const ZERO: Rate = Rate {
        sent_per_sec: 0,
        recv_per_sec: 0,
    };
}

/// Latest tick as seen by readers: rate plus the in-memory state of today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    /// Wall-clock time of the tick, unix millis. 0 before the first tick.
    pub timestamp: i64,
    pub rate: Rate,
    pub today: DailyUsage,
}

impl LiveStatus {
    pub fn idle(today: DailyUsage) -> Self {
        Self {
            timestamp: 0,
            rate: Rate::ZERO,
            today,
        }
    }
}
