// Shared test helpers

#![allow(dead_code)]

use chrono::NaiveDate;
use speedmonitor::models::{DailyUsage, Rate};
use speedmonitor::sampler::{CounterError, CounterSource, Tick, TickKind};
use speedmonitor::usage_repo::UsageRepo;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn usage(day: NaiveDate, bytes_sent: u64, bytes_recv: u64) -> DailyUsage {
    DailyUsage {
        day,
        bytes_sent,
        bytes_recv,
        max_up_speed: 0,
        max_down_speed: 0,
        active_seconds: 0,
    }
}

/// One-second tick with rate equal to the deltas.
pub fn tick(sent: u64, recv: u64) -> Tick {
    Tick {
        rate: Rate {
            sent_per_sec: sent,
            recv_per_sec: recv,
        },
        sent_delta: sent,
        recv_delta: recv,
        elapsed: Duration::from_secs(1),
        kind: TickKind::Normal,
    }
}

pub fn reset_tick() -> Tick {
    Tick {
        rate: Rate::ZERO,
        sent_delta: 0,
        recv_delta: 0,
        elapsed: Duration::from_secs(1),
        kind: TickKind::Reset,
    }
}

pub async fn temp_repo() -> (TempDir, UsageRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("usage.db");
    let repo = UsageRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

/// Counters that grow by a fixed step on every read. The handle exposes the read count.
pub struct SteppingCounters {
    pub step_sent: u64,
    pub step_recv: u64,
    pub reads: Arc<Mutex<u64>>,
}

impl SteppingCounters {
    pub fn new(step_sent: u64, step_recv: u64) -> Self {
        Self {
            step_sent,
            step_recv,
            reads: Arc::new(Mutex::new(0)),
        }
    }
}

impl CounterSource for SteppingCounters {
    fn read_totals(&mut self) -> Result<(u64, u64), CounterError> {
        let mut reads = self.reads.lock().unwrap();
        *reads += 1;
        Ok((self.step_sent * *reads, self.step_recv * *reads))
    }
}

/// Counter source that always fails.
pub struct BrokenCounters;

impl CounterSource for BrokenCounters {
    fn read_totals(&mut self) -> Result<(u64, u64), CounterError> {
        Err(CounterError::NoInterfaces)
    }
}
