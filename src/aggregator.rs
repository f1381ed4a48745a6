// Accumulates ticks into the current day's usage. Pure: the worker persists what it returns.
//
// Rollover ordering: when a tick is dated after the current day, the current day is finalized
// first and the tick (reset-clamped deltas included) is applied to the fresh day.
// A tick dated before the current day (clock moved back) keeps accumulating into the current day.

use crate::models::{DailyUsage, LiveStatus, Rate};
use crate::sampler::Tick;
use chrono::NaiveDate;
use std::time::Duration;

/// What the caller must persist after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Completed previous day, exactly as it stood before the rollover.
    pub finalized: Option<DailyUsage>,
    /// The in-progress day should be upserted now.
    pub flush_due: bool,
}

pub struct Aggregator {
    current: DailyUsage,
    last_rate: Rate,
    active_carry: Duration,
    flush_rate: u64,
    ticks_since_flush: u64,
}

impl Aggregator {
    /// Starts from `stored` when it belongs to `today` (restart mid-day), otherwise from zero.
    pub fn resume(stored: Option<DailyUsage>, today: NaiveDate, flush_rate: u64) -> Self {
        let current = match stored {
            Some(d) if d.day == today => d,
            _ => DailyUsage::empty(today),
        };
        Self {
            current,
            last_rate: Rate::ZERO,
            active_carry: Duration::ZERO,
            flush_rate: flush_rate.max(1),
            ticks_since_flush: 0,
        }
    }

    pub fn new(today: NaiveDate, flush_rate: u64) -> Self {
        Self::resume(None, today, flush_rate)
    }

    pub fn on_tick(&mut self, day: NaiveDate, tick: &Tick) -> TickOutcome {
        let finalized = if day > self.current.day {
            Some(self.roll_over(day))
        } else {
            None
        };

        let d = &mut self.current;
        d.bytes_sent = d.bytes_sent.saturating_add(tick.sent_delta);
        d.bytes_recv = d.bytes_recv.saturating_add(tick.recv_delta);
        d.max_up_speed = d.max_up_speed.max(tick.rate.sent_per_sec);
        d.max_down_speed = d.max_down_speed.max(tick.rate.recv_per_sec);

        self.active_carry += tick.active_time();
        let whole = self.active_carry.as_secs();
        d.active_seconds = d.active_seconds.saturating_add(whole);
        self.active_carry -= Duration::from_secs(whole);

        self.last_rate = tick.rate;

        self.ticks_since_flush += 1;
        let flush_due = self.ticks_since_flush >= self.flush_rate;
        if flush_due {
            self.ticks_since_flush = 0;
        }

        TickOutcome {
            finalized,
            flush_due,
        }
    }

    fn roll_over(&mut self, day: NaiveDate) -> DailyUsage {
        self.active_carry = Duration::ZERO;
        std::mem::replace(&mut self.current, DailyUsage::empty(day))
    }

    pub fn current(&self) -> &DailyUsage {
        &self.current
    }

    pub fn last_rate(&self) -> Rate {
        self.last_rate
    }

    pub fn status(&self, timestamp: i64) -> LiveStatus {
        LiveStatus {
            timestamp,
            rate: self.last_rate,
            today: self.current.clone(),
        }
    }
}
