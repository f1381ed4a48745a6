// Rate computation between two consecutive samples.

use crate::models::{Rate, Sample};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Normal,
    /// A counter went backwards (device reconnect, adapter change). Contributes nothing.
    Reset,
    /// Elapsed time exceeded the allowed gap (suspend/resume). Rate discarded, bytes kept.
    Gap,
}

/// Result of one sampling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub rate: Rate,
    pub sent_delta: u64,
    pub recv_delta: u64,
    pub elapsed: Duration,
    pub kind: TickKind,
}

impl Tick {
    /// Time credited to the day's active seconds.
    pub fn active_time(&self) -> Duration {
        match self.kind {
            TickKind::Gap => Duration::ZERO,
            _ => self.elapsed,
        }
    }
}

/// Computes the tick between `prev` and `cur`.
pub fn compute(prev: &Sample, cur: &Sample, max_gap: Duration) -> Tick {
    let elapsed = cur.at.saturating_duration_since(prev.at);

    if cur.bytes_sent < prev.bytes_sent || cur.bytes_recv < prev.bytes_recv {
        return Tick {
            rate: Rate::ZERO,
            sent_delta: 0,
            recv_delta: 0,
            elapsed,
            kind: TickKind::Reset,
        };
    }

    let sent_delta = cur.bytes_sent - prev.bytes_sent;
    let recv_delta = cur.bytes_recv - prev.bytes_recv;

    let (rate, kind) = if elapsed > max_gap {
        (Rate::ZERO, TickKind::Gap)
    } else if elapsed.is_zero() {
        (Rate::ZERO, TickKind::Normal)
    } else {
        let secs = elapsed.as_secs_f64();
        (
            Rate {
                sent_per_sec: (sent_delta as f64 / secs).round() as u64,
                recv_per_sec: (recv_delta as f64 / secs).round() as u64,
            },
            TickKind::Normal,
        )
    };

    Tick {
        rate,
        sent_delta,
        recv_delta,
        elapsed,
        kind,
    }
}

/// Keeps the baseline sample between ticks.
pub struct RateComputer {
    baseline: Option<Sample>,
    max_gap: Duration,
}

impl RateComputer {
    pub fn new(max_gap: Duration) -> Self {
        Self {
            baseline: None,
            max_gap,
        }
    }

    /// Computes the tick against the baseline, then makes `current` the new baseline
    /// (also after a reset or a gap). The first sample only sets the baseline.
    /// A sample no newer than the baseline (a re-served reading) produces no tick.
    pub fn advance(&mut self, current: Sample) -> Option<Tick> {
        if self.baseline.is_some_and(|b| current.at <= b.at) {
            return None;
        }
        let tick = self
            .baseline
            .as_ref()
            .map(|prev| compute(prev, &current, self.max_gap));
        self.baseline = Some(current);
        tick
    }

    pub fn baseline(&self) -> Option<&Sample> {
        self.baseline.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const GAP: Duration = Duration::from_secs(5);

    fn at(base: Instant, ms: u64, sent: u64, recv: u64) -> Sample {
        Sample {
            at: base + Duration::from_millis(ms),
            bytes_sent: sent,
            bytes_recv: recv,
        }
    }

    #[test]
    fn rate_is_delta_over_elapsed() {
        let t0 = Instant::now();
        let tick = compute(&at(t0, 0, 1000, 500), &at(t0, 2000, 3000, 900), GAP);
        assert_eq!(tick.kind, TickKind::Normal);
        assert_eq!(tick.sent_delta, 2000);
        assert_eq!(tick.recv_delta, 400);
        assert_eq!(tick.rate.sent_per_sec, 1000);
        assert_eq!(tick.rate.recv_per_sec, 200);
    }

    #[test]
    fn counter_going_backwards_is_a_reset() {
        let t0 = Instant::now();
        let tick = compute(&at(t0, 0, 1500, 800), &at(t0, 1000, 1200, 900), GAP);
        assert_eq!(tick.kind, TickKind::Reset);
        assert_eq!(tick.rate, Rate::ZERO);
        assert_eq!((tick.sent_delta, tick.recv_delta), (0, 0));
    }

    #[test]
    fn zero_elapsed_gives_zero_rate() {
        let t0 = Instant::now();
        let tick = compute(&at(t0, 0, 10, 10), &at(t0, 0, 20, 30), GAP);
        assert_eq!(tick.rate, Rate::ZERO);
        assert_eq!(tick.sent_delta, 10);
    }

    #[test]
    fn long_gap_discards_rate_but_keeps_bytes() {
        let t0 = Instant::now();
        let tick = compute(&at(t0, 0, 0, 0), &at(t0, 60_000, 6000, 12_000), GAP);
        assert_eq!(tick.kind, TickKind::Gap);
        assert_eq!(tick.rate, Rate::ZERO);
        assert_eq!((tick.sent_delta, tick.recv_delta), (6000, 12_000));
        assert_eq!(tick.active_time(), Duration::ZERO);
    }

    #[test]
    fn computer_rolls_baseline_forward_through_reset() {
        let t0 = Instant::now();
        let mut rc = RateComputer::new(GAP);

        assert!(rc.advance(at(t0, 0, 1000, 500)).is_none());
        let first = rc.advance(at(t0, 1000, 1500, 800)).unwrap();
        let second = rc.advance(at(t0, 2000, 1200, 900)).unwrap();

        assert_eq!(first.rate.sent_per_sec, 500);
        assert_eq!(first.rate.recv_per_sec, 300);
        assert_eq!(second.rate, Rate::ZERO);
        let base = rc.baseline().unwrap();
        assert_eq!((base.bytes_sent, base.bytes_recv), (1200, 900));
        assert_eq!(first.sent_delta + second.sent_delta, 500);
    }

    #[test]
    fn reserved_reading_keeps_the_old_baseline() {
        let t0 = Instant::now();
        let mut rc = RateComputer::new(GAP);
        let good = at(t0, 0, 1000, 100);

        rc.advance(good);
        assert!(rc.advance(good).is_none());
        assert!(rc.advance(good).is_none());
        let tick = rc.advance(at(t0, 400, 5000, 500)).unwrap();

        assert_eq!(tick.elapsed, Duration::from_millis(400));
        assert_eq!(tick.rate.sent_per_sec, 10_000);
        assert_eq!(tick.rate.recv_per_sec, 1000);
    }
}
