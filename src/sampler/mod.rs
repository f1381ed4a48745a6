// Network sampler: reads cumulative byte counters through a CounterSource and never fails.
// A failed read reuses the last known totals so the live display keeps working.

mod counters;
pub mod rate;

pub use counters::{AdapterFilter, AdapterInfo, SysinfoCounters, list_adapters};
pub use rate::{RateComputer, Tick, TickKind};

use crate::models::Sample;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("no network interfaces reported by the OS")]
    NoInterfaces,
    #[error("network adapter {0:?} not found")]
    AdapterNotFound(String),
}

/// Where cumulative (bytes_sent, bytes_recv) totals come from.
pub trait CounterSource: Send + 'static {
    fn read_totals(&mut self) -> Result<(u64, u64), CounterError>;
}

pub struct NetworkSampler<S> {
    source: S,
    last_known: Option<Sample>,
    read_failures: u64,
}

impl<S: CounterSource> NetworkSampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_known: None,
            read_failures: 0,
        }
    }

    /// Reads the counters now. On failure returns the last successful reading unchanged,
    /// timestamp included, so a later rate spans the real interval between readings.
    /// Before the first successful read that is zero totals stamped now.
    pub fn sample(&mut self) -> Sample {
        let at = Instant::now();
        match self.source.read_totals() {
            Ok((bytes_sent, bytes_recv)) => {
                let sample = Sample {
                    at,
                    bytes_sent,
                    bytes_recv,
                };
                self.last_known = Some(sample);
                sample
            }
            Err(e) => {
                self.read_failures += 1;
                tracing::warn!(
                    error = %e,
                    operation = "read_totals",
                    "counter read failed, reusing last known totals"
                );
                self.last_known.unwrap_or(Sample {
                    at,
                    bytes_sent: 0,
                    bytes_recv: 0,
                })
            }
        }
    }

    /// False until the source has returned at least one reading.
    pub fn has_reading(&self) -> bool {
        self.last_known.is_some()
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<(u64, u64), CounterError>>);

    impl CounterSource for Scripted {
        fn read_totals(&mut self) -> Result<(u64, u64), CounterError> {
            self.0.pop_front().unwrap_or(Err(CounterError::NoInterfaces))
        }
    }

    #[test]
    fn failed_read_reuses_previous_totals() {
        let mut sampler = NetworkSampler::new(Scripted(VecDeque::from([
            Ok((100, 200)),
            Err(CounterError::AdapterNotFound("eth9".into())),
            Ok((150, 260)),
        ])));

        let a = sampler.sample();
        let b = sampler.sample();
        let c = sampler.sample();

        assert_eq!((a.bytes_sent, a.bytes_recv), (100, 200));
        assert_eq!(b, a);
        assert_eq!((c.bytes_sent, c.bytes_recv), (150, 260));
        assert_eq!(sampler.read_failures(), 1);
    }

    #[test]
    fn no_reading_until_first_success() {
        let mut sampler = NetworkSampler::new(Scripted(VecDeque::from([
            Err(CounterError::NoInterfaces),
            Ok((5, 6)),
        ])));

        let first = sampler.sample();
        assert!(!sampler.has_reading());
        assert_eq!((first.bytes_sent, first.bytes_recv), (0, 0));

        sampler.sample();
        assert!(sampler.has_reading());
    }

    #[test]
    fn rate_after_failed_reads_spans_the_whole_outage() {
        let mut sampler = NetworkSampler::new(Scripted(VecDeque::from([
            Ok((0, 0)),
            Ok((1000, 100)),
            Err(CounterError::NoInterfaces),
            Err(CounterError::NoInterfaces),
            Err(CounterError::NoInterfaces),
            Ok((5000, 500)),
        ])));
        let mut rc = RateComputer::new(std::time::Duration::from_secs(5));
        let pause = std::time::Duration::from_millis(20);

        assert!(rc.advance(sampler.sample()).is_none());
        std::thread::sleep(pause);
        let good = sampler.sample();
        assert!(rc.advance(good).is_some());
        for _ in 0..3 {
            std::thread::sleep(pause);
            assert!(rc.advance(sampler.sample()).is_none());
        }
        std::thread::sleep(pause);
        let after_sample = sampler.sample();
        let after = rc.advance(after_sample).unwrap();

        let window = after_sample.at.duration_since(good.at);
        assert!(window >= pause * 4);
        assert_eq!(after.elapsed, window);
        assert_eq!((after.sent_delta, after.recv_delta), (4000, 400));
        assert_eq!(
            after.rate.sent_per_sec,
            (4000.0 / window.as_secs_f64()).round() as u64
        );
        // 4000 bytes over at least four pauses.
        assert!(after.rate.sent_per_sec <= 50_000);
        assert_eq!(sampler.read_failures(), 3);
    }
}
