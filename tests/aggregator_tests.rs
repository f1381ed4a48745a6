// Aggregator tests: accumulation, peaks, rollover, flush cadence, restart recovery

mod common;

use common::{day, reset_tick, temp_repo, tick, usage};
use speedmonitor::aggregator::Aggregator;
use speedmonitor::models::{DailyUsage, Sample};
use speedmonitor::sampler::RateComputer;
use std::time::{Duration, Instant};

#[test]
fn totals_are_the_sum_of_deltas_and_never_decrease() {
    let today = day(2026, 1, 10);
    let mut agg = Aggregator::new(today, 1000);
    let deltas = [(10, 1), (0, 0), (250, 40), (7, 7), (1000, 3)];
    let mut prev_sent = 0;
    for (s, r) in deltas {
        agg.on_tick(today, &tick(s, r));
        assert!(agg.current().bytes_sent >= prev_sent);
        prev_sent = agg.current().bytes_sent;
    }
    assert_eq!(agg.current().bytes_sent, 1267);
    assert_eq!(agg.current().bytes_recv, 51);
    assert_eq!(agg.current().active_seconds, 5);
}

#[test]
fn peak_is_the_highest_rate_seen() {
    let today = day(2026, 1, 10);
    let mut agg = Aggregator::new(today, 1000);
    for (s, r) in [(100, 5), (900, 2), (300, 80)] {
        agg.on_tick(today, &tick(s, r));
    }
    assert_eq!(agg.current().max_up_speed, 900);
    assert_eq!(agg.current().max_down_speed, 80);
    assert_eq!(agg.last_rate().sent_per_sec, 300);
}

#[test]
fn reset_ticks_contribute_nothing() {
    let today = day(2026, 1, 10);
    let mut agg = Aggregator::new(today, 1000);
    agg.on_tick(today, &tick(500, 300));
    agg.on_tick(today, &reset_tick());
    assert_eq!(agg.current().bytes_sent, 500);
    assert_eq!(agg.current().bytes_recv, 300);
    assert_eq!(agg.last_rate().sent_per_sec, 0);
}

#[test]
fn counter_reset_example_from_samples() {
    let t0 = Instant::now();
    let samples = [(0, 1000, 500), (1000, 1500, 800), (2000, 1200, 900)];
    let mut rc = RateComputer::new(Duration::from_secs(5));
    let today = day(2026, 1, 10);
    let mut agg = Aggregator::new(today, 1000);
    let mut rates = Vec::new();

    for (ms, sent, recv) in samples {
        let s = Sample {
            at: t0 + Duration::from_millis(ms),
            bytes_sent: sent,
            bytes_recv: recv,
        };
        if let Some(t) = rc.advance(s) {
            rates.push((t.rate.sent_per_sec, t.rate.recv_per_sec));
            agg.on_tick(today, &t);
        }
    }

    assert_eq!(rates, vec![(500, 300), (0, 0)]);
    assert_eq!(agg.current().bytes_sent, 500);
    assert_eq!(agg.current().bytes_recv, 300);
    let base = rc.baseline().unwrap();
    assert_eq!((base.bytes_sent, base.bytes_recv), (1200, 900));
}

#[test]
fn rollover_finalizes_old_day_unchanged_and_starts_from_zero() {
    let d1 = day(2026, 1, 31);
    let d2 = day(2026, 2, 1);
    let mut agg = Aggregator::new(d1, 1000);
    agg.on_tick(d1, &tick(100, 200));
    agg.on_tick(d1, &tick(50, 20));
    let before = agg.current().clone();

    let out = agg.on_tick(d2, &tick(7, 3));

    assert_eq!(out.finalized, Some(before));
    assert_eq!(agg.current().day, d2);
    assert_eq!(agg.current().bytes_sent, 7);
    assert_eq!(agg.current().bytes_recv, 3);
    assert_eq!(agg.current().max_up_speed, 7);
    assert_eq!(agg.current().active_seconds, 1);
}

#[test]
fn reset_on_rollover_tick_finalizes_first_then_applies_zero() {
    let d1 = day(2026, 3, 1);
    let d2 = day(2026, 3, 2);
    let mut agg = Aggregator::new(d1, 1000);
    agg.on_tick(d1, &tick(10, 10));

    let out = agg.on_tick(d2, &reset_tick());

    assert_eq!(out.finalized.unwrap().bytes_sent, 10);
    let mut expected = DailyUsage::empty(d2);
    expected.active_seconds = 1;
    assert_eq!(agg.current(), &expected);
}

#[test]
fn flush_is_due_every_flush_rate_ticks() {
    let today = day(2026, 1, 10);
    let mut agg = Aggregator::new(today, 3);
    let due: Vec<bool> = (0..7)
        .map(|_| agg.on_tick(today, &tick(1, 1)).flush_due)
        .collect();
    assert_eq!(due, vec![false, false, true, false, false, true, false]);
}

#[tokio::test]
async fn restart_continues_from_stored_totals() {
    let (_dir, repo) = temp_repo().await;
    let today = day(2026, 5, 20);
    let mut stored = usage(today, 1_000, 2_000);
    stored.active_seconds = 30;
    repo.upsert(&stored).await.unwrap();

    let mut agg = Aggregator::resume(repo.get(today).await.unwrap(), today, 1);
    let out = agg.on_tick(today, &tick(15, 25));
    assert!(out.flush_due);
    repo.upsert(agg.current()).await.unwrap();

    let after = repo.get(today).await.unwrap().unwrap();
    assert_eq!(after.bytes_sent, 1_015);
    assert_eq!(after.bytes_recv, 2_025);
    assert_eq!(after.active_seconds, 31);
}

#[test]
fn status_carries_rate_and_today() {
    let today = day(2026, 1, 10);
    let mut agg = Aggregator::new(today, 10);
    agg.on_tick(today, &tick(40, 60));
    let status = agg.status(1_700_000_000_000);
    assert_eq!(status.timestamp, 1_700_000_000_000);
    assert_eq!(status.rate.recv_per_sec, 60);
    assert_eq!(status.today.bytes_recv, 60);
}
