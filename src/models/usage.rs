// Daily and monthly usage rows. Monthly is always derived from daily rows.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// One calendar day of accumulated network usage. Speeds are bytes/sec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub day: NaiveDate,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub max_up_speed: u64,
    pub max_down_speed: u64,
    /// Seconds the monitor was sampling on this day.
    pub active_seconds: u64,
}

impl DailyUsage {
    /// Zero usage for `day` (also what a missing row means).
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            bytes_sent: 0,
            bytes_recv: 0,
            max_up_speed: 0,
            max_down_speed: 0,
            active_seconds: 0,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent.saturating_add(self.bytes_recv)
    }

    /// Average upload speed over active time, bytes/sec.
    pub fn avg_up_speed(&self) -> f64 {
        per_second(self.bytes_sent, self.active_seconds)
    }

    /// Average download speed over active time, bytes/sec.
    pub fn avg_down_speed(&self) -> f64 {
        per_second(self.bytes_recv, self.active_seconds)
    }

    pub fn avg_total_speed(&self) -> f64 {
        self.avg_up_speed() + self.avg_down_speed()
    }
}

/// Usage summed over a calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUsage {
    pub year: i32,
    pub month: u32,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub max_up_speed: u64,
    pub max_down_speed: u64,
    pub active_seconds: u64,
    pub days_tracked: u32,
}

impl MonthlyUsage {
    /// Folds the daily rows of one month: sums bytes and active time, keeps the peak of peaks.
    /// Rows outside the month are ignored.
    pub fn from_days(year: i32, month: u32, days: &[DailyUsage]) -> Self {
        let mut out = Self {
            year,
            month,
            bytes_sent: 0,
            bytes_recv: 0,
            max_up_speed: 0,
            max_down_speed: 0,
            active_seconds: 0,
            days_tracked: 0,
        };
        for d in days
            .iter()
            .filter(|d| d.day.year() == year && d.day.month() == month)
        {
            out.bytes_sent = out.bytes_sent.saturating_add(d.bytes_sent);
            out.bytes_recv = out.bytes_recv.saturating_add(d.bytes_recv);
            out.max_up_speed = out.max_up_speed.max(d.max_up_speed);
            out.max_down_speed = out.max_down_speed.max(d.max_down_speed);
            out.active_seconds = out.active_seconds.saturating_add(d.active_seconds);
            out.days_tracked += 1;
        }
        out
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent.saturating_add(self.bytes_recv)
    }

    pub fn avg_up_speed(&self) -> f64 {
        per_second(self.bytes_sent, self.active_seconds)
    }

    pub fn avg_down_speed(&self) -> f64 {
        per_second(self.bytes_recv, self.active_seconds)
    }
}

/// First and last day of a calendar month, or None when `month` is not 1..=12.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}

/// One entry per calendar day in `start..=end`; days without a row are zero usage.
/// `rows` must be ascending by day.
pub fn fill_calendar(start: NaiveDate, end: NaiveDate, rows: &[DailyUsage]) -> Vec<DailyUsage> {
    let mut rows = rows.iter().peekable();
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|day| {
            while rows.next_if(|r| r.day < day).is_some() {}
            match rows.next_if(|r| r.day == day) {
                Some(r) => r.clone(),
                None => DailyUsage::empty(day),
            }
        })
        .collect()
}

fn per_second(bytes: u64, seconds: u64) -> f64 {
    if seconds == 0 {
        0.0
    } else {
        bytes as f64 / seconds as f64
    }
}
