// SQLite usage history: one row per calendar day, keyed by ISO date text.
// WAL + pool: the worker writes while the API reads.

pub mod export;

use crate::models::{DailyUsage, MonthlyUsage, month_bounds};
use chrono::NaiveDate;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

const DAY_FORMAT: &str = "%Y-%m-%d";

pub struct UsageRepo {
    pool: SqlitePool,
}

impl UsageRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_usage (
                day            TEXT PRIMARY KEY,
                bytes_sent     INTEGER NOT NULL DEFAULT 0,
                bytes_recv     INTEGER NOT NULL DEFAULT 0,
                max_up_speed   INTEGER NOT NULL DEFAULT 0,
                max_down_speed INTEGER NOT NULL DEFAULT 0,
                active_seconds INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or fully replace the row for `usage.day`.
    #[instrument(skip(self, usage), fields(repo = "usage", operation = "upsert", day = %usage.day))]
    pub async fn upsert(&self, usage: &DailyUsage) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_usage (day, bytes_sent, bytes_recv, max_up_speed, max_down_speed, active_seconds)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT(day) DO UPDATE SET
                bytes_sent     = excluded.bytes_sent,
                bytes_recv     = excluded.bytes_recv,
                max_up_speed   = excluded.max_up_speed,
                max_down_speed = excluded.max_down_speed,
                active_seconds = excluded.active_seconds
            "#,
        )
        .bind(usage.day.format(DAY_FORMAT).to_string())
        .bind(usage.bytes_sent as i64)
        .bind(usage.bytes_recv as i64)
        .bind(usage.max_up_speed as i64)
        .bind(usage.max_down_speed as i64)
        .bind(usage.active_seconds as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "usage", operation = "get"))]
    pub async fn get(&self, day: NaiveDate) -> anyhow::Result<Option<DailyUsage>> {
        let row = sqlx::query(
            "SELECT day, bytes_sent, bytes_recv, max_up_speed, max_down_speed, active_seconds
             FROM daily_usage WHERE day = $1",
        )
        .bind(day.format(DAY_FORMAT).to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    /// Rows with `start <= day <= end`, ascending by day.
    #[instrument(skip(self), fields(repo = "usage", operation = "list_range"))]
    pub async fn list_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<DailyUsage>> {
        let rows = sqlx::query(
            "SELECT day, bytes_sent, bytes_recv, max_up_speed, max_down_speed, active_seconds
             FROM daily_usage WHERE day >= $1 AND day <= $2 ORDER BY day ASC",
        )
        .bind(start.format(DAY_FORMAT).to_string())
        .bind(end.format(DAY_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_row).collect()
    }

    #[instrument(skip(self), fields(repo = "usage", operation = "list_all"))]
    pub async fn list_all(&self) -> anyhow::Result<Vec<DailyUsage>> {
        let rows = sqlx::query(
            "SELECT day, bytes_sent, bytes_recv, max_up_speed, max_down_speed, active_seconds
             FROM daily_usage ORDER BY day ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_row).collect()
    }

    /// Recomputed from the daily rows on every call.
    #[instrument(skip(self), fields(repo = "usage", operation = "month_summary"))]
    pub async fn month_summary(&self, year: i32, month: u32) -> anyhow::Result<MonthlyUsage> {
        let (first, last) = month_bounds(year, month)
            .ok_or_else(|| anyhow::anyhow!("invalid month {}-{}", year, month))?;
        let days = self.list_range(first, last).await?;
        Ok(MonthlyUsage::from_days(year, month, &days))
    }

    /// Delete rows dated before `cutoff`. Returns the number of rows removed.
    #[instrument(skip(self), fields(repo = "usage", operation = "prune_before"))]
    pub async fn prune_before(&self, cutoff: NaiveDate) -> anyhow::Result<u64> {
        let r = sqlx::query("DELETE FROM daily_usage WHERE day < $1")
            .bind(cutoff.format(DAY_FORMAT).to_string())
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<DailyUsage> {
        let day: String = row.try_get("day")?;
        let day = NaiveDate::parse_from_str(&day, DAY_FORMAT)
            .map_err(|e| anyhow::anyhow!("bad day {:?} in daily_usage: {}", day, e))?;
        let bytes_sent: i64 = row.try_get("bytes_sent")?;
        let bytes_recv: i64 = row.try_get("bytes_recv")?;
        let max_up_speed: i64 = row.try_get("max_up_speed")?;
        let max_down_speed: i64 = row.try_get("max_down_speed")?;
        let active_seconds: i64 = row.try_get("active_seconds")?;
        Ok(DailyUsage {
            day,
            bytes_sent: bytes_sent as u64,
            bytes_recv: bytes_recv as u64,
            max_up_speed: max_up_speed as u64,
            max_down_speed: max_down_speed as u64,
            active_seconds: active_seconds as u64,
        })
    }
}
