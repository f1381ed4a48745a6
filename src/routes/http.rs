// GET handlers: live rate, daily/monthly/trend statistics, CSV export, adapters, unit conversion

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use chrono::{Days, NaiveDate};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::models::{DailyUsage, LiveStatus, MonthlyUsage, fill_calendar, month_bounds};
use crate::units::{SpeedUnit, convert_speed, format_bytes, format_speed};
use crate::usage_repo::export;

const DEFAULT_TREND_DAYS: u32 = 30;
const MAX_TREND_DAYS: u32 = 366;

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/live: latest rate and today's in-memory totals.
pub(super) async fn live_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.live_rx.borrow().clone())
}

/// GET /api/today: today's usage with averages and display strings.
pub(super) async fn today_handler(State(state): State<AppState>) -> impl IntoResponse {
    let today = state.live_rx.borrow().today.clone();
    axum::Json(day_view(&today))
}

/// GET /api/days/{date}: one day; a day without a row is zero usage.
pub(super) async fn day_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let day = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date {:?}, expected YYYY-MM-DD", date)))?;
    let live = state.live_rx.borrow().today.clone();
    let usage = if live.day == day {
        live
    } else {
        state
            .usage_repo
            .get(day)
            .await?
            .unwrap_or_else(|| DailyUsage::empty(day))
    };
    Ok(axum::Json(day_view(&usage)))
}

/// GET /api/month/{year}/{month}: summed from daily rows, including today's unsaved ticks.
pub(super) async fn month_handler(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let (first, last) = month_bounds(year, month)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid month {}-{}", year, month)))?;
    let mut rows = state.usage_repo.list_range(first, last).await?;
    merge_live(&mut rows, &state.live_rx.borrow(), first, last);
    let m = MonthlyUsage::from_days(year, month, &rows);
    Ok(axum::Json(serde_json::json!({
        "usage": m,
        "totalBytes": m.total_bytes(),
        "avgUpSpeed": m.avg_up_speed(),
        "avgDownSpeed": m.avg_down_speed(),
        "display": {
            "sent": format_bytes(m.bytes_sent),
            "recv": format_bytes(m.bytes_recv),
            "total": format_bytes(m.total_bytes()),
            "peakUp": format_speed(m.max_up_speed as f64),
            "peakDown": format_speed(m.max_down_speed as f64),
        },
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendQuery {
    days: Option<u32>,
}

/// GET /api/trend?days=N: the last N days ending today (local time), ascending, gaps filled with zero.
pub(super) async fn trend_handler(
    State(state): State<AppState>,
    Query(q): Query<TrendQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = q.days.unwrap_or(DEFAULT_TREND_DAYS);
    if days == 0 || days > MAX_TREND_DAYS {
        return Err(ApiError::BadRequest(format!(
            "days must be between 1 and {}, got {}",
            MAX_TREND_DAYS, days
        )));
    }
    // Wall clock, not the live day: the worker may not have ticked since midnight.
    let end = chrono::Local::now().date_naive();
    let start = end
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .ok_or_else(|| ApiError::BadRequest("range starts before the calendar".into()))?;
    let mut rows = state.usage_repo.list_range(start, end).await?;
    merge_live(&mut rows, &state.live_rx.borrow(), start, end);
    Ok(axum::Json(fill_calendar(start, end, &rows)))
}

/// GET /api/export.csv: every stored day as CSV.
pub(super) async fn export_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rows = state.usage_repo.list_all().await?;
    merge_live(&mut rows, &state.live_rx.borrow(), NaiveDate::MIN, NaiveDate::MAX);
    let mut body = Vec::new();
    export::write_csv(&rows, &mut body).map_err(anyhow::Error::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"usage_history.csv\"",
            ),
        ],
        body,
    ))
}

/// GET /api/adapters: interfaces that can be set as monitoring.monitored_adapter.
pub(super) async fn adapters_handler() -> Result<impl IntoResponse, ApiError> {
    let adapters = tokio::task::spawn_blocking(crate::sampler::list_adapters)
        .await
        .map_err(|e| anyhow::anyhow!("adapter list task join: {}", e))?;
    Ok(axum::Json(adapters))
}

#[derive(Debug, Deserialize)]
pub(super) struct ConvertQuery {
    value: f64,
    from: String,
    to: String,
}

/// GET /api/convert?value=&from=&to=: speed unit conversion.
pub(super) async fn convert_handler(
    Query(q): Query<ConvertQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from: SpeedUnit = q
        .from
        .parse()
        .map_err(|e: crate::units::UnknownUnit| ApiError::BadRequest(e.to_string()))?;
    let to: SpeedUnit = q
        .to
        .parse()
        .map_err(|e: crate::units::UnknownUnit| ApiError::BadRequest(e.to_string()))?;
    Ok(axum::Json(serde_json::json!({
        "value": q.value,
        "from": q.from,
        "to": q.to,
        "result": convert_speed(q.value, from, to),
    })))
}

fn day_view(d: &DailyUsage) -> serde_json::Value {
    serde_json::json!({
        "usage": d,
        "totalBytes": d.total_bytes(),
        "avgUpSpeed": d.avg_up_speed(),
        "avgDownSpeed": d.avg_down_speed(),
        "avgTotalSpeed": d.avg_total_speed(),
        "display": {
            "sent": format_bytes(d.bytes_sent),
            "recv": format_bytes(d.bytes_recv),
            "total": format_bytes(d.total_bytes()),
            "peakUp": format_speed(d.max_up_speed as f64),
            "peakDown": format_speed(d.max_down_speed as f64),
            "avgSpeed": format_speed(d.avg_total_speed()),
        },
    })
}

/// Stored rows lag the live day by up to one flush; prefer the live copy once it has ticked.
/// `rows` is ascending by day.
fn merge_live(rows: &mut Vec<DailyUsage>, live: &LiveStatus, start: NaiveDate, end: NaiveDate) {
    let today = &live.today;
    if live.timestamp == 0 || today.day < start || today.day > end {
        return;
    }
    match rows.binary_search_by_key(&today.day, |r| r.day) {
        Ok(i) => rows[i] = today.clone(),
        Err(i) => rows.insert(i, today.clone()),
    }
}
