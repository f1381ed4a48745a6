// CSV export of daily rows.

use crate::models::DailyUsage;
use std::io::Write;

pub const CSV_HEADER: &str =
    "date,bytes_sent,bytes_recv,max_up_speed,max_down_speed,active_seconds";

/// One line per day in the order given. All fields are numeric or ISO dates, so no quoting.
pub fn write_csv<W: Write>(rows: &[DailyUsage], out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for r in rows {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            r.day.format("%Y-%m-%d"),
            r.bytes_sent,
            r.bytes_recv,
            r.max_up_speed,
            r.max_down_speed,
            r.active_seconds
        )?;
    }
    Ok(())
}
