// Domain models (no I/O)

mod live;
mod usage;

pub use live::{LiveStatus, Rate, Sample};
pub use usage::{DailyUsage, MonthlyUsage, fill_calendar, month_bounds};
